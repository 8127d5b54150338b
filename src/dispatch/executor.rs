//! Single-batch dispatch against the upstream analysis service.

use super::router;
use super::service::DispatcherCore;
use crate::store::DocumentStore;
use crate::types::analysis::CaptureDocument;
use crate::types::request::PendingRequest;
use crate::upstream::{prompt, AnalysisBackend};
use crate::Error;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Executes one flushed batch: quota re-check, one combined upstream call,
/// positional parse, per-item persistence and resolution.
///
/// Runs entirely off the core lock except for the brief headroom re-check and
/// counter updates, so new batches keep forming while a dispatch is in flight.
pub(crate) struct DispatchExecutor {
    backend: Arc<dyn AnalysisBackend>,
    store: Arc<dyn DocumentStore>,
    core: Arc<Mutex<DispatcherCore>>,
}

impl DispatchExecutor {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        store: Arc<dyn DocumentStore>,
        core: Arc<Mutex<DispatcherCore>>,
    ) -> Self {
        Self {
            backend,
            store,
            core,
        }
    }

    /// Resolve every member of `batch`, one way or another.
    pub async fn run(&self, batch: Vec<PendingRequest>) {
        let needed = batch.len();
        let batch_id = Uuid::new_v4();

        let remaining = {
            let mut core = self.core.lock().unwrap();
            core.stats.batches_dispatched += 1;
            core.limiter.global_remaining(Instant::now())
        };
        if (remaining as usize) < needed {
            warn!(%batch_id, needed, remaining, "no upstream headroom, rejecting batch");
            router::fail_all(batch, || Error::UpstreamQuotaExceeded { needed, remaining });
            return;
        }

        debug!(%batch_id, len = needed, "dispatching batch upstream");
        let payload = prompt::combined_payload(&batch);

        let reply = match self.backend.analyze(&payload).await {
            Ok(reply) => reply,
            Err(err) => {
                let message = match err {
                    Error::UpstreamCallFailure { message } => message,
                    other => other.to_string(),
                };
                warn!(%batch_id, %message, "upstream call failed, failing batch");
                router::fail_all(batch, || Error::UpstreamCallFailure {
                    message: message.clone(),
                });
                return;
            }
        };

        let analyses = match prompt::parse_batch_reply(&reply, needed) {
            Ok(analyses) => analyses,
            Err(err) => {
                let message = match err {
                    Error::UpstreamParseFailure { message } => message,
                    other => other.to_string(),
                };
                // One malformed element fails the whole batch: positional
                // correlation is the only linkage between request and result.
                warn!(%batch_id, %message, "unusable upstream reply, failing batch");
                router::fail_all(batch, || Error::UpstreamParseFailure {
                    message: message.clone(),
                });
                return;
            }
        };

        // Persistence failures are isolated per item; siblings still resolve.
        let jobs = batch.into_iter().zip(analyses).map(|(req, analysis)| {
            let store = Arc::clone(&self.store);
            async move {
                let doc = CaptureDocument::from_request(&req, analysis.clone());
                match store.insert(doc).await {
                    Ok(()) => {
                        router::resolve(req, Ok(analysis));
                        true
                    }
                    Err(err) => {
                        let message = match err {
                            Error::PersistenceFailure { message } => message,
                            other => other.to_string(),
                        };
                        router::resolve(req, Err(Error::PersistenceFailure { message }));
                        false
                    }
                }
            }
        });
        let persisted = futures::future::join_all(jobs)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count() as u64;

        self.core.lock().unwrap().stats.documents_persisted += persisted;
        debug!(%batch_id, persisted, "batch complete");
    }
}
