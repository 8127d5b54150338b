//! The dispatcher facade and its lock-guarded core.

use super::accumulator::{BatchAccumulator, EnqueueOutcome};
use super::executor::DispatchExecutor;
use super::router;
use crate::config::DispatcherConfig;
use crate::limiter::{AdmissionDecision, RateLimiter};
use crate::store::DocumentStore;
use crate::types::analysis::Analysis;
use crate::types::request::{CaptureSource, PendingRequest};
use crate::upstream::AnalysisBackend;
use crate::{Error, Result};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

/// All dispatcher-owned mutable state, behind one mutex.
///
/// Admission checks, counter increments, and batch membership are linearized
/// here: two concurrent submissions cannot both observe room in the batch, and
/// the idle timer and the size cap cannot both flush the same instance. The
/// lock is never held across an `.await`.
pub(crate) struct DispatcherCore {
    pub(crate) limiter: RateLimiter,
    pub(crate) accumulator: BatchAccumulator,
    pub(crate) stats: StatsCounters,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) admitted: u64,
    pub(crate) rejected_global: u64,
    pub(crate) rejected_client: u64,
    pub(crate) batches_dispatched: u64,
    pub(crate) documents_persisted: u64,
}

/// Point-in-time view of the dispatcher's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherSnapshot {
    pub admitted: u64,
    pub rejected_global: u64,
    pub rejected_client: u64,
    pub batches_dispatched: u64,
    pub documents_persisted: u64,
    /// Members of the currently filling batch.
    pub current_batch_len: usize,
    /// Admissions left in the current global window.
    pub global_remaining: u32,
}

struct Inner {
    config: DispatcherConfig,
    core: Arc<Mutex<DispatcherCore>>,
    executor: DispatchExecutor,
}

/// The ingestion dispatcher. Cheap to clone; all clones share one core.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

enum SubmitAction {
    Rejected(PendingRequest, Error),
    ArmTimer(u64),
    Dispatch(Vec<PendingRequest>),
    Wait,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Submit one captured text for analysis and await its outcome.
    ///
    /// Admission happens synchronously: a rejected request resolves
    /// immediately and never joins a batch. An admitted request resolves when
    /// its batch is dispatched, on the size cap or the idle deadline.
    pub async fn submit(
        &self,
        text: impl Into<String>,
        source: CaptureSource,
        client_id: impl Into<String>,
    ) -> Result<Analysis> {
        let (req, rx) = PendingRequest::new(text.into(), source, client_id.into());

        let action = {
            let mut core = self.inner.core.lock().unwrap();
            match core.limiter.admit(&req.client_id, Instant::now()) {
                AdmissionDecision::Admitted => {
                    core.stats.admitted += 1;
                    match core.accumulator.enqueue(req) {
                        EnqueueOutcome::First { generation } => SubmitAction::ArmTimer(generation),
                        EnqueueOutcome::Added { .. } => SubmitAction::Wait,
                        EnqueueOutcome::Full(batch) => SubmitAction::Dispatch(batch),
                    }
                }
                AdmissionDecision::GlobalQuotaExceeded => {
                    core.stats.rejected_global += 1;
                    SubmitAction::Rejected(
                        req,
                        Error::GlobalQuotaExceeded {
                            limit: self.inner.config.global_call_limit,
                        },
                    )
                }
                AdmissionDecision::ClientQuotaExceeded => {
                    core.stats.rejected_client += 1;
                    let client_id = req.client_id.clone();
                    SubmitAction::Rejected(
                        req,
                        Error::ClientQuotaExceeded {
                            client_id,
                            limit: self.inner.config.per_client_limit,
                        },
                    )
                }
            }
        };

        match action {
            SubmitAction::Rejected(req, err) => {
                debug!(client_id = %req.client_id, %err, "admission rejected");
                router::resolve(req, Err(err));
            }
            SubmitAction::ArmTimer(generation) => self.arm_idle_timer(generation),
            SubmitAction::Dispatch(batch) => {
                debug!(len = batch.len(), "size cap reached, flushing");
                self.spawn_dispatch(batch);
            }
            SubmitAction::Wait => {}
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::ResultChannelClosed),
        }
    }

    /// Arm the idle flush for the batch instance `generation`. The sleep runs
    /// in its own task; on wake it re-checks the generation under the core
    /// lock, so a timer made stale by a size flush takes nothing.
    fn arm_idle_timer(&self, generation: u64) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.batch_max_wait).await;
            let batch = {
                let mut core = inner.core.lock().unwrap();
                core.accumulator.take_if_generation(generation)
            };
            if let Some(batch) = batch {
                debug!(len = batch.len(), "idle deadline reached, flushing");
                inner.executor.run(batch).await;
            }
        });
    }

    fn spawn_dispatch(&self, batch: Vec<PendingRequest>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.executor.run(batch).await;
        });
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    pub fn snapshot(&self) -> DispatcherSnapshot {
        let mut core = self.inner.core.lock().unwrap();
        let global_remaining = core.limiter.global_remaining(Instant::now());
        DispatcherSnapshot {
            admitted: core.stats.admitted,
            rejected_global: core.stats.rejected_global,
            rejected_client: core.stats.rejected_client,
            batches_dispatched: core.stats.batches_dispatched,
            documents_persisted: core.stats.documents_persisted,
            current_batch_len: core.accumulator.len(),
            global_remaining,
        }
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    backend: Option<Arc<dyn AnalysisBackend>>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            config: DispatcherConfig::default(),
            backend: None,
            store: None,
        }
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn AnalysisBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<Dispatcher> {
        self.config.validate()?;
        let backend = self
            .backend
            .ok_or_else(|| Error::configuration("an analysis backend is required"))?;
        let store = self
            .store
            .ok_or_else(|| Error::configuration("a document store is required"))?;

        let core = Arc::new(Mutex::new(DispatcherCore {
            limiter: RateLimiter::new(
                self.config.rate_window,
                self.config.global_call_limit,
                self.config.per_client_limit,
            ),
            accumulator: BatchAccumulator::new(self.config.batch_size),
            stats: StatsCounters::default(),
        }));
        let executor = DispatchExecutor::new(backend, store, Arc::clone(&core));

        Ok(Dispatcher {
            inner: Arc::new(Inner {
                config: self.config,
                core,
                executor,
            }),
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
