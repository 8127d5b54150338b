//! Pending requests and their result handles.

use crate::types::analysis::Analysis;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::oneshot;

/// Which client surface produced a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Web,
    Mobile,
}

impl CaptureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureSource::Web => "web",
            CaptureSource::Mobile => "mobile",
        }
    }
}

impl std::fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome delivered through a request's result handle.
pub type Outcome = std::result::Result<Analysis, Error>;

/// A submitted capture awaiting analysis.
///
/// Created at `submit` time together with the receiving half of its oneshot
/// handle. The accumulator owns the request from enqueue until the executor
/// resolves it; the sender is consumed on resolution, so a handle can never be
/// completed twice.
#[derive(Debug)]
pub struct PendingRequest {
    pub text: String,
    pub source: CaptureSource,
    pub client_id: String,
    pub arrived_at: Instant,
    pub(crate) handle: oneshot::Sender<Outcome>,
}

impl PendingRequest {
    pub(crate) fn new(
        text: String,
        source: CaptureSource,
        client_id: String,
    ) -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let req = Self {
            text,
            source,
            client_id,
            arrived_at: Instant::now(),
            handle: tx,
        };
        (req, rx)
    }
}
