//! Analysis backend trait and test implementation.

use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// The upstream text-analysis service, seen as one combined call per batch.
///
/// Implementations map transport problems to
/// [`Error::UpstreamCallFailure`]; interpreting the reply text is the
/// executor's job.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Send one combined payload and return the model's raw text reply.
    async fn analyze(&self, payload: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Queue-driven backend for tests: replies (or failures) are served in the
/// order they were pushed, and every received payload is captured for
/// assertions.
pub struct ScriptedBackend {
    replies: Arc<RwLock<VecDeque<std::result::Result<String, String>>>>,
    payloads: Arc<RwLock<Vec<String>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(RwLock::new(VecDeque::new())),
            payloads: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.write().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies.write().unwrap().push_back(Err(message.into()));
    }

    /// Payloads received so far, in call order.
    pub fn payloads(&self) -> Vec<String> {
        self.payloads.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.payloads.read().unwrap().len()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn analyze(&self, payload: &str) -> Result<String> {
        self.payloads.write().unwrap().push(payload.to_string());
        match self.replies.write().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(Error::UpstreamCallFailure { message }),
            None => Err(Error::UpstreamCallFailure {
                message: "scripted backend has no reply queued".to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
