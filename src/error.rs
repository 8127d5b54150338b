use thiserror::Error;

/// Unified error type for the ingestion dispatcher.
///
/// Admission errors (`GlobalQuotaExceeded`, `ClientQuotaExceeded`) are resolved
/// synchronously and the request never enters a batch. Dispatch-time errors
/// (`UpstreamQuotaExceeded`, `UpstreamCallFailure`, `UpstreamParseFailure`) fan
/// out to every member of the affected batch. `PersistenceFailure` is the only
/// per-item failure. No layer retries; a resubmission re-enters admission and
/// counts against quota again.
#[derive(Debug, Error)]
pub enum Error {
    #[error("global quota exceeded: {limit} upstream calls per window")]
    GlobalQuotaExceeded { limit: u32 },

    #[error("client quota exceeded for {client_id}: {limit} requests per window")]
    ClientQuotaExceeded { client_id: String, limit: u32 },

    #[error("insufficient upstream quota for batch of {needed} (remaining: {remaining})")]
    UpstreamQuotaExceeded { needed: usize, remaining: u32 },

    #[error("upstream call failed: {message}")]
    UpstreamCallFailure { message: String },

    #[error("upstream reply unusable: {message}")]
    UpstreamParseFailure { message: String },

    #[error("persistence failed: {message}")]
    PersistenceFailure { message: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("result channel closed before resolution")]
    ResultChannelClosed,
}

impl Error {
    /// Create a configuration error from a plain message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
        }
    }

    /// Whether this error was produced at admission time, before the request
    /// could join a batch.
    pub fn is_admission_rejection(&self) -> bool {
        matches!(
            self,
            Error::GlobalQuotaExceeded { .. } | Error::ClientQuotaExceeded { .. }
        )
    }
}
