//! # recall-dispatch
//!
//! 这是 Recall 捕获服务的摄取调度器：负责准入限流、批量聚合与上游分析调用的分发。
//!
//! Ingestion dispatcher for the Recall capture service. Clients submit captured
//! text; the dispatcher admits requests under a two-tier rate limit, accumulates
//! them into bounded batches, analyzes each batch with a single upstream
//! language-model call, and persists the structured results.
//!
//! ## Overview
//!
//! The dispatcher is the only part of the Recall backend with shared mutable
//! state and timing-based coordination. Everything else (client surfaces,
//! authentication, the hosted document store) is sequential request/response
//! plumbing consumed here through traits.
//!
//! ## Core Flow
//!
//! - **Admission**: [`limiter::RateLimiter`] checks a global fixed window
//!   (upstream calls per minute) and a per-client fixed window before a request
//!   is allowed anywhere near a batch.
//! - **Accumulation**: admitted requests join the current batch in arrival
//!   order; the batch flushes on its size cap or a 30-second idle timer,
//!   whichever comes first.
//! - **Dispatch**: one combined upstream call per batch; the reply must be a
//!   JSON array with exactly one structured result per request, in order.
//! - **Routing**: every request's oneshot handle is resolved exactly once,
//!   with its own result or a terminal error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recall_dispatch::{CaptureSource, Dispatcher};
//! use recall_dispatch::store::HttpDocumentStore;
//! use recall_dispatch::upstream::HttpAnalysisBackend;
//!
//! #[tokio::main]
//! async fn main() -> recall_dispatch::Result<()> {
//!     let backend = HttpAnalysisBackend::new("https://api.example.com", "fast-summarizer")?;
//!     let store = HttpDocumentStore::new("https://store.example.com", "captures")?;
//!
//!     let dispatcher = Dispatcher::builder()
//!         .with_backend(Arc::new(backend))
//!         .with_store(Arc::new(store))
//!         .build()?;
//!
//!     let analysis = dispatcher
//!         .submit("some captured text", CaptureSource::Web, "client-1")
//!         .await?;
//!     println!("{}", analysis.title);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Dispatcher configuration and YAML loading |
//! | [`limiter`] | Two-tier fixed-window admission control |
//! | [`dispatch`] | Batch accumulation, dispatch execution, result routing |
//! | [`upstream`] | Upstream analysis backends and payload construction |
//! | [`store`] | Document store collaborators |
//! | [`types`] | Core type definitions (requests, analyses, documents) |

pub mod config;
pub mod dispatch;
pub mod limiter;
pub mod store;
pub mod types;
pub mod upstream;

// Re-export main types for convenience
pub use config::DispatcherConfig;
pub use dispatch::{Dispatcher, DispatcherBuilder, DispatcherSnapshot};
pub use store::DocumentStore;
pub use types::{
    analysis::{Analysis, CaptureDocument},
    request::CaptureSource,
};
pub use upstream::AnalysisBackend;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::Error;
