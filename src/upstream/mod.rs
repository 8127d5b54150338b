//! 上游分析服务模块：组合负载构造、HTTP 后端与应答解析。
//!
//! # Upstream Analysis Module
//!
//! The dispatcher makes exactly one upstream call per flushed batch. This
//! module owns both ends of that call: building the combined payload and
//! turning the model's reply back into positionally matched results.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`AnalysisBackend`] | Trait seam for the upstream text-analysis service |
//! | [`HttpAnalysisBackend`] | Production backend over a chat-completions API |
//! | [`ScriptedBackend`] | Queue-driven backend for tests |
//! | `prompt` | Payload construction and fence-tolerant reply parsing |

mod backend;
mod http;
pub(crate) mod prompt;

pub use backend::{AnalysisBackend, ScriptedBackend};
pub use http::HttpAnalysisBackend;
