//! 核心类型定义：捕获请求、结构化分析结果与持久化文档。
//!
//! # Core Type Definitions
//!
//! Shared types that flow through the dispatcher:
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`request::PendingRequest`] | An admitted request, owned by the batch until resolved |
//! | [`request::CaptureSource`] | Which client surface produced the capture |
//! | [`analysis::Analysis`] | One structured result from the upstream service |
//! | [`analysis::CaptureDocument`] | Row shape persisted to the document store |

pub mod analysis;
pub mod request;

pub use analysis::{Analysis, CaptureDocument};
pub use request::{CaptureSource, PendingRequest};
