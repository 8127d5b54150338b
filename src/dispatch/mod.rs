//! 批量调度模块：批次聚合、上游分发执行与结果回送。
//!
//! # Batch Dispatch Module
//!
//! Everything between a request's admission and the resolution of its result
//! handle lives here.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | `BatchAccumulator` | Arrival-ordered batch with a size cap and generation-guarded flush |
//! | `DispatchExecutor` | One combined upstream call per flushed batch, plus persistence |
//! | `router` | Resolves each request's oneshot handle exactly once |
//! | [`Dispatcher`] | The public facade owning the lock-guarded core state |
//!
//! ## Flush Discipline
//!
//! A batch flushes when its 5th member arrives or when 30 seconds have passed
//! since its first, whichever comes first. Both triggers funnel through the
//! same mutex-guarded swap, keyed by the batch generation, so a batch instance
//! is dispatched at most once. The swap installs a fresh empty batch before
//! the captured one is handed to the executor, so enqueues never wait on an
//! in-flight dispatch.

mod accumulator;
mod executor;
pub(crate) mod router;
mod service;

pub use service::{Dispatcher, DispatcherBuilder, DispatcherSnapshot};
