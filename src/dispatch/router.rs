//! Result delivery back to waiting callers.
//!
//! Every `PendingRequest` is resolved from exactly one call site: the
//! admission rejection path in `submit`, or the executor's batch-wide or
//! per-item resolution. The oneshot sender is consumed by the send, so a
//! second resolution of the same handle is unrepresentable.

use crate::types::request::{Outcome, PendingRequest};
use crate::Error;
use tracing::debug;

/// Complete one request's handle.
pub(crate) fn resolve(req: PendingRequest, outcome: Outcome) {
    let PendingRequest {
        handle, client_id, ..
    } = req;
    if handle.send(outcome).is_err() {
        // The caller stopped awaiting; the outcome has nowhere to go.
        debug!(client_id = %client_id, "caller dropped before resolution");
    }
}

/// Fail every member of a batch with the same terminal error.
pub(crate) fn fail_all<F>(batch: Vec<PendingRequest>, make_error: F)
where
    F: Fn() -> Error,
{
    for req in batch {
        resolve(req, Err(make_error()));
    }
}
