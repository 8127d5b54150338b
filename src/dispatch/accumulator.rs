//! Batch accumulation.

use crate::types::request::PendingRequest;

/// Outcome of appending a request to the current batch.
#[derive(Debug)]
pub(crate) enum EnqueueOutcome {
    /// First member of a fresh batch; the idle timer must be armed for this
    /// generation.
    First { generation: u64 },
    /// Appended below the cap; nothing to do.
    Added { len: usize },
    /// The cap was reached; the captured batch must be dispatched now.
    Full(Vec<PendingRequest>),
}

/// Arrival-ordered batch with a size cap.
///
/// Each batch instance is identified by a generation number. Swapping the
/// batch out (either flush path) bumps the generation, which disarms any idle
/// timer armed for the previous instance: the timer re-checks its generation
/// under the core lock before taking the batch, so the timer and the size cap
/// can never both flush the same instance.
pub(crate) struct BatchAccumulator {
    cap: usize,
    items: Vec<PendingRequest>,
    generation: u64,
}

impl BatchAccumulator {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            items: Vec::new(),
            generation: 0,
        }
    }

    pub fn enqueue(&mut self, req: PendingRequest) -> EnqueueOutcome {
        self.items.push(req);
        if self.items.len() >= self.cap {
            return EnqueueOutcome::Full(self.swap());
        }
        if self.items.len() == 1 {
            return EnqueueOutcome::First {
                generation: self.generation,
            };
        }
        EnqueueOutcome::Added {
            len: self.items.len(),
        }
    }

    /// Timer-path flush: take the batch only if `generation` still names the
    /// current instance and it has members.
    pub fn take_if_generation(&mut self, generation: u64) -> Option<Vec<PendingRequest>> {
        if self.generation == generation && !self.items.is_empty() {
            Some(self.swap())
        } else {
            None
        }
    }

    fn swap(&mut self) -> Vec<PendingRequest> {
        self.generation = self.generation.wrapping_add(1);
        std::mem::take(&mut self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
