//! Two-tier fixed-window admission control.
//!
//! A global window counts admitted upstream calls per minute across all
//! clients; a per-client window counts requests per minute for each client
//! identifier. Both are fixed (non-sliding) windows: a counter resets only
//! when a check observes its window has expired, so bursts are possible at
//! window boundaries. That is accepted behavior, not a bug.
//!
//! The limiter is a plain struct with `&mut self` methods. It holds no lock of
//! its own: the dispatcher core owns it behind the same mutex that guards the
//! current batch, so admission and batch membership are linearized together.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admitted,
    GlobalQuotaExceeded,
    ClientQuotaExceeded,
}

#[derive(Debug, Clone)]
struct FixedWindow {
    started: Instant,
    count: u32,
}

impl FixedWindow {
    fn new(now: Instant) -> Self {
        Self { started: now, count: 0 }
    }

    /// Reset to (now, 0) if the window has expired. Counts only ever grow
    /// within a window; this is the sole reset point.
    fn roll(&mut self, now: Instant, window: Duration) {
        if now.duration_since(self.started) >= window {
            self.started = now;
            self.count = 0;
        }
    }
}

pub struct RateLimiter {
    window: Duration,
    global_limit: u32,
    client_limit: u32,
    global: FixedWindow,
    clients: HashMap<String, FixedWindow>,
}

impl RateLimiter {
    pub fn new(window: Duration, global_limit: u32, client_limit: u32) -> Self {
        Self {
            window,
            global_limit,
            client_limit,
            global: FixedWindow::new(Instant::now()),
            clients: HashMap::new(),
        }
    }

    /// Decide admission for one request and, if admitted, charge both windows.
    ///
    /// The global tier is checked first; a global rejection does not touch the
    /// per-client window at all.
    pub fn admit(&mut self, client_id: &str, now: Instant) -> AdmissionDecision {
        self.global.roll(now, self.window);
        if self.global.count >= self.global_limit {
            return AdmissionDecision::GlobalQuotaExceeded;
        }

        self.prune_idle(now);
        let client = self
            .clients
            .entry(client_id.to_string())
            .or_insert_with(|| FixedWindow::new(now));
        client.roll(now, self.window);
        if client.count >= self.client_limit {
            return AdmissionDecision::ClientQuotaExceeded;
        }

        self.global.count += 1;
        client.count += 1;
        AdmissionDecision::Admitted
    }

    /// Remaining admissions in the current global window.
    pub fn global_remaining(&mut self, now: Instant) -> u32 {
        self.global.roll(now, self.window);
        self.global_limit.saturating_sub(self.global.count)
    }

    /// Dispatch-time re-check: is there still global headroom for `needed`
    /// upstream calls?
    pub fn has_headroom(&mut self, needed: u32, now: Instant) -> bool {
        self.global_remaining(now) >= needed
    }

    /// Drop per-client windows that have sat untouched for a full window;
    /// they would be reset on their next roll anyway. Keeps the map bounded.
    fn prune_idle(&mut self, now: Instant) {
        let window = self.window;
        self.clients
            .retain(|_, w| now.duration_since(w.started) < window);
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}
