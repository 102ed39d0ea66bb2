//! Counters shared between the poller and the status API.

use std::sync::atomic::{AtomicU64, Ordering};

/// Updated by the poller and its send tasks, read by `/health` and `/stats`.
#[derive(Default)]
pub struct HealthState {
    pub cycles_completed: AtomicU64,
    pub cycles_failed: AtomicU64,
    /// Nanosecond timestamp of the last cycle that finished without error (0 = none).
    pub last_cycle_at_ns: AtomicU64,
    pub notifications_sent: AtomicU64,
    pub send_failures: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle_ok(&self, at_ns: u64) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_at_ns.store(at_ns, Ordering::Relaxed);
    }

    pub fn record_cycle_failed(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send(&self, ok: bool) {
        if ok {
            self.notifications_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.send_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn cycles_failed(&self) -> u64 {
        self.cycles_failed.load(Ordering::Relaxed)
    }

    pub fn last_cycle_at_ns(&self) -> u64 {
        self.last_cycle_at_ns.load(Ordering::Relaxed)
    }

    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }
}
