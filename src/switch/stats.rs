use core::sync::atomic::{AtomicU64, Ordering};

use super::Outcome;

/// Per-outcome frame counters, shared by all processing units.
#[derive(Debug, Default)]
pub struct Stats {
    static_hits: AtomicU64,
    dynamic_hits: AtomicU64,
    misses: AtomicU64,
    learned: AtomicU64,
    not_found: AtomicU64,
    passthrough: AtomicU64,
    dropped: AtomicU64,
}

/// A copy of the counters at one point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub static_hits: u64,
    pub dynamic_hits: u64,
    pub misses: u64,
    pub learned: u64,
    pub not_found: u64,
    pub passthrough: u64,
    pub dropped: u64,
}

impl StatsSnapshot {
    /// Requests answered by the switch.
    pub fn hits(&self) -> u64 {
        self.static_hits + self.dynamic_hits
    }

    /// Requests seen, answered or not.
    pub fn requests(&self) -> u64 {
        self.hits() + self.misses
    }
}

impl Stats {
    pub(crate) fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::StaticHit => &self.static_hits,
            Outcome::DynamicHit => &self.dynamic_hits,
            Outcome::Miss => &self.misses,
            Outcome::Learned => &self.learned,
            Outcome::NotFound => &self.not_found,
            Outcome::Passthrough => &self.passthrough,
            Outcome::Dropped => &self.dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            static_hits: self.static_hits.load(Ordering::Relaxed),
            dynamic_hits: self.dynamic_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            learned: self.learned.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            passthrough: self.passthrough.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
