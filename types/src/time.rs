//! Timestamps and task participation windows.
//!
//! Timestamps are Unix epoch seconds (UTC). Every engine takes `now` as an
//! explicit argument so the protocol stays deterministic and testable; only
//! the node layer reads the system clock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// The half-open participation window of a task.
///
/// Completions are accepted while `start <= now <= end`. The invariant
/// `end > start` is checked at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TaskWindow {
    /// Build a window, rejecting non-positive durations.
    pub fn new(start: Timestamp, end: Timestamp) -> Option<Self> {
        if end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Whether `now` falls inside the window (inclusive on both ends).
    pub fn contains(&self, now: Timestamp) -> bool {
        now >= self.start && now <= self.end
    }

    /// Window duration in seconds.
    pub fn duration_secs(&self) -> u64 {
        self.end.as_secs() - self.start.as_secs()
    }
}
