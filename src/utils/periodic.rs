//! Rate limiting for periodic side work.
//!
//! Importers, the statistics logger and the status writer all need to do
//! something "no more often than every N": persist a progress snapshot, check
//! free space, emit a log line. A [`PeriodicGate`] answers that question
//! without a timer thread, so the hot loop only pays for a clock read.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use wordlist::utils::periodic::PeriodicGate;
//!
//! let gate = PeriodicGate::new(Duration::from_secs(10));
//! let mut snapshots = 0;
//! for _ in 0..1000 {
//!     if gate.ready() {
//!         snapshots += 1;
//!     }
//! }
//! assert_eq!(snapshots, 0);
//! ```

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct PeriodicGate {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl PeriodicGate {
    /// Creates a gate whose first opening is one `interval` from now.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(Some(Instant::now())),
        }
    }

    /// Creates a gate that is open immediately.
    pub fn new_ready(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Returns `true` at most once per interval. Concurrent callers race for the
    /// opening; exactly one of them wins it.
    pub fn ready(&self) -> bool {
        let Ok(mut last) = self.last.try_lock() else {
            return false;
        };
        let now = Instant::now();
        if last.is_none_or(|last| now.duration_since(last) >= self.interval) {
            *last = Some(now);
            return true;
        }
        false
    }

    /// Runs `task` if the gate is open.
    pub fn run<T, F: FnOnce() -> T>(&self, task: F) -> Option<T> {
        if self.ready() { Some(task()) } else { None }
    }
}
