//! Adaptive transaction sizing for bulk imports.
//!
//! Keeps a moving estimate of the cost of writing one word and sizes the next
//! batch so a transaction takes about the configured goal duration, clamped to
//! the configured bounds. Growth is limited to doubling per transaction so a
//! single fast flush cannot produce an oversized batch.

use std::time::Duration;

/// Weight of the newest sample in the per-item cost estimate.
const COST_SMOOTHING: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct TransactionSizeCalculator {
    goal: Duration,
    min: usize,
    max: usize,
    current: usize,
    nanos_per_item: Option<f64>,
}

impl TransactionSizeCalculator {
    pub fn new(goal: Duration, min: usize, max: usize) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            goal,
            min,
            max,
            current: min,
            nanos_per_item: None,
        }
    }

    /// Number of words the next transaction should hold.
    pub fn transaction_size(&self) -> usize {
        self.current
    }

    /// Feeds back how long a transaction of `items` words took.
    pub fn record(&mut self, duration: Duration, items: usize) {
        if items == 0 {
            return;
        }
        let sample = duration.as_nanos() as f64 / items as f64;
        let estimate = match self.nanos_per_item {
            Some(previous) => previous + (sample - previous) * COST_SMOOTHING,
            None => sample,
        };
        self.nanos_per_item = Some(estimate);

        let target = if estimate <= 0.0 {
            self.max
        } else {
            let ideal = self.goal.as_nanos() as f64 / estimate;
            if ideal >= self.max as f64 { self.max } else { ideal as usize }
        };
        let ceiling = self.current.saturating_mul(2);
        self.current = target.min(ceiling).clamp(self.min, self.max);
    }
}
