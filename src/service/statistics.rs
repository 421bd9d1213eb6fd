//! Runtime counters of the lookup path.
//!
//! Every counter is an independent atomic, so concurrent request threads never
//! contend on a lock. A snapshot read while checks are running can be slightly
//! inconsistent across counters; each counter on its own is exact.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::*;
use serde::Serialize;

use crate::utils::moving_average::AtomicMovingAverage;
use crate::utils::periodic::PeriodicGate;

const STATISTICS_LOG_INTERVAL: Duration = Duration::from_secs(5 * 60);
const AVERAGE_WINDOW: u64 = 1000;

#[derive(Debug)]
pub struct WordlistStatistics {
    word_checks: AtomicU64,
    word_hits: AtomicU64,
    word_misses: AtomicU64,
    chunk_checks: AtomicU64,
    chunk_hits: AtomicU64,
    chunk_misses: AtomicU64,
    check_micros: AtomicMovingAverage,
    word_length: AtomicMovingAverage,
    chunks_per_check: AtomicMovingAverage,
    check_time_warning: Duration,
    log_gate: PeriodicGate,
}

/// Point-in-time copy of [`WordlistStatistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub word_checks: u64,
    pub word_hits: u64,
    pub word_misses: u64,
    pub chunk_checks: u64,
    pub chunk_hits: u64,
    pub chunk_misses: u64,
    pub avg_check_time_ms: f64,
    pub avg_word_length: f64,
    pub avg_chunks_per_check: f64,
}

impl WordlistStatistics {
    pub fn new(check_time_warning: Duration) -> Self {
        Self {
            word_checks: AtomicU64::new(0),
            word_hits: AtomicU64::new(0),
            word_misses: AtomicU64::new(0),
            chunk_checks: AtomicU64::new(0),
            chunk_hits: AtomicU64::new(0),
            chunk_misses: AtomicU64::new(0),
            check_micros: AtomicMovingAverage::new(AVERAGE_WINDOW),
            word_length: AtomicMovingAverage::new(AVERAGE_WINDOW),
            chunks_per_check: AtomicMovingAverage::new(AVERAGE_WINDOW),
            check_time_warning,
            log_gate: PeriodicGate::new(STATISTICS_LOG_INTERVAL),
        }
    }

    /// Records one bucket membership test.
    pub fn record_chunk(&self, hit: bool) {
        self.chunk_checks.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.chunk_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.chunk_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records one completed word check.
    pub fn record_word(&self, hit: bool, word_length: usize, chunks: usize, elapsed: Duration) {
        self.word_checks.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.word_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.word_misses.fetch_add(1, Ordering::Relaxed);
        }
        self.check_micros.update(elapsed.as_secs_f64() * 1_000_000.0);
        self.word_length.update(word_length as f64);
        self.chunks_per_check.update(chunks as f64);
    }

    pub fn average_check_time(&self) -> Duration {
        Duration::from_secs_f64(self.check_micros.average().max(0.0) / 1_000_000.0)
    }

    /// Whether checks are slower on average than the configured warning threshold.
    pub fn is_check_time_excessive(&self) -> bool {
        self.check_micros.samples() > 0 && self.average_check_time() > self.check_time_warning
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            word_checks: self.word_checks.load(Ordering::Relaxed),
            word_hits: self.word_hits.load(Ordering::Relaxed),
            word_misses: self.word_misses.load(Ordering::Relaxed),
            chunk_checks: self.chunk_checks.load(Ordering::Relaxed),
            chunk_hits: self.chunk_hits.load(Ordering::Relaxed),
            chunk_misses: self.chunk_misses.load(Ordering::Relaxed),
            avg_check_time_ms: self.check_micros.average() / 1000.0,
            avg_word_length: self.word_length.average(),
            avg_chunks_per_check: self.chunks_per_check.average(),
        }
    }

    /// Emits the periodic statistics line, at most once per interval.
    pub fn log_periodically(&self, label: &str) {
        if !self.log_gate.ready() {
            return;
        }
        let stats = self.snapshot();
        debug!(
            "{} statistics: checks={} hits={} misses={} chunkChecks={} avgCheckTime={:.3}ms avgWordLength={:.1}",
            label,
            stats.word_checks,
            stats.word_hits,
            stats.word_misses,
            stats.chunk_checks,
            stats.avg_check_time_ms,
            stats.avg_word_length
        );
        if self.is_check_time_excessive() {
            warn!(
                "{} average check time {:.3}ms exceeds the {}ms warning threshold; consider a larger chunk size or a faster store",
                label,
                stats.avg_check_time_ms,
                self.check_time_warning.as_millis()
            );
        }
    }
}
