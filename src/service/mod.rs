// Wordlist service
//
// This module provides the lookup facade with its administrative operations
// and background inspection, and the runtime statistics of the lookup path.

pub mod statistics;
pub mod wordlist;

pub use statistics::{StatisticsSnapshot, WordlistStatistics};
pub use wordlist::{Activity, ErrorRecord, HealthRecord, HealthStatus, Wordlist};
