// Utility functions and helpers
//
// This module provides word normalization, cancellation, rate limiting,
// I/O helpers and lock-free statistics primitives.

pub mod normalizer;
pub mod cancel;
pub mod periodic;
pub mod io_utils;
pub mod moving_average;

pub use normalizer::{normalize, chunk, chunk_count};
pub use cancel::CancelToken;
pub use periodic::PeriodicGate;
pub use io_utils::{CountingReader, ByteCounter, copy_to_sink, free_space, open_file_url_as_reader};
pub use moving_average::AtomicMovingAverage;
