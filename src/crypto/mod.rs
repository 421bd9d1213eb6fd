// Hashing utilities for wordlist entries
//
// This module provides digest functions and the raw/hash word type classifier.

pub mod digest;
pub mod word_type;

pub use digest::{hex_digest, fast_hash_hex, HashAlgorithm, StreamChecksum};
pub use word_type::WordType;
