//! Hash digest functions for wordlist entries and configuration fingerprints.
//!
//! This module provides the hash functions used for:
//! - Hashing user supplied passwords before comparing them to pre-hashed wordlist lines
//! - Fingerprinting remote wordlist sources
//! - Computing fast, stable hashes of configuration settings
//!
//! # Examples
//!
//! ```
//! use wordlist::crypto::digest::{hex_digest, HashAlgorithm};
//!
//! let hash = hex_digest(HashAlgorithm::Md5, b"password");
//! assert_eq!(hash, "5f4dcc3b5aa765d61d8327deb882cf99");
//! ```

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use xxhash_rust::xxh64::Xxh64;

/// Digest algorithms a hashed wordlist line may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Length of the lowercase hex encoding of this algorithm's digest.
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 32,
            HashAlgorithm::Sha1 => 40,
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha512 => 128,
        }
    }
}

/// Computes the lowercase hex digest of `data` with the given algorithm.
pub fn hex_digest(algorithm: HashAlgorithm, data: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Md5 => hex::encode(Md5::digest(data)),
        HashAlgorithm::Sha1 => hex::encode(Sha1::digest(data)),
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        HashAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
    }
}

/// Computes a 64-bit XXH64 hash of the input, hex encoded in big-endian order.
///
/// Used for configuration fingerprints, where stability across runs matters and
/// collision resistance does not.
///
/// # Examples
///
/// ```
/// use wordlist::crypto::digest::fast_hash_hex;
///
/// let hash = fast_hash_hex(b"test data");
/// assert_eq!(hash.len(), 16);
/// assert_eq!(hash, fast_hash_hex(b"test data"));
/// ```
pub fn fast_hash_hex(input: &[u8]) -> String {
    let mut hasher = Xxh64::new(0);
    hasher.update(input);
    hex::encode(hasher.digest().to_be_bytes())
}

/// Incremental SHA-256 used to fingerprint wordlist sources while streaming them.
#[derive(Default, Clone)]
pub struct StreamChecksum {
    hasher: Sha256,
    length: u64,
}

impl StreamChecksum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.length += data.len() as u64;
    }

    /// Bytes fed so far.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Finishes the hash, returning the hex checksum and the total length.
    pub fn finish(self) -> (String, u64) {
        (hex::encode(self.hasher.finalize()), self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(hex_digest(HashAlgorithm::Md5, b"password"), "5f4dcc3b5aa765d61d8327deb882cf99");
        assert_eq!(
            hex_digest(HashAlgorithm::Sha1, b"password"),
            "5baa61e4c9b93f3f0682250b6cf8331b7ee68fd8"
        );
        assert_eq!(
            hex_digest(HashAlgorithm::Sha256, b"password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn test_hex_len_matches_digest() {
        for algorithm in [HashAlgorithm::Md5, HashAlgorithm::Sha1, HashAlgorithm::Sha256, HashAlgorithm::Sha512] {
            assert_eq!(hex_digest(algorithm, b"abc").len(), algorithm.hex_len());
        }
    }

    #[test]
    fn test_stream_checksum_matches_one_shot() {
        let mut checksum = StreamChecksum::new();
        checksum.update(b"pass");
        checksum.update(b"word");
        let (hash, length) = checksum.finish();
        assert_eq!(length, 8);
        assert_eq!(hash, hex_digest(HashAlgorithm::Sha256, b"password"));
    }
}
