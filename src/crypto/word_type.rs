//! Classification of wordlist lines into raw words and hash tokens.
//!
//! A single wordlist may mix plaintext lines and pre-hashed lines. Hashed lines
//! are recognized as `<hex>:<TYPE>` or `<TYPE>:<hex>` (type name and hex digits in
//! any case) and stored canonically as `<lowercase-hex>:<TYPE>`, digest first so
//! that stored keys spread evenly.
//!
//! # Examples
//!
//! ```
//! use wordlist::crypto::word_type::WordType;
//!
//! let line = "MD5:5F4DCC3B5AA765D61D8327DEB882CF99";
//! assert_eq!(WordType::determine_word_type(line), WordType::Md5);
//! assert_eq!(WordType::determine_word_type("hunter2"), WordType::Raw);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::WordlistConfiguration;
use crate::crypto::digest::{hex_digest, HashAlgorithm};

static HASH_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(?:(?P<pre>md5|sha1|sha256|sha512):(?P<hex1>[0-9a-f]+)|(?P<hex2>[0-9a-f]+):(?P<post>md5|sha1|sha256|sha512))$")
        .expect("hash line pattern is valid")
});

/// Representation of a stored wordlist line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WordType {
    Raw,
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl WordType {
    pub const ALL: [WordType; 5] = [WordType::Raw, WordType::Md5, WordType::Sha1, WordType::Sha256, WordType::Sha512];

    pub fn is_raw(&self) -> bool {
        *self == WordType::Raw
    }

    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        match self {
            WordType::Raw => None,
            WordType::Md5 => Some(HashAlgorithm::Md5),
            WordType::Sha1 => Some(HashAlgorithm::Sha1),
            WordType::Sha256 => Some(HashAlgorithm::Sha256),
            WordType::Sha512 => Some(HashAlgorithm::Sha512),
        }
    }

    /// Upper case name used in the stored suffix.
    pub fn type_name(&self) -> &'static str {
        match self {
            WordType::Raw => "RAW",
            WordType::Md5 => "MD5",
            WordType::Sha1 => "SHA1",
            WordType::Sha256 => "SHA256",
            WordType::Sha512 => "SHA512",
        }
    }

    fn from_type_name(name: &str) -> Option<WordType> {
        WordType::ALL
            .into_iter()
            .filter(|t| !t.is_raw())
            .find(|t| t.type_name().eq_ignore_ascii_case(name))
    }

    /// Determines the type of a wordlist line, defaulting to [`WordType::Raw`].
    pub fn determine_word_type(line: &str) -> WordType {
        match parse_hash_line(line) {
            Some((word_type, _)) => word_type,
            None => WordType::Raw,
        }
    }

    /// Wraps a hex digest in the canonical stored form.
    pub fn make_canonical(&self, hex_digest: &str) -> String {
        format!("{}:{}", hex_digest.to_ascii_lowercase(), self.type_name())
    }

    /// Converts a line read from a wordlist archive into its stored representation.
    ///
    /// Raw words are case folded when the configuration is case insensitive; hash
    /// lines are re-wrapped canonically. Length bounds are applied separately by
    /// the normalizer.
    pub fn convert_input_from_wordlist(&self, config: &WordlistConfiguration, line: &str) -> String {
        match self {
            WordType::Raw => fold_case(config, line),
            _ => match parse_hash_line(line) {
                Some((_, hex)) => self.make_canonical(hex),
                None => fold_case(config, line),
            },
        }
    }

    /// Converts a user supplied word into the representation this type stores.
    ///
    /// For hash types the word is digested once with the type's algorithm, so the
    /// lookup path never needs plaintext entries for hashed lists.
    pub fn convert_input_from_user(&self, config: &WordlistConfiguration, word: &str) -> String {
        match self.hash_algorithm() {
            None => fold_case(config, word),
            Some(algorithm) => self.make_canonical(&hex_digest(algorithm, word.as_bytes())),
        }
    }
}

fn fold_case(config: &WordlistConfiguration, word: &str) -> String {
    if config.case_sensitive {
        word.to_string()
    } else {
        word.to_lowercase()
    }
}

fn parse_hash_line(line: &str) -> Option<(WordType, &str)> {
    let line = line.trim();
    let captures = HASH_LINE.captures(line)?;
    let (name, hex) = match (captures.name("pre"), captures.name("hex1")) {
        (Some(name), Some(hex)) => (name, hex),
        _ => (captures.name("post")?, captures.name("hex2")?),
    };
    let word_type = WordType::from_type_name(name.as_str())?;
    let algorithm = word_type.hash_algorithm()?;
    if hex.as_str().len() != algorithm.hex_len() {
        return None;
    }
    Some((word_type, hex.as_str()))
}
