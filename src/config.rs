//! Wordlist configuration.
//!
//! [`WordlistConfiguration`] is built once from settings and shared read-only by
//! the bucket, importer, inspector and lookup facade. It can be deserialized from
//! JSON; every field has a default so partial documents are accepted.
//!
//! # Examples
//!
//! ```
//! use wordlist::config::{WordlistConfiguration, WordlistKind};
//!
//! let config: WordlistConfiguration = serde_json::from_str(
//!     r#"{ "kind": "Word", "check_size": 5, "case_sensitive": false }"#,
//! ).unwrap();
//! assert_eq!(config.check_size, 5);
//! assert_eq!(config.kind, WordlistKind::Word);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::crypto::digest::fast_hash_hex;
use crate::storage::store::StoreDb;
use crate::Result;

/// Bumped whenever the meaning of [`WordlistConfiguration::config_hash`] inputs changes.
const CONFIG_HASH_VERSION: u32 = 2;

const INSPECTOR_FREQUENCY_FLOOR: Duration = Duration::from_secs(60);
const INSPECTOR_FREQUENCY_CEILING: Duration = Duration::from_secs(24 * 60 * 60);

/// What a wordlist instance stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WordlistKind {
    /// Containment list: words (or word chunks / hash tokens) checked for membership.
    #[default]
    Word,
    /// Seed list: words stored under counter keys for random retrieval.
    Seed,
}

impl WordlistKind {
    /// Store namespace holding this kind's entries.
    pub fn store_db(&self) -> StoreDb {
        match self {
            WordlistKind::Word => StoreDb::WordlistWords,
            WordlistKind::Seed => StoreDb::SeedlistWords,
        }
    }

    /// App attribute name under which this kind's status record is kept.
    pub fn status_attribute(&self) -> &'static str {
        match self {
            WordlistKind::Word => "WORDLIST_STATUS",
            WordlistKind::Seed => "SEEDLIST_STATUS",
        }
    }
}

/// Backing store selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StoreType {
    /// Durable on-disk store under `data_dir`.
    #[default]
    LocalDb,
    /// Volatile in-process map.
    Memory,
}

/// Immutable wordlist settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WordlistConfiguration {
    /// Containment or seed list
    pub kind: WordlistKind,
    /// Backing store selector
    pub store_type: StoreType,
    /// Directory holding the local database (LocalDb only)
    pub data_dir: Option<PathBuf>,
    /// Whether words are compared case sensitively
    pub case_sensitive: bool,
    /// Substring length for containment checks, 0 checks whole words
    pub check_size: usize,
    /// Words shorter than this (in chars) are ignored
    pub min_word_size: usize,
    /// Words longer than this (in chars) are truncated
    pub max_word_size: usize,
    /// Remote (or file://) archive that supersedes the built-in list
    pub auto_import_url: Option<Url>,
    /// Archive shipped with the application
    pub builtin_path: Option<PathBuf>,
    /// Lines starting with any of these are ignored
    pub comment_prefixes: Vec<String>,
    /// Target wall time of a single write transaction, in milliseconds
    pub import_duration_goal_ms: u64,
    /// Lower bound of words per transaction
    pub import_min_transactions: usize,
    /// Upper bound of words per transaction
    pub import_max_transactions: usize,
    /// Flush once buffered words hold this many chars
    pub import_max_chars: usize,
    /// Abort imports when the store location has less free space (bytes)
    pub import_min_free_space: u64,
    /// Sleep inserted every `import_pause_frequency` transactions, in milliseconds
    pub import_pause_duration_ms: u64,
    /// Number of transactions between pauses, 0 disables pausing
    pub import_pause_frequency: u64,
    /// Interval between background inspector runs, in milliseconds
    pub inspector_frequency_ms: u64,
    /// Minimum age of an auto-import check before the remote source is probed again, in milliseconds
    pub auto_import_recheck_ms: u64,
    /// Synthetic lookups run in the background after open
    pub warmup_lookups: usize,
    /// Average check latency above which the periodic statistics log warns, in milliseconds
    pub check_time_warning_ms: u64,
    /// Accept any TLS certificate when fetching `auto_import_url`
    pub prompt_trust_all: bool,
    /// Optional overall timeout for remote fetches, in milliseconds; unset uses the transport default
    pub fetch_timeout_ms: Option<u64>,
    /// Start the background inspector thread on open
    pub background_inspection: bool,
}

impl Default for WordlistConfiguration {
    fn default() -> Self {
        WordlistConfiguration {
            kind: WordlistKind::Word,
            store_type: StoreType::LocalDb,
            data_dir: None,
            case_sensitive: false,
            check_size: 0,
            min_word_size: 3,
            max_word_size: 64,
            auto_import_url: None,
            builtin_path: None,
            comment_prefixes: vec!["!#".to_string()],
            import_duration_goal_ms: 1_000,
            import_min_transactions: 10,
            import_max_transactions: 50_000,
            import_max_chars: 10 * 1024 * 1024,
            import_min_free_space: 100 * 1024 * 1024,
            import_pause_duration_ms: 100,
            import_pause_frequency: 0,
            inspector_frequency_ms: 5 * 60 * 1000,
            auto_import_recheck_ms: 24 * 60 * 60 * 1000,
            warmup_lookups: 0,
            check_time_warning_ms: 100,
            prompt_trust_all: false,
            fetch_timeout_ms: None,
            background_inspection: true,
        }
    }
}

impl WordlistConfiguration {
    /// Loads a configuration from a JSON document on disk.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Deterministic hash of every setting that changes the stored data.
    ///
    /// A stored wordlist whose hash differs from the live configuration is
    /// cleared and reimported by the inspector.
    pub fn config_hash(&self) -> String {
        let fingerprint = format!(
            "v{}|{:?}|case={}|chunk={}|min={}|max={}",
            CONFIG_HASH_VERSION,
            self.kind,
            self.case_sensitive,
            self.check_size,
            self.min_word_size,
            self.max_word_size,
        );
        fast_hash_hex(fingerprint.as_bytes())
    }

    pub fn import_duration_goal(&self) -> Duration {
        Duration::from_millis(self.import_duration_goal_ms)
    }

    pub fn import_pause_duration(&self) -> Duration {
        Duration::from_millis(self.import_pause_duration_ms)
    }

    pub fn auto_import_recheck(&self) -> Duration {
        Duration::from_millis(self.auto_import_recheck_ms)
    }

    pub fn check_time_warning(&self) -> Duration {
        Duration::from_millis(self.check_time_warning_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    /// Inspector interval, clamped to between one minute and one day.
    pub fn inspector_frequency(&self) -> Duration {
        Duration::from_millis(self.inspector_frequency_ms)
            .clamp(INSPECTOR_FREQUENCY_FLOOR, INSPECTOR_FREQUENCY_CEILING)
    }

    /// Whether `line` starts with a configured comment prefix.
    pub fn is_comment(&self, line: &str) -> bool {
        self.comment_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && line.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_hash_tracks_data_settings() {
        let base = WordlistConfiguration::default();
        let same = WordlistConfiguration { warmup_lookups: 99, ..base.clone() };
        assert_eq!(base.config_hash(), same.config_hash());

        let chunked = WordlistConfiguration { check_size: 4, ..base.clone() };
        assert_ne!(base.config_hash(), chunked.config_hash());

        let cased = WordlistConfiguration { case_sensitive: true, ..base.clone() };
        assert_ne!(base.config_hash(), cased.config_hash());
    }

    #[test]
    fn test_inspector_frequency_is_clamped() {
        let fast = WordlistConfiguration { inspector_frequency_ms: 1, ..Default::default() };
        assert_eq!(fast.inspector_frequency(), Duration::from_secs(60));

        let slow = WordlistConfiguration { inspector_frequency_ms: u64::MAX, ..Default::default() };
        assert_eq!(slow.inspector_frequency(), Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: WordlistConfiguration =
            serde_json::from_str(r##"{"min_word_size": 4, "comment_prefixes": ["#"]}"##).unwrap();
        assert_eq!(config.min_word_size, 4);
        assert_eq!(config.max_word_size, 64);
        assert!(config.is_comment("# header"));
        assert!(!config.is_comment("!#old"));
    }
}
