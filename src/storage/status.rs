//! Persisted wordlist status record.
//!
//! One [`WordlistStatus`] is kept per wordlist kind, serialized as JSON into an
//! app attribute of the store. It records where the stored words came from,
//! whether the import finished, how far an unfinished import got, and the
//! configuration hash the data was built with.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::word_type::WordType;

/// Schema version of [`WordlistStatus`]. Stored data with an older version is discarded.
pub const CURRENT_STATUS_VERSION: u32 = 3;

/// Origin of the stored words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordlistSourceType {
    /// Archive shipped with the application
    BuiltIn,
    /// Archive fetched from the configured auto-import URL
    AutoImport,
    /// Archive uploaded by an administrator
    User,
    /// Built-in archive standing in while the auto-import URL is failing
    TemporaryBuiltIn,
}

impl WordlistSourceType {
    pub fn label(&self) -> &'static str {
        match self {
            WordlistSourceType::BuiltIn => "Built-In",
            WordlistSourceType::AutoImport => "Auto-Import",
            WordlistSourceType::User => "User Imported",
            WordlistSourceType::TemporaryBuiltIn => "Temporary Built-In",
        }
    }
}

impl fmt::Display for WordlistSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fingerprint of a specific version of source content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordlistSourceInfo {
    /// Hex SHA-256 of the raw source bytes
    pub checksum: String,
    /// Raw source length in bytes
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordlistStatus {
    /// Schema version of this record
    pub version: u32,
    /// Import reached end of stream without cancellation
    pub completed: bool,
    pub source_type: Option<WordlistSourceType>,
    /// When the import started storing words
    pub store_date: Option<DateTime<Utc>>,
    /// When the source was last checked for changes
    pub check_date: Option<DateTime<Utc>>,
    pub remote_info: Option<WordlistSourceInfo>,
    /// Decompressed bytes of input already stored; resumed imports skip these
    pub bytes_imported: u64,
    /// Lines of input already stored
    pub lines_imported: u64,
    /// Distinct stored values (seed lists use this as the next key)
    pub value_count: u64,
    /// [`crate::config::WordlistConfiguration::config_hash`] of the stored data
    pub config_hash: String,
    /// Lines seen per word type
    pub word_type_counts: BTreeMap<WordType, u64>,
    /// Accumulated wall time spent importing, in milliseconds
    pub import_ms: u64,
}

impl WordlistStatus {
    /// Fresh, empty record for an import that is about to start.
    pub fn fresh(source_type: WordlistSourceType, remote_info: Option<WordlistSourceInfo>, config_hash: &str) -> Self {
        WordlistStatus {
            version: CURRENT_STATUS_VERSION,
            completed: false,
            source_type: Some(source_type),
            store_date: Some(Utc::now()),
            check_date: Some(Utc::now()),
            remote_info,
            config_hash: config_hash.to_string(),
            ..Default::default()
        }
    }

    pub fn is_current_version(&self) -> bool {
        self.version >= CURRENT_STATUS_VERSION
    }

    /// Word types that actually occur in the stored data.
    pub fn used_word_types(&self) -> BTreeSet<WordType> {
        self.word_type_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(word_type, _)| *word_type)
            .collect()
    }

    pub fn is_source(&self, source_type: WordlistSourceType) -> bool {
        self.source_type == Some(source_type)
    }
}
