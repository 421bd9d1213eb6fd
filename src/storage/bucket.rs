//! Wordlist bucket: the word data of one wordlist kind inside a [`LocalStore`].
//!
//! A containment bucket (kind `Word`) stores normalized words, word chunks and
//! hash tokens as keys with empty values and answers membership queries. A seed
//! bucket (kind `Seed`) stores words as values under a monotonically increasing
//! counter key so that a random word can be fetched by index.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use log::*;
use rand::Rng;

use crate::config::{WordlistConfiguration, WordlistKind};
use crate::crypto::word_type::WordType;
use crate::storage::status::WordlistStatus;
use crate::storage::store::{LocalStore, StoreDb};
use crate::utils::io_utils::free_space;
use crate::utils::normalizer::chunk;
use crate::{Result, WordlistError};

/// Seed lists smaller than this cannot produce usefully random words.
pub const MIN_SEED_LIST_SIZE: u64 = 1000;

pub struct WordlistBucket {
    store: Arc<dyn LocalStore>,
    config: Arc<WordlistConfiguration>,
    db: StoreDb,
    cached_size: Mutex<Option<u64>>,
}

impl WordlistBucket {
    pub fn new(store: Arc<dyn LocalStore>, config: Arc<WordlistConfiguration>) -> Self {
        let db = config.kind.store_db();
        Self {
            store,
            config,
            db,
            cached_size: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> WordlistKind {
        self.config.kind
    }

    /// Whether `key` (already normalized / converted) is stored.
    pub fn contains_word(&self, key: &str) -> Result<bool> {
        if self.kind() != WordlistKind::Word {
            return Err(WordlistError::invalid_state("containment checks are not supported on a seed list"));
        }
        self.store.contains(self.db, key)
    }

    /// Writes a batch of prepared words.
    ///
    /// Containment buckets store every chunk of raw words and hash tokens as-is.
    /// Seed buckets number the words starting at `status.value_count` and persist
    /// the advanced counter in `status`.
    pub fn add_words<'a, I>(&self, words: I, status: &mut WordlistStatus) -> Result<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        match self.kind() {
            WordlistKind::Word => {
                let mut keys = HashSet::new();
                for word in words {
                    if WordType::determine_word_type(word).is_raw() {
                        keys.extend(chunk(word, self.config.check_size));
                    } else {
                        keys.insert(word.clone());
                    }
                }
                let entries: Vec<(String, String)> = keys.into_iter().map(|k| (k, String::new())).collect();
                self.store.put_all(self.db, &entries)?;
            }
            WordlistKind::Seed => {
                let start = status.value_count;
                let entries: Vec<(String, String)> = words
                    .into_iter()
                    .enumerate()
                    .map(|(i, word)| ((start + i as u64).to_string(), word.clone()))
                    .collect();
                self.store.put_all(self.db, &entries)?;
                let next = start + entries.len() as u64;
                if next != start {
                    status.value_count = next;
                    self.write_wordlist_status(status)?;
                }
            }
        }
        self.invalidate_size();
        Ok(())
    }

    /// Returns a uniformly chosen word from a seed bucket.
    pub fn random_seed(&self) -> Result<String> {
        if self.kind() != WordlistKind::Seed {
            return Err(WordlistError::invalid_state("random seeds are only available from a seed list"));
        }
        let size = self.size()?;
        if size <= MIN_SEED_LIST_SIZE {
            return Err(WordlistError::invalid_state(format!(
                "seed list holds {} words, more than {} are required",
                size, MIN_SEED_LIST_SIZE
            )));
        }
        let index = rand::rng().random_range(0..size);
        self.store
            .get(self.db, &index.to_string())?
            .ok_or_else(|| WordlistError::invalid_state(format!("seed list has no entry at index {}", index)))
    }

    /// Reads the persisted status, or an empty default if none has been written.
    pub fn read_wordlist_status(&self) -> Result<WordlistStatus> {
        match self.store.read_app_attribute(self.config.kind.status_attribute())? {
            None => Ok(WordlistStatus::default()),
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| WordlistError::import_error(format!("stored wordlist status is unreadable: {}", e))),
        }
    }

    pub fn write_wordlist_status(&self, status: &WordlistStatus) -> Result<()> {
        let json = serde_json::to_string(status)?;
        self.store.write_app_attribute(self.config.kind.status_attribute(), Some(&json))
    }

    /// Removes every stored word. The status record is left to the caller.
    pub fn clear(&self) -> Result<()> {
        debug!("clearing {:?} bucket", self.db);
        self.store.truncate(self.db)?;
        self.invalidate_size();
        Ok(())
    }

    pub fn size(&self) -> Result<u64> {
        let mut cached = self.cached_size.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(size) = *cached {
            return Ok(size);
        }
        let size = self.store.size(self.db)?;
        *cached = Some(size);
        Ok(size)
    }

    /// Free bytes on the medium holding the store; unbounded for volatile stores.
    pub fn space_remaining(&self) -> Result<u64> {
        match self.store.location() {
            Some(location) => free_space(location),
            None => Ok(u64::MAX),
        }
    }

    fn invalidate_size(&self) {
        *self.cached_size.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
