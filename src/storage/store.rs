//! Key/value store contract consumed by wordlist buckets.
//!
//! A store holds several logical namespaces ([`StoreDb`]) of string keys and
//! values, plus a small set of named "app attributes" used for metadata records
//! that live beside the bulk data. Backends are picked once at construction via
//! [`open_store`].

use std::path::PathBuf;
use std::sync::Arc;

use log::*;

use crate::config::{StoreType, WordlistConfiguration};
use crate::storage::memory_store::MemoryStore;
use crate::storage::sqlite_store::SqliteStore;
use crate::{Result, WordlistError};

/// File name of the durable store inside `data_dir`.
pub const LOCAL_DB_FILE_NAME: &str = "wordlist.db";

/// Logical namespaces in a [`LocalStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreDb {
    WordlistWords,
    SeedlistWords,
}

impl StoreDb {
    pub const ALL: [StoreDb; 2] = [StoreDb::WordlistWords, StoreDb::SeedlistWords];

    pub fn table_name(&self) -> &'static str {
        match self {
            StoreDb::WordlistWords => "wordlist_words",
            StoreDb::SeedlistWords => "seedlist_words",
        }
    }
}

/// Iterator over the `(key, value)` pairs of one namespace.
pub type StoreIterator<'a> = Box<dyn Iterator<Item = Result<(String, String)>> + 'a>;

pub trait LocalStore: Send + Sync {
    fn get(&self, db: StoreDb, key: &str) -> Result<Option<String>>;

    fn put(&self, db: StoreDb, key: &str, value: &str) -> Result<()>;

    /// Writes all entries atomically where the backend supports it.
    fn put_all(&self, db: StoreDb, entries: &[(String, String)]) -> Result<()>;

    fn contains(&self, db: StoreDb, key: &str) -> Result<bool>;

    /// Returns whether the key was present.
    fn remove(&self, db: StoreDb, key: &str) -> Result<bool>;

    fn truncate(&self, db: StoreDb) -> Result<()>;

    fn size(&self, db: StoreDb) -> Result<u64>;

    fn iter(&self, db: StoreDb) -> Result<StoreIterator<'_>>;

    /// Directory holding the store's files, `None` for volatile stores.
    fn location(&self) -> Option<PathBuf>;

    fn read_app_attribute(&self, name: &str) -> Result<Option<String>>;

    /// Stores `value` under `name`; `None` removes the attribute.
    fn write_app_attribute(&self, name: &str, value: Option<&str>) -> Result<()>;
}

/// Opens the backend selected by `config.store_type`.
pub fn open_store(config: &WordlistConfiguration) -> Result<Arc<dyn LocalStore>> {
    match config.store_type {
        StoreType::Memory => {
            debug!("opening in-memory wordlist store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreType::LocalDb => {
            let dir = config.data_dir.as_ref().ok_or_else(|| {
                WordlistError::invalid_state("data_dir must be configured for the LocalDb store")
            })?;
            std::fs::create_dir_all(dir)?;
            let path = dir.join(LOCAL_DB_FILE_NAME);
            info!("opening local wordlist store at {}", path.display());
            Ok(Arc::new(SqliteStore::open(path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_store_requires_data_dir() {
        let config = WordlistConfiguration { store_type: StoreType::LocalDb, data_dir: None, ..Default::default() };
        assert!(open_store(&config).is_err());
    }

    #[test]
    fn test_open_store_local_db() {
        let dir = tempfile::tempdir().unwrap();
        let config = WordlistConfiguration {
            store_type: StoreType::LocalDb,
            data_dir: Some(dir.path().join("nested")),
            ..Default::default()
        };
        let store = open_store(&config).unwrap();
        store.put(StoreDb::WordlistWords, "abc", "").unwrap();
        assert!(dir.path().join("nested").join(LOCAL_DB_FILE_NAME).exists());
        assert_eq!(store.location(), Some(dir.path().join("nested")));
    }
}
