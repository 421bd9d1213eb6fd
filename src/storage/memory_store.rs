//! Volatile [`LocalStore`] backed by hash maps, for tests and ephemeral use.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use crate::storage::store::{LocalStore, StoreDb, StoreIterator};
use crate::Result;

#[derive(Debug, Default)]
pub struct MemoryStore {
    dbs: RwLock<HashMap<StoreDb, HashMap<String, String>>>,
    attributes: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, db: StoreDb, key: &str) -> Result<Option<String>> {
        let dbs = self.dbs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(dbs.get(&db).and_then(|m| m.get(key)).cloned())
    }

    fn put(&self, db: StoreDb, key: &str, value: &str) -> Result<()> {
        let mut dbs = self.dbs.write().unwrap_or_else(PoisonError::into_inner);
        dbs.entry(db).or_default().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn put_all(&self, db: StoreDb, entries: &[(String, String)]) -> Result<()> {
        let mut dbs = self.dbs.write().unwrap_or_else(PoisonError::into_inner);
        let map = dbs.entry(db).or_default();
        for (key, value) in entries {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn contains(&self, db: StoreDb, key: &str) -> Result<bool> {
        let dbs = self.dbs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(dbs.get(&db).is_some_and(|m| m.contains_key(key)))
    }

    fn remove(&self, db: StoreDb, key: &str) -> Result<bool> {
        let mut dbs = self.dbs.write().unwrap_or_else(PoisonError::into_inner);
        Ok(dbs.get_mut(&db).is_some_and(|m| m.remove(key).is_some()))
    }

    fn truncate(&self, db: StoreDb) -> Result<()> {
        let mut dbs = self.dbs.write().unwrap_or_else(PoisonError::into_inner);
        dbs.remove(&db);
        Ok(())
    }

    fn size(&self, db: StoreDb) -> Result<u64> {
        let dbs = self.dbs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(dbs.get(&db).map_or(0, |m| m.len() as u64))
    }

    fn iter(&self, db: StoreDb) -> Result<StoreIterator<'_>> {
        // snapshot so callers never hold the lock across iteration
        let dbs = self.dbs.read().unwrap_or_else(PoisonError::into_inner);
        let entries: Vec<(String, String)> = dbs
            .get(&db)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn location(&self) -> Option<PathBuf> {
        None
    }

    fn read_app_attribute(&self, name: &str) -> Result<Option<String>> {
        let attributes = self.attributes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(attributes.get(name).cloned())
    }

    fn write_app_attribute(&self, name: &str, value: Option<&str>) -> Result<()> {
        let mut attributes = self.attributes.write().unwrap_or_else(PoisonError::into_inner);
        match value {
            Some(value) => attributes.insert(name.to_string(), value.to_string()),
            None => attributes.remove(name),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemoryStore::new();
        let db = StoreDb::WordlistWords;
        store.put_all(db, &[("a".into(), "".into()), ("b".into(), "".into())]).unwrap();
        store.put(db, "a", "").unwrap();
        assert_eq!(store.size(db).unwrap(), 2);
        assert!(store.contains(db, "a").unwrap());
        assert!(!store.contains(StoreDb::SeedlistWords, "a").unwrap());
        assert!(store.remove(db, "a").unwrap());
        assert!(!store.remove(db, "a").unwrap());
        assert_eq!(store.iter(db).unwrap().count(), 1);
        store.truncate(db).unwrap();
        assert_eq!(store.size(db).unwrap(), 0);
    }

    #[test]
    fn test_app_attributes() {
        let store = MemoryStore::new();
        assert_eq!(store.read_app_attribute("X").unwrap(), None);
        store.write_app_attribute("X", Some("1")).unwrap();
        assert_eq!(store.read_app_attribute("X").unwrap().as_deref(), Some("1"));
        store.write_app_attribute("X", None).unwrap();
        assert_eq!(store.read_app_attribute("X").unwrap(), None);
    }
}
