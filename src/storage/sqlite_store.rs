//! Durable [`LocalStore`] backed by an SQLite database file.
//!
//! Each [`StoreDb`] namespace is a two-column table keyed by `key`; app
//! attributes live in their own table. Writes share one connection and batch
//! writes run in a single transaction; lookups use a second, read-only
//! connection so WAL readers are not queued behind an import transaction.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::*;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::storage::store::{LocalStore, StoreDb, StoreIterator};
use crate::Result;

const ITERATOR_PAGE_SIZE: usize = 1000;

pub struct SqliteStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            CREATE TABLE IF NOT EXISTS app_attributes (
                name   TEXT PRIMARY KEY,
                value  TEXT NOT NULL
            );
            "#,
        )?;
        for db in StoreDb::ALL {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, value TEXT NOT NULL) WITHOUT ROWID;",
                db.table_name()
            ))?;
        }
        let reader = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("opened sqlite store {}", path.display());
        Ok(Self { writer: Mutex::new(conn), reader: Mutex::new(reader), path })
    }

    fn writer(&self) -> MutexGuard<'_, Connection> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reader(&self) -> MutexGuard<'_, Connection> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_page(&self, db: StoreDb, after: Option<&str>) -> Result<Vec<(String, String)>> {
        let conn = self.reader();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT key, value FROM {} WHERE ?1 IS NULL OR key > ?1 ORDER BY key LIMIT ?2",
            db.table_name()
        ))?;
        let rows = stmt.query_map(params![after, ITERATOR_PAGE_SIZE as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut page = Vec::with_capacity(ITERATOR_PAGE_SIZE);
        for row in rows {
            page.push(row?);
        }
        Ok(page)
    }
}

impl LocalStore for SqliteStore {
    fn get(&self, db: StoreDb, key: &str) -> Result<Option<String>> {
        let conn = self.reader();
        let mut stmt = conn.prepare_cached(&format!("SELECT value FROM {} WHERE key = ?1", db.table_name()))?;
        let value = stmt.query_row(params![key], |row| row.get::<_, String>(0)).optional()?;
        Ok(value)
    }

    fn put(&self, db: StoreDb, key: &str, value: &str) -> Result<()> {
        let conn = self.writer();
        let mut stmt = conn.prepare_cached(&format!(
            "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
            db.table_name()
        ))?;
        stmt.execute(params![key, value])?;
        Ok(())
    }

    fn put_all(&self, db: StoreDb, entries: &[(String, String)]) -> Result<()> {
        let mut conn = self.writer();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
                db.table_name()
            ))?;
            for (key, value) in entries {
                stmt.execute(params![key, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn contains(&self, db: StoreDb, key: &str) -> Result<bool> {
        let conn = self.reader();
        let mut stmt = conn.prepare_cached(&format!("SELECT 1 FROM {} WHERE key = ?1", db.table_name()))?;
        Ok(stmt.exists(params![key])?)
    }

    fn remove(&self, db: StoreDb, key: &str) -> Result<bool> {
        let conn = self.writer();
        let changed = conn.execute(&format!("DELETE FROM {} WHERE key = ?1", db.table_name()), params![key])?;
        Ok(changed > 0)
    }

    fn truncate(&self, db: StoreDb) -> Result<()> {
        let conn = self.writer();
        conn.execute(&format!("DELETE FROM {}", db.table_name()), [])?;
        Ok(())
    }

    fn size(&self, db: StoreDb) -> Result<u64> {
        let conn = self.reader();
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", db.table_name()), [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn iter(&self, db: StoreDb) -> Result<StoreIterator<'_>> {
        Ok(Box::new(PagedIter {
            store: self,
            db,
            last_key: None,
            page: VecDeque::new(),
            done: false,
        }))
    }

    fn location(&self) -> Option<PathBuf> {
        self.path.parent().map(Path::to_path_buf)
    }

    fn read_app_attribute(&self, name: &str) -> Result<Option<String>> {
        let conn = self.reader();
        let value = conn
            .query_row("SELECT value FROM app_attributes WHERE name = ?1", params![name], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn write_app_attribute(&self, name: &str, value: Option<&str>) -> Result<()> {
        let conn = self.writer();
        match value {
            Some(value) => conn.execute(
                "INSERT INTO app_attributes (name, value) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET value=excluded.value",
                params![name, value],
            )?,
            None => conn.execute("DELETE FROM app_attributes WHERE name = ?1", params![name])?,
        };
        Ok(())
    }
}

/// Keyset-paginated iterator; the reader lock is only held per page.
struct PagedIter<'a> {
    store: &'a SqliteStore,
    db: StoreDb,
    last_key: Option<String>,
    page: VecDeque<(String, String)>,
    done: bool,
}

impl Iterator for PagedIter<'_> {
    type Item = Result<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.done {
            match self.store.read_page(self.db, self.last_key.as_deref()) {
                Ok(page) => {
                    self.done = page.len() < ITERATOR_PAGE_SIZE;
                    self.page.extend(page);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        let entry = self.page.pop_front()?;
        self.last_key = Some(entry.0.clone());
        Some(Ok(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_get_contains() {
        let (_dir, store) = open_temp();
        let db = StoreDb::SeedlistWords;
        store.put(db, "0", "apple").unwrap();
        assert_eq!(store.get(db, "0").unwrap().as_deref(), Some("apple"));
        assert_eq!(store.get(db, "1").unwrap(), None);
        assert!(store.contains(db, "0").unwrap());
        assert!(!store.contains(StoreDb::WordlistWords, "0").unwrap());
    }

    #[test]
    fn test_put_all_is_idempotent() {
        let (_dir, store) = open_temp();
        let db = StoreDb::WordlistWords;
        let entries: Vec<(String, String)> = (0..50).map(|i| (format!("w{}", i), String::new())).collect();
        store.put_all(db, &entries).unwrap();
        store.put_all(db, &entries).unwrap();
        assert_eq!(store.size(db).unwrap(), 50);
        assert!(store.remove(db, "w1").unwrap());
        assert_eq!(store.size(db).unwrap(), 49);
        store.truncate(db).unwrap();
        assert_eq!(store.size(db).unwrap(), 0);
    }

    #[test]
    fn test_iterator_spans_pages() {
        let (_dir, store) = open_temp();
        let db = StoreDb::WordlistWords;
        let entries: Vec<(String, String)> = (0..2500).map(|i| (format!("{:05}", i), "v".to_string())).collect();
        store.put_all(db, &entries).unwrap();
        let keys: Vec<String> = store.iter(db).unwrap().map(|e| e.unwrap().0).collect();
        assert_eq!(keys.len(), 2500);
        assert_eq!(keys.first().map(String::as_str), Some("00000"));
        assert_eq!(keys.last().map(String::as_str), Some("02499"));
    }

    #[test]
    fn test_app_attributes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.write_app_attribute("WORDLIST_STATUS", Some("{}")).unwrap();
            store.write_app_attribute("WORDLIST_STATUS", Some("{\"a\":1}")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.read_app_attribute("WORDLIST_STATUS").unwrap().as_deref(), Some("{\"a\":1}"));
        store.write_app_attribute("WORDLIST_STATUS", None).unwrap();
        assert_eq!(store.read_app_attribute("WORDLIST_STATUS").unwrap(), None);
    }

    #[test]
    fn test_lookups_do_not_wait_for_open_write_transaction() {
        let (_dir, store) = open_temp();
        let db = StoreDb::WordlistWords;
        store.put(db, "committed", "").unwrap();

        let mut writer = store.writer();
        let tx = writer.transaction().unwrap();
        tx.execute(&format!("INSERT INTO {} (key, value) VALUES ('pending', '')", db.table_name()), [])
            .unwrap();
        assert!(store.contains(db, "committed").unwrap());
        assert!(!store.contains(db, "pending").unwrap());
        assert_eq!(store.size(db).unwrap(), 1);
        tx.commit().unwrap();
        drop(writer);

        assert!(store.contains(db, "pending").unwrap());
        assert_eq!(store.size(db).unwrap(), 2);
    }
}
