use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use url::Url;
use wordlist::config::{StoreType, WordlistConfiguration};
use wordlist::storage::{LocalStore, MemoryStore, StoreDb, StoreIterator};
use wordlist::{HealthStatus, Result, Wordlist, WordlistError, WordlistSourceType};
use zip::write::SimpleFileOptions;

fn build_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn local_config(dir: &Path) -> WordlistConfiguration {
    WordlistConfiguration {
        store_type: StoreType::LocalDb,
        data_dir: Some(dir.join("store")),
        background_inspection: false,
        import_min_free_space: 0,
        ..Default::default()
    }
}

#[test]
fn test_example_scenario_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = WordlistConfiguration { min_word_size: 4, ..local_config(dir.path()) };

    let wordlist = Wordlist::open_configured(config.clone()).unwrap();
    let archive = build_archive(&[("words.txt", "Password1\n  \n!#comment: ignore\nqwerty\n")]);
    let status = wordlist.populate(Cursor::new(archive)).unwrap();
    assert_eq!(status.word_type_counts.len(), 1);
    assert_eq!(wordlist.size().unwrap(), 2);
    drop(wordlist);

    let wordlist = Wordlist::open_configured(config).unwrap();
    assert!(wordlist.contains_word("PASSWORD1").unwrap());
    assert!(!wordlist.contains_word("hunter2").unwrap());
    let status = wordlist.read_wordlist_status().unwrap();
    assert!(status.completed);
    assert_eq!(status.source_type, Some(WordlistSourceType::User));
}

#[test]
fn test_populate_from_piped_archive() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = zip::ZipWriter::new_stream(Vec::new());
    writer.start_file("piped.txt", SimpleFileOptions::default()).unwrap();
    writer.write_all(b"alpha\nbravo\n").unwrap();
    let archive = writer.finish().unwrap().into_inner();

    let wordlist = Wordlist::open_configured(local_config(dir.path())).unwrap();
    wordlist.populate(Cursor::new(archive)).unwrap();
    assert_eq!(wordlist.size().unwrap(), 2);
    assert!(wordlist.contains_word("Bravo").unwrap());
}

#[test]
fn test_config_change_clears_and_reimports() {
    let dir = tempfile::tempdir().unwrap();
    let builtin = dir.path().join("builtin.zip");
    std::fs::write(&builtin, build_archive(&[("w.txt", "password123\nletmein\n")])).unwrap();

    let whole = WordlistConfiguration { builtin_path: Some(builtin), ..local_config(dir.path()) };
    let wordlist = Wordlist::open_configured(whole.clone()).unwrap();
    let report = wordlist.inspect().unwrap();
    assert_eq!(report.imported, Some(WordlistSourceType::BuiltIn));
    assert_eq!(wordlist.size().unwrap(), 2);
    assert!(!wordlist.contains_word("mypassword").unwrap());
    drop(wordlist);

    let chunked = WordlistConfiguration { check_size: 5, ..whole };
    let wordlist = Wordlist::open_configured(chunked).unwrap();
    let report = wordlist.inspect().unwrap();
    assert!(report.cleared);
    assert_eq!(report.imported, Some(WordlistSourceType::BuiltIn));
    // 7 five-grams of password123 plus 3 of letmein
    assert_eq!(wordlist.size().unwrap(), 10);
    assert!(wordlist.contains_word("mypassword").unwrap());
    assert!(!wordlist.contains_word("correcthorse").unwrap());
}

#[test]
fn test_failing_auto_import_is_reported_in_health() {
    let dir = tempfile::tempdir().unwrap();
    let builtin = dir.path().join("builtin.zip");
    std::fs::write(&builtin, build_archive(&[("w.txt", "fallback\n")])).unwrap();
    let config = WordlistConfiguration {
        builtin_path: Some(builtin),
        auto_import_url: Some(Url::from_file_path(dir.path().join("missing.zip")).unwrap()),
        ..local_config(dir.path())
    };

    let wordlist = Wordlist::open_configured(config).unwrap();
    let report = wordlist.inspect().unwrap();
    assert_eq!(report.imported, Some(WordlistSourceType::TemporaryBuiltIn));
    assert!(wordlist.contains_word("fallback").unwrap());
    assert!(wordlist.auto_import_error().is_some());

    let health = wordlist.health();
    assert_eq!(health[0].status, HealthStatus::Warn);
    assert!(health[0].detail.contains("auto_import_url"));
    assert!(health.iter().any(|r| r.status == HealthStatus::Caution));
}

/// Memory store that slows down batch writes and detects a truncate running
/// while a batch write is in flight.
struct InstrumentedStore {
    inner: MemoryStore,
    write_delay: Duration,
    first_write_delay: Duration,
    writing: AtomicBool,
    batches: AtomicUsize,
    interleaved: AtomicUsize,
}

impl InstrumentedStore {
    fn new(write_delay: Duration, first_write_delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            write_delay,
            first_write_delay,
            writing: AtomicBool::new(false),
            batches: AtomicUsize::new(0),
            interleaved: AtomicUsize::new(0),
        }
    }
}

impl LocalStore for InstrumentedStore {
    fn get(&self, db: StoreDb, key: &str) -> Result<Option<String>> {
        self.inner.get(db, key)
    }

    fn put(&self, db: StoreDb, key: &str, value: &str) -> Result<()> {
        self.inner.put(db, key, value)
    }

    fn put_all(&self, db: StoreDb, entries: &[(String, String)]) -> Result<()> {
        self.writing.store(true, Ordering::SeqCst);
        let first = self.batches.fetch_add(1, Ordering::SeqCst) == 0;
        thread::sleep(if first { self.first_write_delay } else { self.write_delay });
        let result = self.inner.put_all(db, entries);
        self.writing.store(false, Ordering::SeqCst);
        result
    }

    fn contains(&self, db: StoreDb, key: &str) -> Result<bool> {
        self.inner.contains(db, key)
    }

    fn remove(&self, db: StoreDb, key: &str) -> Result<bool> {
        self.inner.remove(db, key)
    }

    fn truncate(&self, db: StoreDb) -> Result<()> {
        if self.writing.load(Ordering::SeqCst) {
            self.interleaved.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.truncate(db)
    }

    fn size(&self, db: StoreDb) -> Result<u64> {
        self.inner.size(db)
    }

    fn iter(&self, db: StoreDb) -> Result<StoreIterator<'_>> {
        self.inner.iter(db)
    }

    fn location(&self) -> Option<PathBuf> {
        None
    }

    fn read_app_attribute(&self, name: &str) -> Result<Option<String>> {
        self.inner.read_app_attribute(name)
    }

    fn write_app_attribute(&self, name: &str, value: Option<&str>) -> Result<()> {
        self.inner.write_app_attribute(name, value)
    }
}

fn slow_import_setup(dir: &Path, words: usize, store: Arc<InstrumentedStore>) -> Arc<Wordlist> {
    let content: String = (0..words).map(|i| format!("slowword{}\n", i)).collect();
    let builtin = dir.join("builtin.zip");
    std::fs::write(&builtin, build_archive(&[("w.txt", &content)])).unwrap();
    let config = WordlistConfiguration {
        store_type: StoreType::Memory,
        builtin_path: Some(builtin),
        background_inspection: false,
        import_min_free_space: 0,
        import_min_transactions: 1,
        import_max_transactions: 1,
        ..Default::default()
    };
    Arc::new(Wordlist::open(config, store).unwrap())
}

fn wait_for_first_batch(store: &InstrumentedStore) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while store.batches.load(Ordering::SeqCst) == 0 {
        assert!(Instant::now() < deadline, "import never started");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_clear_waits_for_background_import_to_yield() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InstrumentedStore::new(Duration::from_millis(20), Duration::from_millis(20)));
    let wordlist = slow_import_setup(dir.path(), 2000, store.clone());

    let importer = {
        let wordlist = wordlist.clone();
        thread::spawn(move || wordlist.inspect())
    };
    wait_for_first_batch(&store);

    wordlist.clear().unwrap();
    let inspection = importer.join().unwrap();
    assert!(matches!(inspection, Err(WordlistError::Cancelled { .. })));
    assert_eq!(store.interleaved.load(Ordering::SeqCst), 0);
    assert!(store.batches.load(Ordering::SeqCst) < 2000);
    assert_eq!(wordlist.size().unwrap(), 0);
    assert!(!wordlist.read_wordlist_status().unwrap().completed);
}

#[test]
fn test_clear_fails_when_import_does_not_yield() {
    let dir = tempfile::tempdir().unwrap();
    // the first batch outlasts the exclusive wait
    let store = Arc::new(InstrumentedStore::new(Duration::ZERO, Duration::from_secs(12)));
    let wordlist = slow_import_setup(dir.path(), 3, store.clone());

    let importer = {
        let wordlist = wordlist.clone();
        thread::spawn(move || wordlist.inspect())
    };
    wait_for_first_batch(&store);

    let err = wordlist.clear().unwrap_err();
    assert!(matches!(err, WordlistError::CancelTimeout { .. }));
    assert_eq!(store.interleaved.load(Ordering::SeqCst), 0);

    // the import was never cancelled and finishes normally
    let report = importer.join().unwrap().unwrap();
    assert_eq!(report.imported, Some(WordlistSourceType::BuiltIn));
    assert_eq!(wordlist.size().unwrap(), 3);
}
