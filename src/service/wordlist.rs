//! The wordlist service: containment checks, seed retrieval and administration.
//!
//! A [`Wordlist`] owns one bucket and a background thread that warms the store
//! up and runs the inspector at startup and on every inspection interval.
//! Lookups run concurrently on any thread. Imports are serialized by the
//! import lock. Administrative operations ([`Wordlist::clear`],
//! [`Wordlist::populate`]) first ask any running background import to yield,
//! then run exclusively.
//!
//! ```no_run
//! use std::sync::Arc;
//! use wordlist::config::{StoreType, WordlistConfiguration};
//! use wordlist::storage::open_store;
//! use wordlist::Wordlist;
//!
//! # fn main() -> wordlist::Result<()> {
//! let config = WordlistConfiguration { store_type: StoreType::Memory, ..Default::default() };
//! let store = open_store(&config)?;
//! let wordlist = Wordlist::open(config, store)?;
//! wordlist.populate(std::fs::File::open("passwords.zip")?)?;
//! assert!(wordlist.contains_word("Password1")?);
//! wordlist.close();
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::*;
use rand::Rng;
use serde::Serialize;

use crate::builder::importer::{ImportTracker, WordlistImporter};
use crate::builder::inspector::{InspectionReport, WordlistInspector};
use crate::config::{WordlistConfiguration, WordlistKind};
use crate::crypto::word_type::WordType;
use crate::readers::zip_stream_reader::ZipStreamReader;
use crate::service::statistics::{StatisticsSnapshot, WordlistStatistics};
use crate::storage::bucket::WordlistBucket;
use crate::storage::status::{WordlistSourceType, WordlistStatus};
use crate::storage::store::{open_store, LocalStore};
use crate::utils::cancel::CancelToken;
use crate::utils::normalizer::{chunk, normalize};
use crate::{Result, WordlistError};

const EXCLUSIVE_WAIT: Duration = Duration::from_secs(10);
const EXCLUSIVE_POLL: Duration = Duration::from_millis(100);
const CLOSE_WAIT: Duration = Duration::from_secs(10);

/// What the service is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Activity {
    Idle,
    Inspecting,
    Importing,
    Clearing,
    Closed,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Activity::Idle => "Idle",
            Activity::Inspecting => "Inspecting",
            Activity::Importing => "Importing",
            Activity::Clearing => "Clearing",
            Activity::Closed => "Closed",
        };
        f.write_str(label)
    }
}

/// A failure recorded for display instead of being propagated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    pub date: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into(), date: Utc::now() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum HealthStatus {
    Good,
    Info,
    Caution,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthRecord {
    pub status: HealthStatus,
    pub topic: String,
    pub detail: String,
}

impl HealthRecord {
    fn new<S: Into<String>>(status: HealthStatus, topic: &str, detail: S) -> Self {
        Self { status, topic: topic.to_string(), detail: detail.into() }
    }
}

enum BackgroundCommand {
    Inspect,
    Shutdown,
}

struct BackgroundExecutor {
    commands: Sender<BackgroundCommand>,
    done: Receiver<()>,
    handle: JoinHandle<()>,
}

struct WordlistShared {
    config: Arc<WordlistConfiguration>,
    bucket: WordlistBucket,
    statistics: WordlistStatistics,
    tracker: ImportTracker,
    import_lock: Mutex<()>,
    admin_lock: Mutex<()>,
    shutdown: CancelToken,
    inhibit: CancelToken,
    closed: AtomicBool,
    activity: Mutex<Activity>,
    used_word_types: RwLock<BTreeSet<WordType>>,
    last_error: Mutex<Option<ErrorRecord>>,
    auto_import_error: Mutex<Option<ErrorRecord>>,
}

pub struct Wordlist {
    shared: Arc<WordlistShared>,
    executor: Mutex<Option<BackgroundExecutor>>,
}

impl Wordlist {
    /// Opens a wordlist over `store` and starts its background thread.
    pub fn open(config: WordlistConfiguration, store: Arc<dyn LocalStore>) -> Result<Self> {
        let config = Arc::new(config);
        let shutdown = CancelToken::new();
        let inhibit = shutdown.child();
        let shared = Arc::new(WordlistShared {
            bucket: WordlistBucket::new(store, config.clone()),
            statistics: WordlistStatistics::new(config.check_time_warning()),
            tracker: ImportTracker::default(),
            import_lock: Mutex::new(()),
            admin_lock: Mutex::new(()),
            shutdown,
            inhibit,
            closed: AtomicBool::new(false),
            activity: Mutex::new(Activity::Idle),
            used_word_types: RwLock::new(BTreeSet::from([WordType::Raw])),
            last_error: Mutex::new(None),
            auto_import_error: Mutex::new(None),
            config,
        });
        shared.refresh_used_word_types();

        let executor = BackgroundExecutor::start(shared.clone())?;
        info!(
            "opened {:?} wordlist ({} stored values)",
            shared.config.kind,
            shared.bucket.size().unwrap_or(0)
        );
        Ok(Self { shared, executor: Mutex::new(Some(executor)) })
    }

    /// Opens the store selected by the configuration, then the wordlist.
    pub fn open_configured(config: WordlistConfiguration) -> Result<Self> {
        let store = open_store(&config)?;
        Self::open(config, store)
    }

    pub fn config(&self) -> &WordlistConfiguration {
        &self.shared.config
    }

    /// Whether `word`, or any chunk of it, appears in the list.
    ///
    /// Words the normalizer rejects are never found and are not counted. Word
    /// types occurring in the stored data are tried in turn: raw words chunk by
    /// chunk, hashed types once with the digest of `word`.
    pub fn contains_word(&self, word: &str) -> Result<bool> {
        self.shared.check_open()?;
        let shared = &self.shared;
        if shared.config.kind != WordlistKind::Word {
            return Err(WordlistError::invalid_state("containment checks are not supported on a seed list"));
        }
        let start = Instant::now();
        let Some(normalized) = normalize(word, &shared.config) else {
            return Ok(false);
        };

        let word_types = shared.used_word_types.read().unwrap_or_else(PoisonError::into_inner).clone();
        let mut checked = 0;
        let mut found = false;
        for word_type in word_types {
            if word_type.is_raw() {
                for key in chunk(&normalized, shared.config.check_size) {
                    checked += 1;
                    let hit = shared.bucket.contains_word(&key)?;
                    shared.statistics.record_chunk(hit);
                    if hit {
                        found = true;
                        break;
                    }
                }
            } else {
                let key = word_type.convert_input_from_user(&shared.config, &normalized);
                checked += 1;
                let hit = shared.bucket.contains_word(&key)?;
                shared.statistics.record_chunk(hit);
                found = hit;
            }
            if found {
                break;
            }
        }

        shared.statistics.record_word(found, normalized.chars().count(), checked, start.elapsed());
        shared.statistics.log_periodically("wordlist");
        Ok(found)
    }

    /// Returns a random word from a seed list.
    pub fn random_seed(&self) -> Result<String> {
        self.shared.check_open()?;
        self.shared.bucket.random_seed()
    }

    /// Number of stored values (chunks and hash tokens for containment lists).
    pub fn size(&self) -> Result<u64> {
        self.shared.check_open()?;
        self.shared.bucket.size()
    }

    pub fn read_wordlist_status(&self) -> Result<WordlistStatus> {
        self.shared.bucket.read_wordlist_status()
    }

    /// Percent complete of the running import, empty when idle or unknown.
    pub fn import_percent_complete(&self) -> String {
        self.shared
            .tracker
            .current()
            .and_then(|progress| progress.percent_complete())
            .map(|percent| format!("{:.1}%", percent))
            .unwrap_or_default()
    }

    pub fn activity(&self) -> Activity {
        self.shared.activity()
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.shared.statistics.snapshot()
    }

    pub fn last_error(&self) -> Option<ErrorRecord> {
        lock(&self.shared.last_error).clone()
    }

    pub fn auto_import_error(&self) -> Option<ErrorRecord> {
        lock(&self.shared.auto_import_error).clone()
    }

    /// Replaces the stored list with the archive read from `source`.
    ///
    /// Blocks until the import completes, fails or the service closes.
    pub fn populate<R: Read + Send + 'static>(&self, source: R) -> Result<WordlistStatus> {
        self.shared.exclusive(Activity::Importing, |shared| {
            info!("replacing {:?} wordlist with an uploaded archive", shared.config.kind);
            shared.bucket.clear()?;
            shared.bucket.write_wordlist_status(&WordlistStatus::default())?;

            let reader = ZipStreamReader::new(source)?;
            let progress = shared.tracker.begin(WordlistSourceType::User, None);
            let result = WordlistImporter::new(
                reader,
                WordlistSourceType::User,
                None,
                &shared.bucket,
                &shared.config,
                shared.shutdown.child(),
                progress,
            )
            .run();
            shared.tracker.finish();
            shared.refresh_used_word_types();
            if let Err(e) = &result {
                if !e.is_cancelled() {
                    shared.record_error(e);
                }
            }
            result
        })
    }

    /// Removes every stored value and resets the status record.
    pub fn clear(&self) -> Result<()> {
        self.shared.exclusive(Activity::Clearing, |shared| {
            info!("clearing {:?} wordlist", shared.config.kind);
            shared.bucket.clear()?;
            shared.bucket.write_wordlist_status(&WordlistStatus::default())?;
            shared.refresh_used_word_types();
            Ok(())
        })
    }

    /// Runs one inspection cycle on the calling thread, waiting for the import lock.
    pub fn inspect(&self) -> Result<InspectionReport> {
        self.shared.check_open()?;
        let _guard = lock(&self.shared.import_lock);
        self.shared.inspect_locked()
    }

    /// Asks the background thread for an inspection cycle now.
    pub fn request_inspection(&self) {
        if let Some(executor) = lock(&self.executor).as_ref() {
            let _ = executor.commands.send(BackgroundCommand::Inspect);
        }
    }

    /// Health records for display, most severe first.
    pub fn health(&self) -> Vec<HealthRecord> {
        let shared = &self.shared;
        let mut records = Vec::new();

        if shared.closed.load(Ordering::SeqCst) {
            records.push(HealthRecord::new(HealthStatus::Warn, "wordlist", "wordlist service is closed"));
            return records;
        }

        if let Some(error) = lock(&shared.auto_import_error).as_ref() {
            let url = shared.config.auto_import_url.as_ref().map(|u| u.to_string()).unwrap_or_default();
            records.push(HealthRecord::new(
                HealthStatus::Warn,
                "wordlist",
                format!(
                    "auto-import from setting auto_import_url ({}) failed at {}: {}",
                    url, error.date, error.message
                ),
            ));
        }
        if let Some(error) = lock(&shared.last_error).as_ref() {
            records.push(HealthRecord::new(
                HealthStatus::Warn,
                "wordlist",
                format!("last wordlist operation failed at {}: {}", error.date, error.message),
            ));
        }

        match shared.bucket.read_wordlist_status() {
            Ok(status) if status.is_source(WordlistSourceType::TemporaryBuiltIn) => records.push(HealthRecord::new(
                HealthStatus::Caution,
                "wordlist",
                "using the built-in wordlist until the auto-import source is reachable",
            )),
            Ok(_) => {}
            Err(e) => records.push(HealthRecord::new(HealthStatus::Warn, "wordlist", e.to_string())),
        }

        if let Some(progress) = shared.tracker.current() {
            let percent = progress.percent_complete().map(|p| format!(" ({:.1}%)", p)).unwrap_or_default();
            records.push(HealthRecord::new(
                HealthStatus::Info,
                "wordlist",
                format!("{} import in progress{}, {} lines read", progress.source_type(), percent, progress.lines_read()),
            ));
        }

        if shared.statistics.is_check_time_excessive() {
            records.push(HealthRecord::new(
                HealthStatus::Caution,
                "wordlist",
                format!("average check time is {:?}", shared.statistics.average_check_time()),
            ));
        }

        if records.is_empty() {
            records.push(HealthRecord::new(HealthStatus::Good, "wordlist", "wordlist is healthy"));
        }
        records.sort_by(|a, b| b.status.cmp(&a.status));
        records
    }

    /// Stops the background thread, waiting a bounded time for running work.
    pub fn close(&self) {
        let shared = &self.shared;
        if shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        shared.shutdown.cancel();
        set_activity(shared, Activity::Closed);

        let Some(executor) = lock(&self.executor).take() else {
            return;
        };
        let _ = executor.commands.send(BackgroundCommand::Shutdown);
        match executor.done.recv_timeout(CLOSE_WAIT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if executor.handle.join().is_err() {
                    warn!("wordlist background thread panicked");
                }
                debug!("closed {:?} wordlist", shared.config.kind);
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("wordlist background thread did not stop within {:?}, leaving it behind", CLOSE_WAIT);
            }
        }
    }
}

impl Drop for Wordlist {
    fn drop(&mut self) {
        self.close();
    }
}

impl BackgroundExecutor {
    fn start(shared: Arc<WordlistShared>) -> Result<Self> {
        let (commands, receiver) = channel();
        let (done_sender, done) = channel();
        let handle = std::thread::Builder::new()
            .name(format!("wordlist-{:?}", shared.config.kind).to_lowercase())
            .spawn(move || {
                shared.background_loop(receiver);
                let _ = done_sender.send(());
            })?;
        Ok(Self { commands, done, handle })
    }
}

impl WordlistShared {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WordlistError::service_unavailable("wordlist service is closed"));
        }
        Ok(())
    }

    fn activity(&self) -> Activity {
        if self.closed.load(Ordering::SeqCst) {
            return Activity::Closed;
        }
        if self.tracker.current().is_some() {
            return Activity::Importing;
        }
        *lock(&self.activity)
    }

    fn background_loop(&self, commands: Receiver<BackgroundCommand>) {
        self.warmup();
        let interval = self.config.inspector_frequency();
        let mut pending = self.config.background_inspection;
        loop {
            if pending && !self.shutdown.is_cancelled() {
                self.background_inspection();
            }
            let command = if self.config.background_inspection {
                commands.recv_timeout(interval)
            } else {
                commands.recv().map_err(|_| RecvTimeoutError::Disconnected)
            };
            pending = match command {
                Ok(BackgroundCommand::Inspect) | Err(RecvTimeoutError::Timeout) => true,
                Ok(BackgroundCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            };
        }
        debug!("wordlist background thread exiting");
    }

    fn warmup(&self) {
        let lookups = self.config.warmup_lookups;
        if lookups == 0 {
            return;
        }
        let start = Instant::now();
        let mut rng = rand::rng();
        for _ in 0..lookups {
            if self.shutdown.is_cancelled() {
                return;
            }
            let result = match self.config.kind {
                WordlistKind::Word => {
                    let len = rng.random_range(self.config.min_word_size.max(1)..=self.config.min_word_size.max(1) + 8);
                    let word: String = (0..len).map(|_| rng.random_range(b'a'..=b'z') as char).collect();
                    self.warmup_lookup(&word)
                }
                WordlistKind::Seed => self.bucket.random_seed().map(|_| ()),
            };
            if let Err(e) = result {
                debug!("wordlist warmup stopped: {}", e);
                return;
            }
        }
        debug!("completed {} wordlist warmup lookups in {:?}", lookups, start.elapsed());
    }

    fn warmup_lookup(&self, word: &str) -> Result<()> {
        let Some(normalized) = normalize(word, &self.config) else {
            return Ok(());
        };
        for key in chunk(&normalized, self.config.check_size) {
            self.bucket.contains_word(&key)?;
        }
        Ok(())
    }

    fn background_inspection(&self) {
        if self.inhibit.is_cancelled() {
            debug!("wordlist inspection skipped while an administrative operation runs");
            return;
        }
        let _guard = match self.import_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("wordlist inspection skipped, another import is running");
                return;
            }
        };
        // errors are recorded by inspect_locked
        let _ = self.inspect_locked();
    }

    fn inspect_locked(&self) -> Result<InspectionReport> {
        set_activity(self, Activity::Inspecting);
        let inspector = WordlistInspector::new(&self.bucket, &self.config, self.inhibit.child(), &self.tracker);
        let result = inspector.run();
        match &result {
            Ok(report) => {
                *lock(&self.auto_import_error) = report.auto_import_error.as_deref().map(ErrorRecord::new);
                if report.imported.is_some() {
                    *lock(&self.last_error) = None;
                }
                debug!("wordlist inspection finished: {:?}", report);
            }
            Err(e) if e.is_cancelled() => info!("wordlist inspection cancelled"),
            Err(e) => {
                error!("wordlist inspection failed: {}", e);
                self.record_error(e);
            }
        }
        self.refresh_used_word_types();
        set_activity(self, Activity::Idle);
        result
    }

    /// Runs `op` with the import lock after asking background work to yield.
    fn exclusive<T, F>(&self, activity: Activity, op: F) -> Result<T>
    where
        F: FnOnce(&WordlistShared) -> Result<T>,
    {
        self.check_open()?;
        let _admin = lock(&self.admin_lock);
        self.inhibit.cancel();
        let result = match self.acquire_import_lock() {
            Some(_guard) => {
                set_activity(self, activity);
                let result = op(self);
                set_activity(self, Activity::Idle);
                result
            }
            None => Err(WordlistError::cancel_timeout(format!(
                "background wordlist operation did not stop within {:?}",
                EXCLUSIVE_WAIT
            ))),
        };
        self.inhibit.reset();
        result
    }

    fn acquire_import_lock(&self) -> Option<MutexGuard<'_, ()>> {
        let deadline = Instant::now() + EXCLUSIVE_WAIT;
        loop {
            match self.import_lock.try_lock() {
                Ok(guard) => return Some(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) if Instant::now() < deadline => std::thread::sleep(EXCLUSIVE_POLL),
                Err(TryLockError::WouldBlock) => return None,
            }
        }
    }

    fn refresh_used_word_types(&self) {
        match self.bucket.read_wordlist_status() {
            Ok(status) => {
                let mut types = status.used_word_types();
                types.insert(WordType::Raw);
                *self.used_word_types.write().unwrap_or_else(PoisonError::into_inner) = types;
            }
            Err(e) => warn!("unable to read wordlist status: {}", e),
        }
    }

    fn record_error(&self, error: &WordlistError) {
        *lock(&self.last_error) = Some(ErrorRecord::new(error.to_string()));
    }
}

fn set_activity(shared: &WordlistShared, activity: Activity) {
    let mut current = lock(&shared.activity);
    if *current != Activity::Closed {
        *current = activity;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
