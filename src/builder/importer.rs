//! Streaming wordlist importer.
//!
//! A [`WordlistImporter`] runs once. It moves through these states:
//!
//! 1. **Init**: decide between resuming the stored, unfinished import of the same
//!    source and starting over (clearing the bucket), check free space, seed the
//!    word type counters from the stored status.
//! 2. **Skipping forward** (resume only): re-read and discard input up to the
//!    stored logical position. Bucket writes are idempotent, so re-scanning is
//!    cheaper than requiring range-capable sources.
//! 3. **Streaming**: classify, normalize and buffer each line; flush the buffer
//!    whenever it outgrows the adaptive transaction size or the character
//!    ceiling; snapshot status, check free space and throttle between flushes.
//! 4. **Complete**: final flush, reject empty results, mark the status completed.
//!
//! Cancellation is checked after every line and every flush and surfaces as
//! [`WordlistError::Cancelled`]. A cancelled import persists its position as of
//! the last flush so the next run can resume from there.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use log::*;

use crate::builder::transaction_sizer::TransactionSizeCalculator;
use crate::config::{WordlistConfiguration, WordlistKind};
use crate::crypto::word_type::WordType;
use crate::readers::zip_stream_reader::ZipStreamReader;
use crate::storage::bucket::WordlistBucket;
use crate::storage::status::{WordlistSourceInfo, WordlistSourceType, WordlistStatus};
use crate::utils::cancel::CancelToken;
use crate::utils::normalizer::{chunk_count, normalize};
use crate::utils::periodic::PeriodicGate;
use crate::{Result, WordlistError};

const STATUS_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(10);
const SPACE_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Live counters of a running import, shared with the service for display.
#[derive(Debug)]
pub struct ImportProgress {
    source_type: WordlistSourceType,
    total_bytes: Option<u64>,
    bytes_read: AtomicU64,
    lines_read: AtomicU64,
    words_stored: AtomicU64,
    started: Instant,
}

impl ImportProgress {
    /// `total_bytes` is the raw source size when known.
    pub fn new(source_type: WordlistSourceType, total_bytes: Option<u64>) -> Self {
        Self {
            source_type,
            total_bytes: total_bytes.filter(|total| *total > 0),
            bytes_read: AtomicU64::new(0),
            lines_read: AtomicU64::new(0),
            words_stored: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn source_type(&self) -> WordlistSourceType {
        self.source_type
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }

    pub fn words_stored(&self) -> u64 {
        self.words_stored.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fraction of the source read so far, in percent, when the size is known.
    pub fn percent_complete(&self) -> Option<f64> {
        let total = self.total_bytes?;
        Some((self.bytes_read() as f64 * 100.0 / total as f64).min(100.0))
    }
}

/// Slot holding the progress of the import currently running for a wordlist.
#[derive(Debug, Default)]
pub struct ImportTracker {
    current: Mutex<Option<Arc<ImportProgress>>>,
}

impl ImportTracker {
    /// Registers a new import and returns its progress handle.
    pub fn begin(&self, source_type: WordlistSourceType, total_bytes: Option<u64>) -> Arc<ImportProgress> {
        let progress = Arc::new(ImportProgress::new(source_type, total_bytes));
        *self.lock() = Some(progress.clone());
        progress
    }

    pub fn finish(&self) {
        *self.lock() = None;
    }

    pub fn current(&self) -> Option<Arc<ImportProgress>> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<ImportProgress>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-use streaming import of one archive into a bucket.
pub struct WordlistImporter<'a> {
    reader: ZipStreamReader,
    bucket: &'a WordlistBucket,
    config: &'a WordlistConfiguration,
    source_type: WordlistSourceType,
    source_info: Option<WordlistSourceInfo>,
    cancel: CancelToken,
    progress: Arc<ImportProgress>,

    status: WordlistStatus,
    initialized: bool,
    skip_bytes: u64,
    buffer: HashSet<String>,
    buffer_chars: usize,
    pending_type_counts: BTreeMap<WordType, u64>,
    sizer: TransactionSizeCalculator,
    transactions: u64,
    raw_words: u64,
    raw_chars: u64,
    raw_chunks: u64,
    started: Instant,
    prior_import_ms: u64,
    status_gate: PeriodicGate,
    space_gate: PeriodicGate,
    log_gate: PeriodicGate,
}

impl<'a> WordlistImporter<'a> {
    pub fn new(
        reader: ZipStreamReader,
        source_type: WordlistSourceType,
        source_info: Option<WordlistSourceInfo>,
        bucket: &'a WordlistBucket,
        config: &'a WordlistConfiguration,
        cancel: CancelToken,
        progress: Arc<ImportProgress>,
    ) -> Self {
        Self {
            reader,
            bucket,
            config,
            source_type,
            source_info,
            cancel,
            progress,
            status: WordlistStatus::default(),
            initialized: false,
            skip_bytes: 0,
            buffer: HashSet::new(),
            buffer_chars: 0,
            pending_type_counts: BTreeMap::new(),
            sizer: TransactionSizeCalculator::new(
                config.import_duration_goal(),
                config.import_min_transactions,
                config.import_max_transactions,
            ),
            transactions: 0,
            raw_words: 0,
            raw_chars: 0,
            raw_chunks: 0,
            started: Instant::now(),
            prior_import_ms: 0,
            status_gate: PeriodicGate::new(STATUS_SNAPSHOT_INTERVAL),
            space_gate: PeriodicGate::new(SPACE_CHECK_INTERVAL),
            log_gate: PeriodicGate::new(PROGRESS_LOG_INTERVAL),
        }
    }

    /// Runs the import to completion, returning the final status.
    pub fn run(mut self) -> Result<WordlistStatus> {
        let result = self.run_states();
        match &result {
            Ok(status) => info!(
                "{} wordlist import complete: {} values from {} lines in {}ms",
                self.source_type, status.value_count, status.lines_imported, status.import_ms
            ),
            Err(e) if e.is_cancelled() => {
                info!(
                    "{} wordlist import cancelled after {} bytes, progress kept for resume",
                    self.source_type, self.status.bytes_imported
                );
                if self.initialized {
                    if let Err(e) = self.write_snapshot() {
                        warn!("unable to persist wordlist import position after cancel: {}", e);
                    }
                }
            }
            Err(e) => error!("{} wordlist import failed: {}", self.source_type, e),
        }
        result
    }

    fn run_states(&mut self) -> Result<WordlistStatus> {
        self.init()?;
        if self.skip_bytes > 0 {
            self.skip_forward()?;
        }
        self.stream()?;
        self.complete()
    }

    fn init(&mut self) -> Result<()> {
        // before anything is cleared, so a full disk keeps the current data
        self.check_free_space()?;

        let config_hash = self.config.config_hash();
        let existing = match self.bucket.read_wordlist_status() {
            Ok(status) => status,
            Err(e) if e.is_import_error() => {
                warn!("discarding unreadable wordlist status: {}", e);
                WordlistStatus::default()
            }
            Err(e) => return Err(e),
        };

        let resumable = !existing.completed
            && existing.is_current_version()
            && existing.is_source(self.source_type)
            && existing.remote_info == self.source_info
            && existing.config_hash == config_hash
            && existing.bytes_imported > 0;

        if resumable {
            info!(
                "resuming {} wordlist import at byte {} (line {})",
                self.source_type, existing.bytes_imported, existing.lines_imported
            );
            self.skip_bytes = existing.bytes_imported;
            self.prior_import_ms = existing.import_ms;
            self.status = existing;
        } else {
            debug!("starting fresh {} wordlist import", self.source_type);
            self.bucket.clear()?;
            self.status = WordlistStatus::fresh(self.source_type, self.source_info.clone(), &config_hash);
            self.bucket.write_wordlist_status(&self.status)?;
        }

        self.initialized = true;
        Ok(())
    }

    fn skip_forward(&mut self) -> Result<()> {
        let start = Instant::now();
        while self.reader.logical_bytes() < self.skip_bytes {
            self.cancel.check()?;
            if self.reader.next_zip_line()?.is_none() {
                return Err(WordlistError::import_error(format!(
                    "source ended at byte {} before the resume position {}",
                    self.reader.logical_bytes(),
                    self.skip_bytes
                )));
            }
            self.update_progress();
        }
        debug!(
            "skipped {} lines ({} bytes) of previously imported input in {:?}",
            self.reader.lines_read(),
            self.skip_bytes,
            start.elapsed()
        );
        Ok(())
    }

    fn stream(&mut self) -> Result<()> {
        loop {
            self.cancel.check()?;
            let Some(line) = self.reader.next_zip_line()? else {
                return Ok(());
            };
            self.update_progress();
            self.process_line(&line.text);

            if self.buffer.len() >= self.sizer.transaction_size() || self.buffer_chars >= self.config.import_max_chars {
                self.flush()?;
                self.after_flush()?;
            }
        }
    }

    fn process_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || self.config.is_comment(line) {
            return;
        }

        let word_type = WordType::determine_word_type(line);
        let word = if word_type.is_raw() {
            let Some(word) = normalize(line, self.config) else {
                return;
            };
            self.raw_words += 1;
            self.raw_chars += word.chars().count() as u64;
            self.raw_chunks += chunk_count(&word, self.config.check_size) as u64;
            word
        } else {
            word_type.convert_input_from_wordlist(self.config, line)
        };

        *self.pending_type_counts.entry(word_type).or_insert(0) += 1;
        self.buffer_chars += word.len();
        self.buffer.insert(word);
    }

    fn flush(&mut self) -> Result<()> {
        // the flushed batch covers every line consumed so far
        for (word_type, count) in std::mem::take(&mut self.pending_type_counts) {
            *self.status.word_type_counts.entry(word_type).or_insert(0) += count;
        }
        self.status.bytes_imported = self.reader.logical_bytes();
        self.status.lines_imported = self.reader.lines_read();

        if self.buffer.is_empty() {
            return Ok(());
        }

        let start = Instant::now();
        self.bucket.add_words(&self.buffer, &mut self.status)?;
        self.sizer.record(start.elapsed(), self.buffer.len());
        self.transactions += 1;
        self.progress.words_stored.fetch_add(self.buffer.len() as u64, Ordering::Relaxed);
        self.buffer.clear();
        self.buffer_chars = 0;
        Ok(())
    }

    fn after_flush(&mut self) -> Result<()> {
        self.cancel.check()?;

        if self.status_gate.ready() {
            self.write_snapshot()?;
        }
        if self.space_gate.ready() {
            self.check_free_space()?;
        }
        if self.log_gate.ready() {
            debug!(
                "wordlist import progress: {} lines, {} words stored, transaction size {}, entry {:?}",
                self.reader.lines_read(),
                self.progress.words_stored(),
                self.sizer.transaction_size(),
                self.reader.entry_name()
            );
        }
        if self.config.import_pause_frequency > 0 && self.transactions % self.config.import_pause_frequency == 0 {
            std::thread::sleep(self.config.import_pause_duration());
        }
        Ok(())
    }

    fn complete(&mut self) -> Result<WordlistStatus> {
        self.flush()?;

        let size = self.bucket.size()?;
        if size == 0 {
            return Err(WordlistError::import_error(format!(
                "{} wordlist source produced no words ({} lines read)",
                self.source_type,
                self.reader.lines_read()
            )));
        }

        if self.raw_words > 0 {
            debug!(
                "average word length {:.1}, average chunks per word {:.1}",
                self.raw_chars as f64 / self.raw_words as f64,
                self.raw_chunks as f64 / self.raw_words as f64
            );
        }

        self.status.completed = true;
        if self.bucket.kind() == WordlistKind::Word {
            self.status.value_count = size;
        }
        self.status.check_date = Some(Utc::now());
        self.status.import_ms = self.import_ms();
        self.bucket.write_wordlist_status(&self.status)?;
        Ok(self.status.clone())
    }

    fn write_snapshot(&mut self) -> Result<()> {
        self.status.completed = false;
        self.status.import_ms = self.import_ms();
        self.bucket.write_wordlist_status(&self.status)
    }

    fn check_free_space(&self) -> Result<()> {
        let free = self.bucket.space_remaining()?;
        if free < self.config.import_min_free_space {
            return Err(WordlistError::import_error(format!(
                "insufficient free space for wordlist import: {} bytes available, {} required",
                free, self.config.import_min_free_space
            )));
        }
        Ok(())
    }

    fn update_progress(&self) {
        self.progress.bytes_read.store(self.reader.bytes_read(), Ordering::Relaxed);
        self.progress.lines_read.store(self.reader.lines_read(), Ordering::Relaxed);
    }

    fn import_ms(&self) -> u64 {
        self.prior_import_ms + self.started.elapsed().as_millis() as u64
    }
}
