//! Reconciles stored wordlist data with the configuration and its sources.
//!
//! One [`WordlistInspector::run`] performs a full decision cycle:
//!
//! 1. Invalidate: stored data with an old status version or a configuration
//!    hash that no longer matches is cleared.
//! 2. Keep: data that is still acceptable for its source type ends the cycle.
//! 3. Auto-import: when a URL is configured, probe its fingerprint and import
//!    it unless the stored data already matches. Failures are reported, not
//!    returned, so the cycle can fall back.
//! 4. Built-in: with still nothing acceptable stored, import the built-in
//!    archive, tagged as temporary while a configured auto-import is failing.
//!
//! The cancellation token is checked between steps and throughout any import.

use chrono::Utc;
use log::*;

use crate::builder::importer::{ImportTracker, WordlistImporter};
use crate::config::WordlistConfiguration;
use crate::readers::wordlist_source::WordlistSource;
use crate::readers::zip_stream_reader::ZipStreamReader;
use crate::storage::bucket::WordlistBucket;
use crate::storage::status::{WordlistSourceInfo, WordlistSourceType, WordlistStatus};
use crate::utils::cancel::CancelToken;
use crate::Result;

/// What an inspection cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectionReport {
    /// Stored data was discarded as out of date
    pub cleared: bool,
    /// Source type of a completed import
    pub imported: Option<WordlistSourceType>,
    /// Failure of the auto-import source during this cycle
    pub auto_import_error: Option<String>,
}

pub struct WordlistInspector<'a> {
    bucket: &'a WordlistBucket,
    config: &'a WordlistConfiguration,
    cancel: CancelToken,
    tracker: &'a ImportTracker,
}

impl<'a> WordlistInspector<'a> {
    pub fn new(
        bucket: &'a WordlistBucket,
        config: &'a WordlistConfiguration,
        cancel: CancelToken,
        tracker: &'a ImportTracker,
    ) -> Self {
        Self { bucket, config, cancel, tracker }
    }

    pub fn run(&self) -> Result<InspectionReport> {
        let mut report = InspectionReport::default();
        let auto_source = WordlistSource::auto_import(self.config);

        self.cancel.check()?;
        report.cleared = self.invalidate()?;

        self.cancel.check()?;
        let status = self.bucket.read_wordlist_status()?;
        let mut probed = None;
        if self.is_acceptable(&status, auto_source.as_ref(), &mut probed, &mut report)? {
            debug!("stored {} wordlist is current", status.source_type.map_or("(none)", |t| t.label()));
            return Ok(report);
        }

        if let Some(source) = &auto_source {
            self.cancel.check()?;
            match self.auto_import(source, probed.take()) {
                Ok(imported) => {
                    report.imported = imported;
                    return Ok(report);
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!("auto-import of wordlist from {} failed: {}", source.description(), e);
                    report.auto_import_error = Some(e.to_string());
                }
            }
        }

        self.cancel.check()?;
        if let Some(imported) = self.builtin_import()? {
            report.imported = Some(imported);
        }
        Ok(report)
    }

    fn invalidate(&self) -> Result<bool> {
        let status = match self.bucket.read_wordlist_status() {
            Ok(status) => status,
            Err(e) if e.is_import_error() => {
                warn!("{}", e);
                WordlistStatus::default()
            }
            Err(e) => return Err(e),
        };
        let reason = if !status.is_current_version() {
            "stored status is absent or from an older version"
        } else if status.config_hash != self.config.config_hash() {
            "wordlist configuration changed"
        } else {
            return Ok(false);
        };
        info!("clearing stored wordlist: {}", reason);
        self.reset()?;
        Ok(true)
    }

    fn is_acceptable(
        &self,
        status: &WordlistStatus,
        auto_source: Option<&WordlistSource>,
        probed: &mut Option<WordlistSourceInfo>,
        report: &mut InspectionReport,
    ) -> Result<bool> {
        if !status.completed || !status.is_current_version() {
            return Ok(false);
        }
        match status.source_type {
            None => Ok(false),
            Some(WordlistSourceType::User) => Ok(true),
            Some(WordlistSourceType::BuiltIn) => Ok(auto_source.is_none()),
            Some(WordlistSourceType::AutoImport) => {
                if auto_source.is_none() {
                    return Ok(false);
                }
                Ok(!self.recheck_due(status))
            }
            Some(WordlistSourceType::TemporaryBuiltIn) => {
                let Some(source) = auto_source else {
                    return Ok(false);
                };
                match source.read_remote_wordlist_info(&self.cancel) {
                    Ok(info) => {
                        info!("auto-import source {} is reachable again, replacing temporary wordlist", source.description());
                        *probed = Some(info);
                        Ok(false)
                    }
                    Err(e) if e.is_cancelled() => Err(e),
                    Err(e) => {
                        debug!("auto-import source still unavailable: {}", e);
                        report.auto_import_error = Some(e.to_string());
                        Ok(true)
                    }
                }
            }
        }
    }

    fn recheck_due(&self, status: &WordlistStatus) -> bool {
        let Some(check_date) = status.check_date else {
            return true;
        };
        match (Utc::now() - check_date).to_std() {
            Ok(age) => age >= self.config.auto_import_recheck(),
            // check date in the future: clock moved backwards
            Err(_) => false,
        }
    }

    /// Probes the auto-import source and imports it when the stored data differs.
    fn auto_import(&self, source: &WordlistSource, probed: Option<WordlistSourceInfo>) -> Result<Option<WordlistSourceType>> {
        let info = match probed {
            Some(info) => info,
            None => source.read_remote_wordlist_info(&self.cancel)?,
        };

        let mut status = self.bucket.read_wordlist_status()?;
        if status.completed && status.is_source(WordlistSourceType::AutoImport) && status.remote_info.as_ref() == Some(&info) {
            debug!("auto-import source {} unchanged", source.description());
            status.check_date = Some(Utc::now());
            self.bucket.write_wordlist_status(&status)?;
            return Ok(None);
        }

        info!("importing wordlist from {} ({} bytes)", source.description(), info.bytes);
        let total = Some(info.bytes);
        self.import(source, WordlistSourceType::AutoImport, Some(info), total)?;
        Ok(Some(WordlistSourceType::AutoImport))
    }

    fn builtin_import(&self) -> Result<Option<WordlistSourceType>> {
        let status = self.bucket.read_wordlist_status()?;
        if status.completed && status.is_current_version() {
            // previously auto-imported or uploaded data beats the built-in list
            if status.is_source(WordlistSourceType::AutoImport) || status.is_source(WordlistSourceType::User) {
                debug!("keeping stored {} wordlist", status.source_type.map_or("", |t| t.label()));
                return Ok(None);
            }
        }

        let Some(source) = WordlistSource::builtin(self.config) else {
            debug!("no built-in wordlist configured");
            return Ok(None);
        };
        let source_type = if self.config.auto_import_url.is_some() {
            WordlistSourceType::TemporaryBuiltIn
        } else {
            WordlistSourceType::BuiltIn
        };
        if status.completed && status.is_source(source_type) {
            return Ok(None);
        }

        let total = match &source {
            WordlistSource::File { path } => std::fs::metadata(path).ok().map(|m| m.len()),
            WordlistSource::Url { .. } => None,
        };
        info!("importing built-in wordlist from {} as {}", source.description(), source_type);
        self.import(&source, source_type, None, total)?;
        Ok(Some(source_type))
    }

    fn import(
        &self,
        source: &WordlistSource,
        source_type: WordlistSourceType,
        info: Option<WordlistSourceInfo>,
        total_bytes: Option<u64>,
    ) -> Result<WordlistStatus> {
        self.cancel.check()?;
        let reader = ZipStreamReader::new(source.open_stream()?)?;
        let progress = self.tracker.begin(source_type, total_bytes);
        let result = WordlistImporter::new(
            reader,
            source_type,
            info,
            self.bucket,
            self.config,
            self.cancel.clone(),
            progress,
        )
        .run();
        self.tracker.finish();
        result
    }

    fn reset(&self) -> Result<()> {
        self.bucket.clear()?;
        self.bucket.write_wordlist_status(&WordlistStatus::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::zip_stream_reader::tests::build_archive;
    use crate::storage::memory_store::MemoryStore;
    use crate::storage::store::LocalStore;
    use std::path::Path;
    use std::sync::Arc;
    use url::Url;

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        std::fs::write(path, build_archive(entries)).unwrap();
    }

    fn config(dir: &Path, auto_import: bool) -> WordlistConfiguration {
        WordlistConfiguration {
            min_word_size: 3,
            import_min_free_space: 0,
            builtin_path: Some(dir.join("builtin.zip")),
            auto_import_url: auto_import.then(|| Url::from_file_path(dir.join("remote.zip")).unwrap()),
            auto_import_recheck_ms: 0,
            ..Default::default()
        }
    }

    fn inspect(store: &Arc<dyn LocalStore>, config: &WordlistConfiguration) -> (WordlistBucket, InspectionReport) {
        let bucket = WordlistBucket::new(store.clone(), Arc::new(config.clone()));
        let tracker = ImportTracker::default();
        let report = WordlistInspector::new(&bucket, config, CancelToken::new(), &tracker).run().unwrap();
        assert!(tracker.current().is_none());
        (bucket, report)
    }

    #[test]
    fn test_nothing_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = WordlistConfiguration { builtin_path: None, ..config(dir.path(), false) };
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let (bucket, report) = inspect(&store, &config);
        assert_eq!(report.imported, None);
        assert_eq!(bucket.size().unwrap(), 0);
    }

    #[test]
    fn test_builtin_imported_once() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(&dir.path().join("builtin.zip"), &[("w.txt", "apple\nbanana\n")]);
        let config = config(dir.path(), false);
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());

        let (bucket, report) = inspect(&store, &config);
        assert!(report.cleared);
        assert_eq!(report.imported, Some(WordlistSourceType::BuiltIn));
        assert_eq!(bucket.size().unwrap(), 2);

        let (_, report) = inspect(&store, &config);
        assert_eq!(report, InspectionReport::default());
    }

    #[test]
    fn test_config_change_forces_reimport() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(&dir.path().join("builtin.zip"), &[("w.txt", "abcdef\n")]);
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());

        let whole = config(dir.path(), false);
        let (bucket, _) = inspect(&store, &whole);
        assert_eq!(bucket.size().unwrap(), 1);

        let chunked = WordlistConfiguration { check_size: 3, ..whole };
        let (bucket, report) = inspect(&store, &chunked);
        assert!(report.cleared);
        assert_eq!(report.imported, Some(WordlistSourceType::BuiltIn));
        // abc bcd cde def
        assert_eq!(bucket.size().unwrap(), 4);
        assert_eq!(bucket.read_wordlist_status().unwrap().config_hash, chunked.config_hash());
    }

    #[test]
    fn test_failing_auto_import_falls_back_to_temporary_builtin() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(&dir.path().join("builtin.zip"), &[("w.txt", "builtin1\n")]);
        let config = config(dir.path(), true);
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());

        let (bucket, report) = inspect(&store, &config);
        assert!(report.auto_import_error.is_some());
        assert_eq!(report.imported, Some(WordlistSourceType::TemporaryBuiltIn));
        assert!(bucket.contains_word("builtin1").unwrap());

        // still failing: temporary data is kept
        let (_, report) = inspect(&store, &config);
        assert!(report.auto_import_error.is_some());
        assert_eq!(report.imported, None);

        // source recovers: temporary data is replaced
        write_archive(&dir.path().join("remote.zip"), &[("r.txt", "remote1\nremote2\n")]);
        let (bucket, report) = inspect(&store, &config);
        assert_eq!(report.auto_import_error, None);
        assert_eq!(report.imported, Some(WordlistSourceType::AutoImport));
        assert!(!bucket.contains_word("builtin1").unwrap());
        assert_eq!(bucket.size().unwrap(), 2);
    }

    #[test]
    fn test_auto_import_rechecks_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let remote = dir.path().join("remote.zip");
        write_archive(&remote, &[("r.txt", "first\n")]);
        let config = config(dir.path(), true);
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());

        let (_, report) = inspect(&store, &config);
        assert_eq!(report.imported, Some(WordlistSourceType::AutoImport));

        // unchanged source: probed, not reimported
        let (bucket, report) = inspect(&store, &config);
        assert_eq!(report.imported, None);
        assert!(bucket.read_wordlist_status().unwrap().check_date.is_some());

        write_archive(&remote, &[("r.txt", "second\nthird\n")]);
        let (bucket, report) = inspect(&store, &config);
        assert_eq!(report.imported, Some(WordlistSourceType::AutoImport));
        assert!(bucket.contains_word("third").unwrap());
        assert!(!bucket.contains_word("first").unwrap());
    }

    #[test]
    fn test_full_disk_keeps_current_data() {
        let dir = tempfile::tempdir().unwrap();
        let remote = dir.path().join("remote.zip");
        write_archive(&dir.path().join("builtin.zip"), &[("w.txt", "builtin1\n")]);
        let store: Arc<dyn LocalStore> =
            Arc::new(crate::storage::sqlite_store::SqliteStore::open(dir.path().join("w.db")).unwrap());
        let config = config(dir.path(), true);
        let full = WordlistConfiguration { import_min_free_space: u64::MAX, ..config.clone() };

        // temporary built-in list stays while the recovered source cannot be imported
        let (_, report) = inspect(&store, &config);
        assert_eq!(report.imported, Some(WordlistSourceType::TemporaryBuiltIn));
        write_archive(&remote, &[("r.txt", "first\n")]);
        let (bucket, report) = inspect(&store, &full);
        assert!(report.auto_import_error.is_some());
        assert!(bucket.contains_word("builtin1").unwrap());

        // changed fingerprint on a full disk keeps the previous import
        let (_, report) = inspect(&store, &config);
        assert_eq!(report.imported, Some(WordlistSourceType::AutoImport));
        write_archive(&remote, &[("r.txt", "second\nthird\n")]);
        let (bucket, report) = inspect(&store, &full);
        assert!(report.auto_import_error.is_some());
        assert_eq!(report.imported, None);
        assert!(bucket.contains_word("first").unwrap());
        let status = bucket.read_wordlist_status().unwrap();
        assert!(status.completed);
        assert!(status.is_source(WordlistSourceType::AutoImport));
    }

    #[test]
    fn test_recent_auto_import_is_not_reprobed() {
        let dir = tempfile::tempdir().unwrap();
        let remote = dir.path().join("remote.zip");
        write_archive(&remote, &[("r.txt", "first\n")]);
        let config = WordlistConfiguration { auto_import_recheck_ms: 3_600_000, ..config(dir.path(), true) };
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        inspect(&store, &config);

        // a broken source would surface an error if it were probed
        std::fs::remove_file(&remote).unwrap();
        let (_, report) = inspect(&store, &config);
        assert_eq!(report, InspectionReport::default());
    }

    #[test]
    fn test_user_upload_is_never_superseded() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(&dir.path().join("remote.zip"), &[("r.txt", "remote1\n")]);
        let config = config(dir.path(), true);
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let bucket = WordlistBucket::new(store.clone(), Arc::new(config.clone()));
        let mut status = WordlistStatus::fresh(WordlistSourceType::User, None, &config.config_hash());
        bucket.add_words(&[String::from("uploaded")], &mut status).unwrap();
        status.completed = true;
        bucket.write_wordlist_status(&status).unwrap();

        let (bucket, report) = inspect(&store, &config);
        assert_eq!(report, InspectionReport::default());
        assert!(bucket.contains_word("uploaded").unwrap());
    }

    #[test]
    fn test_cancelled_inspection() {
        let dir = tempfile::tempdir().unwrap();
        write_archive(&dir.path().join("builtin.zip"), &[("w.txt", "apple\n")]);
        let config = config(dir.path(), false);
        let bucket = WordlistBucket::new(Arc::new(MemoryStore::new()), Arc::new(config.clone()));
        let tracker = ImportTracker::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = WordlistInspector::new(&bucket, &config, cancel, &tracker).run().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(bucket.size().unwrap(), 0);
    }
}
