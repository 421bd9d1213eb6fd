//! Wordlist archive sources.
//!
//! A [`WordlistSource`] hides where an archive comes from: the configured
//! auto-import URL (HTTP(S) or `file://`) or the built-in archive on disk.
//! Direct uploads bypass this type; the caller hands their stream straight to
//! the importer.
//!
//! Besides opening the archive stream, a source can be fingerprinted with
//! [`WordlistSource::read_remote_wordlist_info`]: the whole stream is read once
//! and discarded, producing a checksum and length that can be compared with the
//! fingerprint stored alongside a previous import.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::*;
use url::Url;

use crate::config::WordlistConfiguration;
use crate::crypto::digest::StreamChecksum;
use crate::storage::status::WordlistSourceInfo;
use crate::utils::cancel::CancelToken;
use crate::utils::io_utils::{copy_to_sink, open_file_url_as_reader};
use crate::{Result, WordlistError};

const PROBE_BUFFER_SIZE: usize = 64 * 1024;

/// Boxed archive stream handed to the importer.
pub type SourceStream = Box<dyn Read + Send + 'static>;

#[derive(Debug, Clone)]
pub enum WordlistSource {
    /// Remote or `file://` URL
    Url {
        url: Url,
        trust_all: bool,
        timeout: Option<Duration>,
    },
    /// Archive on the local filesystem
    File { path: PathBuf },
}

impl WordlistSource {
    /// Source for the configured auto-import URL, if any.
    pub fn auto_import(config: &WordlistConfiguration) -> Option<Self> {
        config.auto_import_url.as_ref().map(|url| WordlistSource::Url {
            url: url.clone(),
            trust_all: config.prompt_trust_all,
            timeout: config.fetch_timeout(),
        })
    }

    /// Source for the built-in archive, if one is configured.
    pub fn builtin(config: &WordlistConfiguration) -> Option<Self> {
        config
            .builtin_path
            .as_ref()
            .map(|path| WordlistSource::File { path: path.clone() })
    }

    pub fn description(&self) -> String {
        match self {
            WordlistSource::Url { url, .. } => url.to_string(),
            WordlistSource::File { path } => path.display().to_string(),
        }
    }

    /// Opens the raw (still compressed) archive stream.
    pub fn open_stream(&self) -> Result<SourceStream> {
        match self {
            WordlistSource::File { path } => {
                let file = File::open(path).map_err(|e| {
                    WordlistError::import_error(format!("unable to open wordlist archive {}: {}", path.display(), e))
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
            WordlistSource::Url { url, .. } if url.scheme() == "file" => Ok(Box::new(open_file_url_as_reader(url)?)),
            WordlistSource::Url { url, trust_all, timeout } => {
                debug!("opening remote wordlist {}", url);
                let mut builder = reqwest::blocking::Client::builder();
                if *trust_all {
                    warn!("accepting any TLS certificate for wordlist source {}", url);
                    builder = builder.danger_accept_invalid_certs(true);
                }
                if let Some(timeout) = timeout {
                    builder = builder.timeout(*timeout);
                }
                let client = builder.build()?;
                let response = client.get(url.clone()).send()?;
                let status = response.status();
                if !status.is_success() {
                    return Err(WordlistError::remote_fetch(format!(
                        "unexpected HTTP status {} from {}",
                        status, url
                    )));
                }
                Ok(Box::new(response))
            }
        }
    }

    /// Streams the whole source once to compute its fingerprint, discarding the data.
    pub fn read_remote_wordlist_info(&self, cancel: &CancelToken) -> Result<WordlistSourceInfo> {
        let start = Instant::now();
        let stream = self.open_stream()?;
        let mut reader = BufReader::with_capacity(PROBE_BUFFER_SIZE, stream);
        let mut checksum = StreamChecksum::new();
        copy_to_sink(&mut reader, |buf| checksum.update(buf), cancel)?;
        let (checksum, bytes) = checksum.finish();
        debug!(
            "read fingerprint of {} ({} bytes) in {:?}",
            self.description(),
            bytes,
            start.elapsed()
        );
        Ok(WordlistSourceInfo { checksum, bytes })
    }
}
