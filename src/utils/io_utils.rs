//! I/O utility functions for wordlist sources and stores.
//!
//! This module provides helper functions for:
//! - Counting bytes pulled through a reader (import progress, fingerprints)
//! - Opening `file://` URLs as buffered readers
//! - Draining a reader into a sink with cooperative cancellation
//! - Querying free space on the filesystem holding a store
//!
//! # Examples
//!
//! ```
//! use std::io::Read;
//! use wordlist::utils::io_utils::CountingReader;
//!
//! let mut reader = CountingReader::new(&b"hello world"[..]);
//! let counter = reader.counter();
//! let mut buf = String::new();
//! reader.read_to_string(&mut buf).unwrap();
//! assert_eq!(counter.get(), 11);
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use url::Url;

use crate::utils::cancel::CancelToken;
use crate::{Result, WordlistError};

/// Shared byte counter readable while another thread drives the reader.
#[derive(Debug, Clone, Default)]
pub struct ByteCounter(Arc<AtomicU64>);

impl ByteCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }
}

/// Reader wrapper that counts the bytes read through it.
pub struct CountingReader<R> {
    inner: R,
    counter: ByteCounter,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, counter: ByteCounter::default() }
    }

    pub fn counter(&self) -> ByteCounter {
        self.counter.clone()
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.add(n as u64);
        Ok(n)
    }
}

/// Opens a file URL and returns a buffered reader.
///
/// # Errors
///
/// Returns an error if the URL scheme is not "file" or the file cannot be opened.
pub fn open_file_url_as_reader(url: &Url) -> Result<BufReader<File>> {
    if url.scheme() != "file" {
        return Err(WordlistError::invalid_state(format!(
            "Unsupported scheme: {}",
            url.scheme()
        )));
    }
    let path = url
        .to_file_path()
        .map_err(|_| WordlistError::parser_error(format!("Invalid file url: {}", url)))?;
    let file = File::open(path)?;
    Ok(BufReader::new(file))
}

/// Feeds everything `reader` yields into `sink`, checking `cancel` between buffers.
///
/// Returns the total number of bytes consumed.
pub fn copy_to_sink<R: BufRead, F: FnMut(&[u8])>(reader: &mut R, mut sink: F, cancel: &CancelToken) -> Result<u64> {
    let mut total_bytes = 0;
    loop {
        cancel.check()?;
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        sink(buf);
        let len = buf.len();
        total_bytes += len as u64;
        reader.consume(len);
    }
    Ok(total_bytes)
}

/// Bytes available to unprivileged users on the filesystem holding `path`.
#[cfg(unix)]
pub fn free_space<P: AsRef<Path>>(path: P) -> Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_ref().as_os_str().as_bytes())
        .map_err(|e| WordlistError::invalid_state(format!("Invalid store path: {}", e)))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64))
}

#[cfg(not(unix))]
pub fn free_space<P: AsRef<Path>>(_path: P) -> Result<u64> {
    Ok(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_to_sink_counts_bytes() {
        let data = vec![7u8; 100_000];
        let mut reader = BufReader::with_capacity(4096, &data[..]);
        let mut seen = 0usize;
        let total = copy_to_sink(&mut reader, |buf| seen += buf.len(), &CancelToken::new()).unwrap();
        assert_eq!(total, 100_000);
        assert_eq!(seen, 100_000);
    }

    #[test]
    fn test_copy_to_sink_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut reader = BufReader::new(&b"abc"[..]);
        let err = copy_to_sink(&mut reader, |_| {}, &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_free_space_of_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(free_space(dir.path()).unwrap() > 0);
    }

    #[test]
    fn test_open_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "abc\n").unwrap();
        let url = Url::from_file_path(&path).unwrap();
        let mut text = String::new();
        open_file_url_as_reader(&url).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "abc\n");

        let http = Url::parse("http://example.com/words.zip").unwrap();
        assert!(open_file_url_as_reader(&http).unwrap_err().is_invalid_state());
    }
}
