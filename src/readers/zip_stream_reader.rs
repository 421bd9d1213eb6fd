//! Line reader over a streamed, multi-entry zip archive.
//!
//! The archive is decompressed on a dedicated thread straight from the source
//! stream (no seeking, so HTTP bodies work), and handed to the consumer one line
//! at a time through a bounded channel. Directory entries are skipped and the
//! next file entry is opened transparently when the current one is exhausted.
//!
//! Two positions are tracked:
//! - raw bytes pulled from the source stream, for progress display
//! - logical bytes, the decompressed length of every line consumed so far
//!   including its terminator, which is what resumed imports skip over

use std::collections::HashSet;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;

use log::*;
use zip::result::ZipError;

use crate::utils::io_utils::{ByteCounter, CountingReader};
use crate::Result;

const LINE_CHANNEL_CAPACITY: usize = 1024;
const END_OF_CENTRAL_DIRECTORY: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const CENTRAL_DIRECTORY_HEADER: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const LOCAL_FILE_HEADER: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const LOCAL_HEADER_LEN: usize = 30;
const DATA_DESCRIPTOR_FLAG: u16 = 1 << 3;

/// One decompressed line and where it came from.
#[derive(Debug, Clone)]
pub struct ZipLine {
    /// Line text without its terminator
    pub text: String,
    /// Name of the archive entry holding the line
    pub entry: Arc<str>,
    /// Decompressed length of the line including its terminator
    pub len: u64,
}

pub struct ZipStreamReader {
    receiver: Receiver<Result<ZipLine>>,
    raw_bytes: ByteCounter,
    logical_bytes: u64,
    lines_read: u64,
    entry_name: Option<Arc<str>>,
    finished: bool,
}

impl ZipStreamReader {
    /// Starts decompressing `source` in the background.
    pub fn new<R: Read + Send + 'static>(source: R) -> Result<Self> {
        let counting = CountingReader::new(source);
        let raw_bytes = counting.counter();
        let (sender, receiver) = sync_channel(LINE_CHANNEL_CAPACITY);
        std::thread::Builder::new()
            .name("wordlist-unzip".to_string())
            .spawn({
                let raw_bytes = raw_bytes.clone();
                move || {
                    let mut source = BufReader::new(counting);
                    if let Err(e) = pump_lines(&mut source, &raw_bytes, &sender) {
                        let _ = sender.send(Err(e));
                    }
                }
            })?;
        Ok(Self {
            receiver,
            raw_bytes,
            logical_bytes: 0,
            lines_read: 0,
            entry_name: None,
            finished: false,
        })
    }

    /// Returns the next line, or `None` once every entry has been read.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.next_zip_line()?.map(|line| line.text))
    }

    pub fn next_zip_line(&mut self) -> Result<Option<ZipLine>> {
        if self.finished {
            return Ok(None);
        }
        match self.receiver.recv() {
            Ok(Ok(line)) => {
                self.logical_bytes += line.len;
                self.lines_read += 1;
                if self.entry_name.as_deref() != Some(&*line.entry) {
                    debug!("reading wordlist archive entry '{}'", line.entry);
                    self.entry_name = Some(line.entry.clone());
                }
                Ok(Some(line))
            }
            Ok(Err(e)) => {
                self.finished = true;
                Err(e)
            }
            Err(_) => {
                // sender dropped: decompression reached the end of the archive
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Raw (compressed) bytes read from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.raw_bytes.get()
    }

    /// Counter of raw bytes, readable from other threads.
    pub fn raw_byte_counter(&self) -> ByteCounter {
        self.raw_bytes.clone()
    }

    /// Decompressed bytes of the lines returned so far.
    pub fn logical_bytes(&self) -> u64 {
        self.logical_bytes
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Entry holding the most recently returned line.
    pub fn entry_name(&self) -> Option<&str> {
        self.entry_name.as_deref()
    }
}

fn pump_lines<R: Read>(
    reader: &mut BufReader<R>,
    raw_bytes: &ByteCounter,
    sender: &SyncSender<Result<ZipLine>>,
) -> Result<()> {
    let mut streamed: HashSet<Arc<str>> = HashSet::new();
    loop {
        // an archive without file entries is only an end-of-central-directory record
        let head = reader.fill_buf()?;
        if head.is_empty() || head.starts_with(&END_OF_CENTRAL_DIRECTORY) {
            break;
        }
        let offset = raw_bytes.get() - reader.buffer().len() as u64;
        let mut header = [0u8; LOCAL_HEADER_LEN];
        reader.read_exact(&mut header[..4])?;
        if header[..4] == CENTRAL_DIRECTORY_HEADER {
            break;
        }
        if header[..4] != LOCAL_FILE_HEADER {
            return Err(ZipError::InvalidArchive("invalid local file header".into()).into());
        }
        reader.read_exact(&mut header[4..])?;
        let flags = u16::from_le_bytes([header[6], header[7]]);
        if flags & DATA_DESCRIPTOR_FLAG != 0 {
            // sizes follow the entry data, so the rest needs the central directory
            return spool_remaining(reader, offset, &header, &streamed, sender);
        }
        let mut chained = Cursor::new(header).chain(&mut *reader);
        let Some(entry) = zip::read::read_zipfile_from_stream(&mut chained)? else {
            break;
        };
        let name: Arc<str> = Arc::from(entry.name());
        streamed.insert(name.clone());
        if entry.is_dir() {
            continue;
        }
        if !send_entry_lines(entry, name, sender)? {
            return Ok(());
        }
    }
    if streamed.is_empty() {
        debug!("wordlist archive contains no file entries");
    }
    Ok(())
}

/// Copies the unread part of the archive to a temporary file at its original
/// offset and reads the entries not yet streamed through the central directory.
fn spool_remaining<R: Read>(
    reader: &mut BufReader<R>,
    offset: u64,
    header: &[u8],
    streamed: &HashSet<Arc<str>>,
    sender: &SyncSender<Result<ZipLine>>,
) -> Result<()> {
    debug!("wordlist archive uses data descriptors, spooling from offset {}", offset);
    let mut spool = tempfile::tempfile()?;
    // leading entries were already consumed; a sparse gap keeps offsets valid
    spool.set_len(offset)?;
    spool.seek(SeekFrom::Start(offset))?;
    spool.write_all(header)?;
    io::copy(reader, &mut spool)?;
    spool.seek(SeekFrom::Start(0))?;

    let mut archive = zip::ZipArchive::new(spool)?;
    for index in 0..archive.len() {
        if archive.name_for_index(index).is_some_and(|name| streamed.contains(name)) {
            continue;
        }
        let entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name: Arc<str> = Arc::from(entry.name());
        if !send_entry_lines(entry, name, sender)? {
            break;
        }
    }
    Ok(())
}

/// Sends every line of `entry`; returns `false` once the consumer went away.
fn send_entry_lines<E: Read>(entry: E, name: Arc<str>, sender: &SyncSender<Result<ZipLine>>) -> Result<bool> {
    let mut lines = BufReader::new(entry);
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        let n = lines.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(true);
        }
        let line = ZipLine {
            text: String::from_utf8_lossy(trim_line_ending(&buf)).into_owned(),
            entry: name.clone(),
            len: n as u64,
        };
        if sender.send(Ok(line)).is_err() {
            return Ok(false);
        }
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

impl std::fmt::Debug for ZipStreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipStreamReader")
            .field("raw_bytes", &self.raw_bytes.get())
            .field("logical_bytes", &self.logical_bytes)
            .field("lines_read", &self.lines_read)
            .field("entry_name", &self.entry_name)
            .finish()
    }
}
