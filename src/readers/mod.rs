// Wordlist archive readers
//
// This module provides the streaming zip line reader and the archive source
// abstraction (remote URL, local file) with source fingerprinting.

pub mod zip_stream_reader;
pub mod wordlist_source;

pub use zip_stream_reader::{ZipStreamReader, ZipLine};
pub use wordlist_source::{WordlistSource, SourceStream};
