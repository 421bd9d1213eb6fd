//! # Wordlist - Password Wordlist Ingestion, Storage and Lookup
//!
//! This crate imports large compressed word corpora into a local key/value
//! store and answers high-volume "is this password on the list" queries for
//! password policy enforcement.
//!
//! ## Features
//!
//! - **Streaming import**: multi-entry zip archives from HTTP(S), `file://` URLs,
//!   local files or uploaded streams, decompressed line by line
//! - **Resumable**: interrupted imports continue from their last logical position
//! - **Adaptive batching**: write transactions are sized to a target duration
//! - **Substring checks**: words are stored as fixed-size chunks so any password
//!   containing a listed fragment is found
//! - **Pre-hashed lists**: MD5/SHA1/SHA256/SHA512 lines are matched against the
//!   digest of the checked password
//! - **Seed lists**: random word retrieval for generated values
//! - **Background inspection**: stale, misconfigured or incomplete data is
//!   re-imported from the auto-import URL or the built-in archive
//!
//! ## Quick Start
//!
//! ```no_run
//! use wordlist::config::WordlistConfiguration;
//! use wordlist::Wordlist;
//! use std::path::PathBuf;
//!
//! # fn main() -> wordlist::Result<()> {
//! let config = WordlistConfiguration {
//!     data_dir: Some(PathBuf::from("/var/lib/wordlist")),
//!     builtin_path: Some(PathBuf::from("/usr/share/wordlist/passwords.zip")),
//!     check_size: 5,
//!     ..Default::default()
//! };
//! let wordlist = Wordlist::open_configured(config)?;
//! if wordlist.contains_word("Summer2024!")? {
//!     println!("password rejected");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Configuration**: [`config`] typed settings and the data-affecting config hash
//! - **Storage**: [`storage`] key/value backends, buckets and the status record
//! - **Readers**: [`readers`] archive sources and the streaming zip line reader
//! - **Builder**: [`builder`] the importer, transaction sizing and the inspector
//! - **Service**: [`service`] the lookup facade, administration and statistics
//! - **Cryptography**: [`crypto`] digests and the word type classifier
//! - **Utilities**: [`utils`] normalization, cancellation and I/O helpers
//!
//! ## Error Handling
//!
//! All fallible operations return a [`Result<T>`] type, where errors are represented by
//! [`WordlistError`]. The crate uses the `snafu` library for ergonomic error handling with
//! context and backtraces.

pub mod builder;
pub mod config;
pub mod crypto;
pub mod error;
pub mod readers;
pub mod service;
pub mod storage;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{WordlistConfiguration, WordlistKind, StoreType};
pub use service::{Wordlist, Activity, HealthRecord, HealthStatus};
pub use storage::{WordlistStatus, WordlistSourceType};

// Re-export error types for convenience
pub use error::{WordlistError, Result, snafu};
