// Persistent storage for wordlist data
//
// This module provides the key/value store contract, its durable and volatile
// backends, the wordlist bucket built on top of them and the status record.

pub mod store;
pub mod sqlite_store;
pub mod memory_store;
pub mod status;
pub mod bucket;

pub use store::{LocalStore, StoreDb, StoreIterator, open_store};
pub use sqlite_store::SqliteStore;
pub use memory_store::MemoryStore;
pub use status::{WordlistStatus, WordlistSourceType, WordlistSourceInfo, CURRENT_STATUS_VERSION};
pub use bucket::WordlistBucket;
