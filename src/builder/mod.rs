//! Builder module for wordlist imports
//!
//! This module contains the streaming importer, its adaptive transaction
//! sizing and the inspector that decides when and from where to (re)import.

pub mod transaction_sizer;
pub mod importer;
pub mod inspector;

// Re-export commonly used types for convenience
pub use transaction_sizer::TransactionSizeCalculator;
pub use importer::{ImportProgress, ImportTracker, WordlistImporter};
pub use inspector::{InspectionReport, WordlistInspector};
