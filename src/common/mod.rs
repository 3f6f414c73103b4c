//! Common types and utilities shared across formats.
//!
//! This module provides the error taxonomy, format detection primitives,
//! spreadsheet cell addressing, and the small XML tree used by both the ODF
//! and OOXML implementations.

// Submodule declarations
pub mod detection;
pub mod error;
pub mod table;
pub mod xml;

// Re-exports for convenience
pub use detection::{EntryMeta, FileMeta, FileType};
pub use error::{Error, Result};
pub use table::TablePosition;
