//! # pomelo
//!
//! A reader for office documents: detect the concrete format of a byte
//! stream, decrypt password-protected packages, and translate the content
//! into a self-contained HTML page.
//!
//! ## Supported formats
//!
//! - **OpenDocument** (`.odt`, `.ods`, `.odp`): detection, manifest-based
//!   decryption, HTML translation, saving
//! - **Office Open XML** (`.docx`, `.xlsx`, `.pptx`): detection, MS-OFFCRYPTO
//!   decryption (Standard and Agile schemes), HTML translation of word
//!   processing documents, saving
//! - **Legacy binaries** (`.doc`, `.ppt`, `.xls`) and bare Compound File
//!   Binary containers: detection only
//!
//! ## Quick start
//!
//! ```no_run
//! use pomelo::{Document, HtmlConfig};
//!
//! # fn main() -> pomelo::Result<()> {
//! let mut doc = Document::open("report.odt")?;
//! if doc.is_encrypted() {
//!     doc.decrypt("password")?;
//! }
//! if doc.can_translate() {
//!     let html = doc.html(HtmlConfig::default())?;
//!     std::fs::write("report.html", html)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Detection runs a priority-ordered sequence of container sniffers; misses
//! are soft, so a ZIP file that is not an ODF package is still probed as
//! OOXML before the stream is rejected. After a successful decryption the
//! decrypted bytes are re-detected and the handle behaves like one opened on
//! a plain package.
//!
//! Documents are independent of each other: the library keeps no global
//! mutable state, so separate documents can be processed from separate
//! threads freely. A single [`Document`] is single-threaded.

pub mod access;
pub mod common;
pub mod crypto;
pub mod document;
pub mod odf;
pub mod ooxml;
pub mod translate;

pub use common::{EntryMeta, Error, FileMeta, FileType, Result, TablePosition};
pub use document::Document;
pub use translate::HtmlConfig;
