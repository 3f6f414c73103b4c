//! Office Open XML package support.
//!
//! Plain OOXML packages are ZIP containers identified by their
//! `[Content_Types].xml` entry. Encrypted ones are CFB containers handled
//! through [`crypto::EncryptionInfo`]; decryption yields the plain ZIP
//! bytes, which are reopened through this module.

pub mod content;
pub mod crypto;

use crate::access::{Storage, ZipStorage};
use crate::common::xml::parse_document;
use crate::common::{Error, FileMeta, FileType, Result};
use crate::translate::{html_page, HtmlConfig, TranslationContext};
use std::fs::File;
use std::io::Write as _;
use std::path::Path;
use zip::write::SimpleFileOptions;

/// Main document part of a WordprocessingML package.
const DOCUMENT_PART: &str = "word/document.xml";

/// A plain (already decrypted) OOXML package.
pub struct OfficeOpenXml {
    storage: ZipStorage,
}

impl OfficeOpenXml {
    /// Identify and open an OOXML package from a ZIP storage.
    pub fn open(storage: ZipStorage) -> Result<Self> {
        if !storage.is_file("[Content_Types].xml") {
            return Err(Error::FormatMismatch("office open xml"));
        }
        Ok(Self { storage })
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta {
            file_type: FileType::OfficeOpenXml,
            encrypted: false,
            entries: Vec::new(),
        }
    }

    /// Translate the document into a self-contained HTML page.
    ///
    /// Only the WordprocessingML main part is mapped so far; packages
    /// without one report [`Error::UnsupportedOperation`].
    pub fn html(&self, config: HtmlConfig) -> Result<String> {
        if !self.storage.is_file(DOCUMENT_PART) {
            return Err(Error::UnsupportedOperation(
                "translate this package kind",
            ));
        }
        let root = parse_document(&self.storage.read(DOCUMENT_PART)?)?;
        let mut ctx = TranslationContext::new(config);
        content::translate_content(&root, &mut ctx);
        Ok(html_page("", &ctx.output, &ctx.config))
    }

    /// Write the package to a ZIP file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = zip::ZipWriter::new(file);
        for name in self.storage.list_entries() {
            if name.ends_with('/') {
                continue;
            }
            writer
                .start_file(&*name, SimpleFileOptions::default())
                .map_err(|e| Error::Zip(e.to_string()))?;
            writer.write_all(&self.storage.read(&name)?)?;
        }
        writer.finish().map_err(|e| Error::Zip(e.to_string()))?;
        Ok(())
    }
}
