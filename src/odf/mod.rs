//! OpenDocument format support.
//!
//! An [`OpenDocument`] wraps a ZIP package identified by its `mimetype`
//! entry. Protected packages carry per-entry encryption descriptors in the
//! manifest; after [`OpenDocument::decrypt`] the package is served from an
//! in-memory decrypted view and every other operation works unchanged.

pub mod content;
pub mod crypto;
pub mod manifest;
pub mod styles;

use crate::access::{Storage, ZipStorage};
use crate::common::detection::detect_odf_type;
use crate::common::{EntryMeta, Error, FileMeta, FileType, Result};
use crate::common::xml::{parse_document, XmlElement};
use crate::translate::{html_page, HtmlConfig, TranslationContext};
use manifest::Manifest;
use std::fs::File;
use std::io::Write as _;
use std::path::Path;
use zip::write::SimpleFileOptions;

/// An opened ODF package.
pub struct OpenDocument {
    storage: Box<dyn Storage>,
    file_type: FileType,
    manifest: Manifest,
    encrypted: bool,
}

impl OpenDocument {
    /// Identify and open an ODF package from a ZIP storage.
    ///
    /// Returns [`Error::FormatMismatch`] when the `mimetype` entry is absent
    /// or names something other than the supported document classes, so the
    /// detector can fall through to the OOXML sniffer.
    pub fn open(storage: ZipStorage) -> Result<Self> {
        if !storage.is_file("mimetype") {
            return Err(Error::FormatMismatch("opendocument"));
        }
        let mimetype = String::from_utf8_lossy(&storage.read("mimetype")?).into_owned();
        let file_type =
            detect_odf_type(&mimetype).ok_or(Error::FormatMismatch("opendocument"))?;

        let manifest = if storage.is_file("META-INF/manifest.xml") {
            Manifest::parse(&storage.read("META-INF/manifest.xml")?)?
        } else {
            Manifest::default()
        };
        let encrypted = manifest.is_encrypted();

        Ok(Self {
            storage: Box::new(storage),
            file_type,
            manifest,
            encrypted,
        })
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Detection result plus per-sheet entries for plain spreadsheets.
    pub fn meta(&self) -> FileMeta {
        let entries = if self.file_type == FileType::OdfSpreadsheet && !self.encrypted {
            self.sheet_entries().unwrap_or_default()
        } else {
            Vec::new()
        };
        FileMeta {
            file_type: self.file_type,
            encrypted: self.encrypted,
            entries,
        }
    }

    /// Decrypt every protected entry with the given password.
    ///
    /// On success the decrypted view replaces the original storage. A no-op
    /// for packages that were never encrypted.
    pub fn decrypt(&mut self, password: &str) -> Result<()> {
        if !self.encrypted {
            return Ok(());
        }
        let decrypted = crypto::decrypt_package(self.storage.as_ref(), &self.manifest, password)?;
        self.storage = Box::new(decrypted);
        self.encrypted = false;
        Ok(())
    }

    /// Translate the document into a self-contained HTML page.
    pub fn html(&self, config: HtmlConfig) -> Result<String> {
        if self.encrypted {
            return Err(Error::UnsupportedOperation(
                "translate an encrypted document",
            ));
        }
        let mut ctx = TranslationContext::new(config);

        if self.storage.is_file("styles.xml") {
            let root = parse_document(&self.storage.read("styles.xml")?)?;
            styles::translate_styles(&root, &mut ctx);
        }
        let content_root = parse_document(&self.storage.read("content.xml")?)?;
        // content.xml carries the automatic styles of the body.
        styles::translate_styles(&content_root, &mut ctx);

        let css = std::mem::take(&mut ctx.output);
        content::translate_content(&content_root, &mut ctx);
        Ok(html_page(&css, &ctx.output, &ctx.config))
    }

    /// Write the current package state to a ZIP file.
    ///
    /// After a decrypt this persists the plaintext package. The `mimetype`
    /// entry goes first and uncompressed, per ODF packaging rules.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = zip::ZipWriter::new(file);
        let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

        if self.storage.is_file("mimetype") {
            writer
                .start_file("mimetype", stored)
                .map_err(|e| Error::Zip(e.to_string()))?;
            writer.write_all(&self.storage.read("mimetype")?)?;
        }
        for name in self.storage.list_entries() {
            if name == "mimetype" || name.ends_with('/') {
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

    /// Sheet names and dimensions from `content.xml`.
    fn sheet_entries(&self) -> Result<Vec<EntryMeta>> {
        let root = parse_document(&self.storage.read("content.xml")?)?;
        let mut entries = Vec::new();
        if let Some(spreadsheet) = root
            .child("office:body")
            .and_then(|body| body.child("office:spreadsheet"))
        {
            for table in spreadsheet.elements().filter(|e| e.name == "table:table") {
                entries.push(EntryMeta {
                    name: table.attribute("table:name").unwrap_or_default().to_string(),
                    row_count: count_rows(table),
                    column_count: count_columns(table),
                });
            }
        }
        Ok(entries)
    }
}

fn repeat_count(elem: &XmlElement, attr: &str) -> u32 {
    elem.attribute(attr)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(1)
}

fn count_rows(table: &XmlElement) -> u32 {
    table
        .elements()
        .filter(|e| e.name == "table:table-row")
        .map(|row| repeat_count(row, "table:number-rows-repeated"))
        .sum()
}

fn count_columns(table: &XmlElement) -> u32 {
    table
        .elements()
        .filter(|e| e.name == "table:table-row")
        .map(|row| {
            row.elements()
                .filter(|e| e.name == "table:table-cell" || e.name == "table:covered-table-cell")
                .map(|cell| repeat_count(cell, "table:number-columns-repeated"))
                .sum()
        })
        .max()
        .unwrap_or(0)
}
