//! Document facade.
//!
//! [`Document`] runs the detection sequence over a byte stream and exposes a
//! uniform surface over the concrete variants: capability queries that never
//! fail, and operations that report [`Error::UnsupportedOperation`] when the
//! variant cannot perform them. Legacy binaries and bare CFB containers are
//! detection-only handles.

use crate::access::{CfbStorage, Storage, ZipStorage};
use crate::common::detection::{has_cfb_signature, has_zip_signature};
use crate::common::{Error, FileMeta, FileType, Result};
use crate::odf::OpenDocument;
use crate::ooxml::crypto::EncryptionInfo;
use crate::ooxml::OfficeOpenXml;
use crate::translate::HtmlConfig;
use log::debug;
use std::path::Path;

/// An opened office document of any supported variant.
pub struct Document {
    inner: Inner,
    decrypted: bool,
}

enum Inner {
    Odf(OpenDocument),
    Ooxml(OfficeOpenXml),
    /// OOXML encryption wrapper: descriptor plus the raw package stream.
    EncryptedOoxml {
        info: EncryptionInfo,
        package: Vec<u8>,
    },
    /// Recognized but otherwise unsupported variants.
    Detected(FileType),
}

impl Document {
    /// Open and detect a document from a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Open and detect a document held in memory.
    ///
    /// Sniffers are tried in priority order; each miss falls through to the
    /// next, and only full exhaustion reports [`Error::UnknownFormat`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if has_zip_signature(&bytes) {
            // A ZIP signature over a broken archive is still an unknown file.
            let storage = ZipStorage::open(bytes.clone()).map_err(|_| Error::UnknownFormat)?;
            match OpenDocument::open(storage) {
                Ok(doc) => {
                    debug!("detected ODF package ({:?})", doc.file_type());
                    return Ok(Self {
                        inner: Inner::Odf(doc),
                        decrypted: false,
                    });
                }
                Err(Error::FormatMismatch(_)) => {}
                Err(e) => return Err(e),
            }
            match OfficeOpenXml::open(ZipStorage::open(bytes)?) {
                Ok(doc) => {
                    debug!("detected OOXML package");
                    return Ok(Self {
                        inner: Inner::Ooxml(doc),
                        decrypted: false,
                    });
                }
                Err(Error::FormatMismatch(_)) => {}
                Err(e) => return Err(e),
            }
            // A ZIP archive, but no office package structure inside.
            return Err(Error::UnknownFormat);
        }

        if has_cfb_signature(&bytes) {
            let storage = CfbStorage::open(bytes).map_err(|_| Error::UnknownFormat)?;
            let file_type = if storage.is_file("WordDocument") {
                FileType::LegacyWordDocument
            } else if storage.is_file("PowerPoint Document") {
                FileType::LegacyPowerpointPresentation
            } else if storage.is_file("Workbook") {
                FileType::LegacyExcelWorksheets
            } else if storage.is_file("EncryptionInfo") && storage.is_file("EncryptedPackage") {
                debug!("detected encrypted OOXML wrapper");
                let info = EncryptionInfo::parse(&storage.read("EncryptionInfo")?)?;
                let package = storage.read("EncryptedPackage")?;
                return Ok(Self {
                    inner: Inner::EncryptedOoxml { info, package },
                    decrypted: false,
                });
            } else {
                FileType::CompoundFileBinary
            };
            debug!("detected CFB container ({file_type:?})");
            return Ok(Self {
                inner: Inner::Detected(file_type),
                decrypted: false,
            });
        }

        Err(Error::UnknownFormat)
    }

    pub fn file_type(&self) -> FileType {
        match &self.inner {
            Inner::Odf(doc) => doc.file_type(),
            Inner::Ooxml(_) | Inner::EncryptedOoxml { .. } => FileType::OfficeOpenXml,
            Inner::Detected(file_type) => *file_type,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        match &self.inner {
            Inner::Odf(doc) => doc.is_encrypted(),
            Inner::EncryptedOoxml { .. } => true,
            Inner::Ooxml(_) | Inner::Detected(_) => false,
        }
    }

    /// Whether [`Document::decrypt`] can do anything for this document.
    pub fn can_decrypt(&self) -> bool {
        self.is_encrypted()
    }

    /// Whether this handle was produced by a successful decrypt, as opposed
    /// to having been opened on a plain package.
    pub fn is_decrypted(&self) -> bool {
        self.decrypted
    }

    /// Whether [`Document::html`] is available in the current state.
    pub fn can_translate(&self) -> bool {
        match &self.inner {
            Inner::Odf(doc) => !doc.is_encrypted(),
            Inner::Ooxml(_) => true,
            Inner::EncryptedOoxml { .. } | Inner::Detected(_) => false,
        }
    }

    /// Whether [`Document::save`] is available in the current state.
    pub fn can_save(&self) -> bool {
        matches!(&self.inner, Inner::Odf(_) | Inner::Ooxml(_))
    }

    /// Whether in-place editing is available. No variant supports it yet;
    /// the query exists so callers can feature-probe uniformly.
    pub fn can_edit(&self) -> bool {
        false
    }

    /// Detection result, refined after decryption.
    pub fn meta(&self) -> FileMeta {
        match &self.inner {
            Inner::Odf(doc) => doc.meta(),
            Inner::Ooxml(doc) => doc.meta(),
            Inner::EncryptedOoxml { .. } => FileMeta {
                file_type: FileType::OfficeOpenXml,
                encrypted: true,
                entries: Vec::new(),
            },
            Inner::Detected(file_type) => FileMeta {
                file_type: *file_type,
                encrypted: false,
                entries: Vec::new(),
            },
        }
    }

    /// Decrypt the document in place.
    ///
    /// A wrong password leaves the document untouched and can be retried.
    /// For OOXML wrappers the decrypted bytes are re-detected, so the handle
    /// afterwards behaves exactly like one opened on a plain package.
    pub fn decrypt(&mut self, password: &str) -> Result<()> {
        match &mut self.inner {
            Inner::Odf(doc) if doc.is_encrypted() => {
                doc.decrypt(password)?;
                self.decrypted = true;
                Ok(())
            }
            Inner::EncryptedOoxml { info, package } => {
                let plain = info.decrypt(package, password)?;
                *self = Self::from_bytes(plain)?;
                self.decrypted = true;
                Ok(())
            }
            Inner::Odf(_) | Inner::Ooxml(_) | Inner::Detected(_) => {
                Err(Error::UnsupportedOperation("decrypt an unencrypted document"))
            }
        }
    }

    /// Translate the document into a self-contained HTML page.
    pub fn html(&self, config: HtmlConfig) -> Result<String> {
        match &self.inner {
            Inner::Odf(doc) => doc.html(config),
            Inner::Ooxml(doc) => doc.html(config),
            _ => Err(Error::UnsupportedOperation("translate to HTML")),
        }
    }

    /// Write the current package state to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        match &self.inner {
            Inner::Odf(doc) => doc.save(path.as_ref()),
            Inner::Ooxml(doc) => doc.save(path.as_ref()),
            _ => Err(Error::UnsupportedOperation("save this document variant")),
        }
    }
}
