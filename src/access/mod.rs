//! Storage abstraction over document containers.
//!
//! A [`Storage`] is the read-only view of named entries the rest of the
//! library consumes: ZIP packages for ODF/OOXML, CFB containers for legacy
//! binaries and the OOXML encryption wrapper, and an in-memory map for
//! decrypted content. Opening a storage against the wrong container kind
//! yields [`Error::FormatMismatch`], which the detector treats as "try the
//! next sniffer" rather than a hard failure.

use crate::common::detection::{has_cfb_signature, has_zip_signature};
use crate::common::{Error, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

/// Read-only access to the named entries of a document container.
pub trait Storage {
    /// Names of all entries, in container order.
    fn list_entries(&self) -> Vec<String>;

    /// Whether a file entry with this name exists.
    fn is_file(&self, name: &str) -> bool;

    /// Read an entry's bytes.
    fn read(&self, name: &str) -> Result<Vec<u8>>;
}

/// ZIP-backed storage for ODF and OOXML packages.
pub struct ZipStorage {
    archive: RefCell<zip::ZipArchive<Cursor<Vec<u8>>>>,
}

impl ZipStorage {
    /// Open a ZIP container held in memory.
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        if !has_zip_signature(&bytes) {
            return Err(Error::FormatMismatch("zip"));
        }
        let archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|_| Error::FormatMismatch("zip"))?;
        Ok(Self {
            archive: RefCell::new(archive),
        })
    }
}

impl Storage for ZipStorage {
    fn list_entries(&self) -> Vec<String> {
        let archive = self.archive.borrow();
        archive.file_names().map(|name| name.to_string()).collect()
    }

    fn is_file(&self, name: &str) -> bool {
        self.archive.borrow_mut().by_name(name).is_ok()
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let mut archive = self.archive.borrow_mut();
        let mut file = archive
            .by_name(name)
            .map_err(|_| Error::Zip(format!("entry not found: {name}")))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }
}

/// CFB-backed storage for legacy binaries and encrypted OOXML wrappers.
pub struct CfbStorage {
    file: RefCell<cfb::CompoundFile<Cursor<Vec<u8>>>>,
}

impl CfbStorage {
    /// Open a Compound File Binary container held in memory.
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        if !has_cfb_signature(&bytes) {
            return Err(Error::FormatMismatch("compound file"));
        }
        let file = cfb::CompoundFile::open(Cursor::new(bytes))
            .map_err(|_| Error::FormatMismatch("compound file"))?;
        Ok(Self {
            file: RefCell::new(file),
        })
    }
}

impl Storage for CfbStorage {
    fn list_entries(&self) -> Vec<String> {
        let file = self.file.borrow();
        file.walk()
            .filter(|entry| entry.is_stream())
            .map(|entry| {
                entry
                    .path()
                    .to_string_lossy()
                    .trim_start_matches('/')
                    .to_string()
            })
            .collect()
    }

    fn is_file(&self, name: &str) -> bool {
        self.file.borrow().is_stream(format!("/{name}"))
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.file.borrow_mut();
        let mut stream = file
            .open_stream(format!("/{name}"))
            .map_err(|_| Error::Cfb(format!("stream not found: {name}")))?;
        let mut content = Vec::new();
        stream.read_to_end(&mut content)?;
        Ok(content)
    }
}

/// In-memory storage, used as the decrypted view of a package.
#[derive(Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.entries.insert(name.into(), data);
    }
}

impl Storage for MemoryStorage {
    fn list_entries(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn is_file(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MalformedStructure(format!("entry not found: {name}")))
    }
}
