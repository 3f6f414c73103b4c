//! ODF package manifest (`META-INF/manifest.xml`).
//!
//! The manifest lists every package entry with its media type and, for
//! protected packages, a per-entry encryption descriptor: algorithm and IV,
//! key derivation parameters, start-key generation, and the plaintext
//! checksum used to verify a password attempt.

use crate::common::xml::{parse_document, XmlElement};
use crate::common::{Error, Result};
use crate::crypto::base64_decode;
use std::collections::HashMap;

/// Per-entry encryption descriptor from `manifest:encryption-data`.
#[derive(Debug, Clone)]
pub struct EncryptionData {
    /// Digest scheme for password verification, e.g. `SHA1/1K`.
    pub checksum_type: String,
    /// Expected digest of the decrypted (still deflated) payload.
    pub checksum: Vec<u8>,
    /// Algorithm URI or name, e.g. `...#aes256-cbc` or `Blowfish CFB`.
    pub algorithm_name: String,
    pub initialisation_vector: Vec<u8>,
    /// Key derivation name, in practice always PBKDF2.
    pub key_derivation_name: String,
    /// Derived key length in bytes.
    pub key_size: usize,
    pub iteration_count: u32,
    pub salt: Vec<u8>,
    /// Hash used to turn the password into the start key, SHA-1 by default.
    pub start_key_generation_name: String,
    pub start_key_size: usize,
}

/// One `manifest:file-entry`.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub full_path: String,
    pub media_type: String,
    pub encryption: Option<EncryptionData>,
}

/// Parsed package manifest.
#[derive(Debug, Default)]
pub struct Manifest {
    entries: HashMap<String, ManifestEntry>,
}

impl Manifest {
    /// Parse `META-INF/manifest.xml` bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = parse_document(bytes)?;
        if root.name != "manifest:manifest" {
            return Err(Error::MalformedStructure(format!(
                "unexpected manifest root element: {}",
                root.name
            )));
        }

        let mut entries = HashMap::new();
        for entry in root.elements().filter(|e| e.name == "manifest:file-entry") {
            let Some(full_path) = entry.attribute("manifest:full-path") else {
                continue;
            };
            let media_type = entry
                .attribute("manifest:media-type")
                .unwrap_or_default()
                .to_string();
            let encryption = match entry.child("manifest:encryption-data") {
                Some(data) => Some(parse_encryption_data(data, full_path)?),
                None => None,
            };
            entries.insert(
                full_path.to_string(),
                ManifestEntry {
                    full_path: full_path.to_string(),
                    media_type,
                    encryption,
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn entry(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.get(path)
    }

    /// Whether any entry carries an encryption descriptor.
    pub fn is_encrypted(&self) -> bool {
        self.entries.values().any(|e| e.encryption.is_some())
    }

    /// All entries carrying an encryption descriptor.
    pub fn encrypted_entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values().filter(|e| e.encryption.is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_encryption_data(data: &XmlElement, path: &str) -> Result<EncryptionData> {
    let checksum_type = required_attr(data, "manifest:checksum-type", path)?.to_string();
    let checksum = base64_decode(required_attr(data, "manifest:checksum", path)?)?;

    let algorithm = data.child("manifest:algorithm").ok_or_else(|| {
        Error::MalformedStructure(format!("missing manifest:algorithm for {path}"))
    })?;
    let algorithm_name = required_attr(algorithm, "manifest:algorithm-name", path)?.to_string();
    let initialisation_vector =
        base64_decode(required_attr(algorithm, "manifest:initialisation-vector", path)?)?;

    let derivation = data.child("manifest:key-derivation").ok_or_else(|| {
        Error::MalformedStructure(format!("missing manifest:key-derivation for {path}"))
    })?;
    let key_derivation_name =
        required_attr(derivation, "manifest:key-derivation-name", path)?.to_string();
    let salt = base64_decode(required_attr(derivation, "manifest:salt", path)?)?;
    let iteration_count = parse_number(derivation, "manifest:iteration-count", 1024, path)?;
    // ODF 1.2 defaults to a 16-byte derived key when the attribute is absent.
    let key_size = parse_number(derivation, "manifest:key-size", 16, path)? as usize;

    let (start_key_generation_name, start_key_size) =
        match data.child("manifest:start-key-generation") {
            Some(start) => {
                let name =
                    required_attr(start, "manifest:start-key-generation-name", path)?.to_string();
                let size = parse_number(start, "manifest:key-size", 20, path)? as usize;
                (name, size)
            }
            // Absent start-key-generation means SHA-1 of the password.
            None => ("SHA1".to_string(), 20),
        };

    Ok(EncryptionData {
        checksum_type,
        checksum,
        algorithm_name,
        initialisation_vector,
        key_derivation_name,
        key_size,
        iteration_count,
        salt,
        start_key_generation_name,
        start_key_size,
    })
}

fn required_attr<'a>(elem: &'a XmlElement, name: &str, path: &str) -> Result<&'a str> {
    elem.attribute(name).ok_or_else(|| {
        Error::MalformedStructure(format!("missing {name} in encryption data for {path}"))
    })
}

fn parse_number(elem: &XmlElement, name: &str, default: u32, path: &str) -> Result<u32> {
    match elem.attribute(name) {
        Some(value) => value.trim().parse().map_err(|_| {
            Error::MalformedStructure(format!("invalid {name} in encryption data for {path}"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::base64_encode;

    fn encrypted_manifest() -> String {
        format!(
            r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
              <manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.text"/>
              <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml">
                <manifest:encryption-data manifest:checksum-type="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0#sha256-1k" manifest:checksum="{checksum}">
                  <manifest:algorithm manifest:algorithm-name="http://www.w3.org/2001/04/xmlenc#aes256-cbc" manifest:initialisation-vector="{iv}"/>
                  <manifest:key-derivation manifest:key-derivation-name="PBKDF2" manifest:salt="{salt}" manifest:iteration-count="100000" manifest:key-size="32"/>
                  <manifest:start-key-generation manifest:start-key-generation-name="http://www.w3.org/2000/09/xmldsig#sha256" manifest:key-size="32"/>
                </manifest:encryption-data>
              </manifest:file-entry>
            </manifest:manifest>"#,
            checksum = base64_encode(&[1u8; 32]),
            iv = base64_encode(&[2u8; 16]),
            salt = base64_encode(&[3u8; 16]),
        )
    }

    #[test]
    fn test_parse_plain_entry() {
        let manifest = Manifest::parse(encrypted_manifest().as_bytes()).unwrap();
        let root = manifest.entry("/").unwrap();
        assert_eq!(root.media_type, "application/vnd.oasis.opendocument.text");
        assert!(root.encryption.is_none());
    }

    #[test]
    fn test_parse_encryption_data() {
        let manifest = Manifest::parse(encrypted_manifest().as_bytes()).unwrap();
        assert!(manifest.is_encrypted());
        assert_eq!(manifest.encrypted_entries().count(), 1);

        let data = manifest
            .entry("content.xml")
            .unwrap()
            .encryption
            .as_ref()
            .unwrap();
        assert!(data.algorithm_name.ends_with("#aes256-cbc"));
        assert_eq!(data.key_size, 32);
        assert_eq!(data.iteration_count, 100_000);
        assert_eq!(data.salt, [3u8; 16]);
        assert_eq!(data.initialisation_vector, [2u8; 16]);
        assert_eq!(data.start_key_size, 32);
        assert!(data.checksum_type.ends_with("#sha256-1k"));
    }

    #[test]
    fn test_defaults_without_start_key_generation() {
        let xml = format!(
            r#"<manifest:manifest>
              <manifest:file-entry manifest:full-path="content.xml">
                <manifest:encryption-data manifest:checksum-type="SHA1/1K" manifest:checksum="{b}">
                  <manifest:algorithm manifest:algorithm-name="Blowfish CFB" manifest:initialisation-vector="{b}"/>
                  <manifest:key-derivation manifest:key-derivation-name="PBKDF2" manifest:salt="{b}"/>
                </manifest:encryption-data>
              </manifest:file-entry>
            </manifest:manifest>"#,
            b = base64_encode(&[0u8; 8]),
        );
        let manifest = Manifest::parse(xml.as_bytes()).unwrap();
        let data = manifest
            .entry("content.xml")
            .unwrap()
            .encryption
            .as_ref()
            .unwrap();
        assert_eq!(data.key_size, 16);
        assert_eq!(data.iteration_count, 1024);
        assert_eq!(data.start_key_generation_name, "SHA1");
        assert_eq!(data.start_key_size, 20);
    }

    #[test]
    fn test_rejects_incomplete_encryption_data() {
        let xml = r#"<manifest:manifest>
          <manifest:file-entry manifest:full-path="content.xml">
            <manifest:encryption-data manifest:checksum-type="SHA1/1K" manifest:checksum="AAAA">
              <manifest:algorithm manifest:algorithm-name="x" manifest:initialisation-vector="AAAA"/>
            </manifest:encryption-data>
          </manifest:file-entry>
        </manifest:manifest>"#;
        assert!(matches!(
            Manifest::parse(xml.as_bytes()),
            Err(Error::MalformedStructure(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_root() {
        assert!(Manifest::parse(b"<office:document/>").is_err());
    }
}
