//! Manifest-based decryption of protected ODF packages.
//!
//! Per entry: hash the password into a start key (manifest-selected digest),
//! derive the cipher key with PBKDF2-HMAC-SHA1, verify the password against
//! the manifest checksum over a decrypted prefix, then bulk-decrypt and
//! inflate the raw-deflate payload. The checksum window covers the decrypted
//! bytes as stored, so cipher-block padding past the first kilobyte does not
//! disturb verification.

use crate::access::{MemoryStorage, Storage};
use crate::common::{Error, Result};
use crate::crypto;
use crate::odf::manifest::{EncryptionData, Manifest};
use log::debug;
use zeroize::Zeroizing;

/// Digest window used by the `/1K` checksum types.
const CHECKSUM_WINDOW: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    AesCbc,
    TripleDesCbc,
    BlowfishCfb,
}

impl Algorithm {
    fn from_name(name: &str) -> Result<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.contains("aes") && lower.contains("cbc") {
            Ok(Algorithm::AesCbc)
        } else if lower.contains("tripledes") || lower.contains("des-ede3") {
            Ok(Algorithm::TripleDesCbc)
        } else if lower.contains("blowfish") {
            Ok(Algorithm::BlowfishCfb)
        } else {
            Err(Error::UnsupportedAlgorithm(name.to_string()))
        }
    }

    fn block_size(self) -> usize {
        match self {
            Algorithm::AesCbc => 16,
            Algorithm::TripleDesCbc | Algorithm::BlowfishCfb => 8,
        }
    }
}

/// Decrypt every protected entry of `storage`, passing plain entries through.
///
/// A checksum mismatch on any entry aborts the whole attempt with
/// [`Error::WrongPassword`]; an algorithm outside the supported set is fatal.
pub fn decrypt_package(
    storage: &dyn Storage,
    manifest: &Manifest,
    password: &str,
) -> Result<MemoryStorage> {
    let mut decrypted = MemoryStorage::new();
    for name in storage.list_entries() {
        if name.ends_with('/') {
            continue;
        }
        let content = storage.read(&name)?;
        match manifest.entry(&name).and_then(|e| e.encryption.as_ref()) {
            Some(data) => {
                debug!("decrypting entry {name} ({})", data.algorithm_name);
                decrypted.insert(name, decrypt_entry(data, password, &content)?);
            }
            None => decrypted.insert(name, content),
        }
    }
    Ok(decrypted)
}

/// Decrypt and inflate a single protected entry.
pub fn decrypt_entry(
    data: &EncryptionData,
    password: &str,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    if !data.key_derivation_name.eq_ignore_ascii_case("pbkdf2") {
        return Err(Error::UnsupportedAlgorithm(
            data.key_derivation_name.clone(),
        ));
    }
    let algorithm = Algorithm::from_name(&data.algorithm_name)?;

    let start_key = Zeroizing::new(start_key(data, password));
    let key = Zeroizing::new(crypto::pbkdf2_sha1(
        &start_key,
        &data.salt,
        data.iteration_count,
        data.key_size,
    ));

    // Decrypt only a verification prefix first. CBC and full-block CFB both
    // produce identical leading plaintext for a prefix of whole blocks.
    let prefix_len = verification_prefix_len(algorithm, ciphertext.len());
    let prefix = decrypt_with(algorithm, &key, data, &ciphertext[..prefix_len])?;
    verify_checksum(data, &prefix)?;

    let plaintext = decrypt_with(algorithm, &key, data, ciphertext)?;
    let inflated = crypto::inflate(&plaintext)?;
    if inflated.padding > 0 {
        debug!("discarded {} trailing padding byte(s)", inflated.padding);
    }
    Ok(inflated.data)
}

/// Hash the raw password bytes into the PBKDF2 start key.
fn start_key(data: &EncryptionData, password: &str) -> Vec<u8> {
    let lower = data.start_key_generation_name.to_ascii_lowercase();
    let mut digest = if lower.contains("sha256") {
        crypto::sha256(password.as_bytes())
    } else {
        crypto::sha1(password.as_bytes())
    };
    if data.start_key_size > 0 && data.start_key_size < digest.len() {
        digest.truncate(data.start_key_size);
    }
    digest
}

fn verification_prefix_len(algorithm: Algorithm, total: usize) -> usize {
    let block = algorithm.block_size();
    let wanted = CHECKSUM_WINDOW.div_ceil(block) * block;
    wanted.min(total)
}

fn decrypt_with(
    algorithm: Algorithm,
    key: &[u8],
    data: &EncryptionData,
    input: &[u8],
) -> Result<Vec<u8>> {
    let iv = &data.initialisation_vector;
    match algorithm {
        Algorithm::AesCbc => crypto::decrypt_aes_cbc(key, iv, input),
        Algorithm::TripleDesCbc => crypto::decrypt_triple_des(key, iv, input),
        Algorithm::BlowfishCfb => crypto::decrypt_blowfish(key, iv, input),
    }
}

/// Compare the manifest checksum against the decrypted prefix.
fn verify_checksum(data: &EncryptionData, plaintext: &[u8]) -> Result<()> {
    let lower = data.checksum_type.to_ascii_lowercase();
    let window = if lower.contains("1k") {
        &plaintext[..plaintext.len().min(CHECKSUM_WINDOW)]
    } else {
        plaintext
    };
    let digest = if lower.contains("sha256") {
        crypto::sha256(window)
    } else {
        crypto::sha1(window)
    };
    if digest == data.checksum {
        Ok(())
    } else {
        Err(Error::WrongPassword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::testutil::{encrypt_aes256_cbc, pad_to_block};

    const PASSWORD: &str = "hunter2";
    const SALT: [u8; 16] = [5u8; 16];
    const IV: [u8; 16] = [6u8; 16];

    /// Build ciphertext + descriptor the way a producer would.
    fn encrypt_fixture(plain: &[u8]) -> (Vec<u8>, EncryptionData) {
        let deflated = pad_to_block(&crypto::deflate(plain), 16);
        let checksum =
            crypto::sha256(&deflated[..deflated.len().min(CHECKSUM_WINDOW)]);

        let start = crypto::sha256(PASSWORD.as_bytes());
        let key = crypto::pbkdf2_sha1(&start, &SALT, 1024, 32);
        let ciphertext = encrypt_aes256_cbc(&key, &IV, &deflated);

        let data = EncryptionData {
            checksum_type: "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0#sha256-1k"
                .to_string(),
            checksum,
            algorithm_name: "http://www.w3.org/2001/04/xmlenc#aes256-cbc".to_string(),
            initialisation_vector: IV.to_vec(),
            key_derivation_name: "PBKDF2".to_string(),
            key_size: 32,
            iteration_count: 1024,
            salt: SALT.to_vec(),
            start_key_generation_name: "http://www.w3.org/2000/09/xmldsig#sha256".to_string(),
            start_key_size: 32,
        };
        (ciphertext, data)
    }

    #[test]
    fn test_decrypt_entry_roundtrip() {
        let plain: Vec<u8> = b"<office:document-content>"
            .iter()
            .cycle()
            .take(5000)
            .copied()
            .collect();
        let (ciphertext, data) = encrypt_fixture(&plain);
        assert_eq!(decrypt_entry(&data, PASSWORD, &ciphertext).unwrap(), plain);
    }

    #[test]
    fn test_decrypt_entry_short_payload() {
        // Shorter than the checksum window, digest covers everything.
        let (ciphertext, data) = encrypt_fixture(b"tiny");
        assert_eq!(
            decrypt_entry(&data, PASSWORD, &ciphertext).unwrap(),
            b"tiny"
        );
    }

    #[test]
    fn test_wrong_password_is_recoverable() {
        let (ciphertext, data) = encrypt_fixture(b"some content here");
        let err = decrypt_entry(&data, "not the password", &ciphertext).unwrap_err();
        assert!(matches!(err, Error::WrongPassword));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unknown_algorithm_is_fatal() {
        let (ciphertext, mut data) = encrypt_fixture(b"content");
        data.algorithm_name = "http://example.com#rc4".to_string();
        assert!(matches!(
            decrypt_entry(&data, PASSWORD, &ciphertext),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_unknown_key_derivation_is_fatal() {
        let (ciphertext, mut data) = encrypt_fixture(b"content");
        data.key_derivation_name = "scrypt".to_string();
        assert!(matches!(
            decrypt_entry(&data, PASSWORD, &ciphertext),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_decrypt_package_passes_plain_entries_through() {
        let plain = b"<office:document-content/>".to_vec();
        let (ciphertext, data) = encrypt_fixture(&plain);

        let mut storage = MemoryStorage::new();
        storage.insert("mimetype", b"application/vnd.oasis.opendocument.text".to_vec());
        storage.insert("content.xml", ciphertext);

        let manifest_xml = format!(
            r#"<manifest:manifest>
              <manifest:file-entry manifest:full-path="content.xml">
                <manifest:encryption-data manifest:checksum-type="{}" manifest:checksum="{}">
                  <manifest:algorithm manifest:algorithm-name="{}" manifest:initialisation-vector="{}"/>
                  <manifest:key-derivation manifest:key-derivation-name="PBKDF2" manifest:salt="{}" manifest:iteration-count="1024" manifest:key-size="32"/>
                  <manifest:start-key-generation manifest:start-key-generation-name="{}" manifest:key-size="32"/>
                </manifest:encryption-data>
              </manifest:file-entry>
            </manifest:manifest>"#,
            data.checksum_type,
            crypto::base64_encode(&data.checksum),
            data.algorithm_name,
            crypto::base64_encode(&data.initialisation_vector),
            crypto::base64_encode(&data.salt),
            data.start_key_generation_name,
        );
        let manifest = Manifest::parse(manifest_xml.as_bytes()).unwrap();

        let decrypted = decrypt_package(&storage, &manifest, PASSWORD).unwrap();
        assert_eq!(decrypted.read("content.xml").unwrap(), plain);
        assert_eq!(
            decrypted.read("mimetype").unwrap(),
            b"application/vnd.oasis.opendocument.text"
        );
    }
}
