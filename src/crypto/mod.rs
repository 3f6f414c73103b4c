//! Crypto primitives adapter.
//!
//! Thin typed wrappers over the ecosystem crates, exposing exactly the
//! operations the two decryption protocols consume: base64, SHA-1/SHA-256,
//! PBKDF2, block-cipher decryption (AES-CBC, AES-ECB, Triple-DES-CBC,
//! Blowfish-CFB), and a padding-reporting raw inflate. All functions are
//! pure over byte buffers and retain no state, so they are safe for
//! concurrent read-only use across documents.

use crate::common::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use cipher::block_padding::NoPadding;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockDecryptMut, KeyInit, KeyIvInit};
use sha1::{Digest, Sha1};
use sha2::Sha256;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type TdesCbcDec = cbc::Decryptor<des::TdesEde3>;
type BlowfishCfbDec = cfb_mode::Decryptor<blowfish::Blowfish>;

pub fn base64_encode(input: &[u8]) -> String {
    BASE64_STANDARD.encode(input)
}

pub fn base64_decode(input: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(input.trim())
        .map_err(|e| Error::MalformedStructure(format!("invalid base64: {e}")))
}

pub fn sha1(input: &[u8]) -> Vec<u8> {
    let mut sha = Sha1::new();
    sha.update(input);
    sha.finalize().to_vec()
}

pub fn sha256(input: &[u8]) -> Vec<u8> {
    let mut sha = Sha256::new();
    sha.update(input);
    sha.finalize().to_vec()
}

/// PBKDF2-HMAC-SHA1 key derivation, as used by ODF manifest encryption.
pub fn pbkdf2_sha1(start_key: &[u8], salt: &[u8], iterations: u32, key_size: usize) -> Vec<u8> {
    let mut key = vec![0u8; key_size];
    pbkdf2::pbkdf2_hmac::<Sha1>(start_key, salt, iterations, &mut key);
    key
}

/// AES-CBC decryption without padding removal; the key length selects
/// AES-128/192/256. Input must be a whole number of 16-byte blocks.
pub fn decrypt_aes_cbc(key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    if input.len() % 16 != 0 {
        return Err(Error::MalformedStructure(format!(
            "AES ciphertext length {} is not a multiple of 16",
            input.len()
        )));
    }
    let mut buf = input.to_vec();
    match key.len() {
        16 => {
            let cipher = Aes128CbcDec::new_from_slices(key, iv)
                .map_err(|_| Error::MalformedStructure("invalid AES-128 key/iv".to_string()))?;
            cipher
                .decrypt_padded_mut::<NoPadding>(&mut buf)
                .map_err(|_| Error::MalformedStructure("AES-CBC decryption failed".to_string()))?;
        }
        24 => {
            let cipher = Aes192CbcDec::new_from_slices(key, iv)
                .map_err(|_| Error::MalformedStructure("invalid AES-192 key/iv".to_string()))?;
            cipher
                .decrypt_padded_mut::<NoPadding>(&mut buf)
                .map_err(|_| Error::MalformedStructure("AES-CBC decryption failed".to_string()))?;
        }
        32 => {
            let cipher = Aes256CbcDec::new_from_slices(key, iv)
                .map_err(|_| Error::MalformedStructure("invalid AES-256 key/iv".to_string()))?;
            cipher
                .decrypt_padded_mut::<NoPadding>(&mut buf)
                .map_err(|_| Error::MalformedStructure("AES-CBC decryption failed".to_string()))?;
        }
        other => {
            return Err(Error::UnsupportedAlgorithm(format!(
                "AES key length {other}"
            )))
        }
    }
    Ok(buf)
}

/// AES-ECB decryption, as used by the OOXML Standard `EncryptedPackage`
/// stream. The key length selects AES-128/192/256.
pub fn decrypt_aes_ecb(key: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    if input.len() % 16 != 0 {
        return Err(Error::MalformedStructure(format!(
            "AES ciphertext length {} is not a multiple of 16",
            input.len()
        )));
    }
    let mut buf = input.to_vec();
    match key.len() {
        16 => ecb_decrypt_blocks(&aes::Aes128::new_from_slice(key).map_err(invalid_key)?, &mut buf),
        24 => ecb_decrypt_blocks(&aes::Aes192::new_from_slice(key).map_err(invalid_key)?, &mut buf),
        32 => ecb_decrypt_blocks(&aes::Aes256::new_from_slice(key).map_err(invalid_key)?, &mut buf),
        other => {
            return Err(Error::UnsupportedAlgorithm(format!(
                "AES key length {other}"
            )))
        }
    }
    Ok(buf)
}

fn invalid_key(_: cipher::InvalidLength) -> Error {
    Error::MalformedStructure("invalid AES key length".to_string())
}

fn ecb_decrypt_blocks<C: BlockDecrypt>(cipher: &C, buf: &mut [u8]) {
    for chunk in buf.chunks_mut(16) {
        let block = GenericArray::from_mut_slice(chunk);
        cipher.decrypt_block(block);
    }
}

/// Triple-DES (EDE3) CBC decryption without padding removal.
pub fn decrypt_triple_des(key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    if input.len() % 8 != 0 {
        return Err(Error::MalformedStructure(format!(
            "3DES ciphertext length {} is not a multiple of 8",
            input.len()
        )));
    }
    let mut buf = input.to_vec();
    let cipher = TdesCbcDec::new_from_slices(key, iv)
        .map_err(|_| Error::MalformedStructure("invalid 3DES key/iv".to_string()))?;
    cipher
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| Error::MalformedStructure("3DES-CBC decryption failed".to_string()))?;
    Ok(buf)
}

/// Blowfish CFB decryption (full-block feedback). Any input length is valid.
pub fn decrypt_blowfish(key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    use cfb_mode::cipher::AsyncStreamCipher;
    let mut buf = input.to_vec();
    let cipher = BlowfishCfbDec::new_from_slices(key, iv)
        .map_err(|_| Error::MalformedStructure("invalid Blowfish key/iv".to_string()))?;
    cipher.decrypt(&mut buf);
    Ok(buf)
}

/// Result of a padding-aware inflate pass.
#[derive(Debug)]
pub struct Inflated {
    pub data: Vec<u8>,
    /// Raw bytes left in the input after the deflate stream ended.
    ///
    /// Encrypted ODF entries round the compressed payload up to a cipher
    /// block boundary; the slack shows up here and is not a corruption.
    pub padding: usize,
}

/// Inflate a raw deflate stream, reporting (and discarding) trailing
/// padding bytes instead of treating them as garbage.
pub fn inflate(input: &[u8]) -> Result<Inflated> {
    use flate2::{Decompress, FlushDecompress, Status};

    let mut decompress = Decompress::new(false);
    let mut data = Vec::with_capacity(input.len().saturating_mul(3).max(1024));
    loop {
        let consumed = decompress.total_in() as usize;
        if data.len() == data.capacity() {
            data.reserve(32 * 1024);
        }
        let status = decompress
            .decompress_vec(&input[consumed..], &mut data, FlushDecompress::Finish)
            .map_err(|e| Error::MalformedStructure(format!("inflate failed: {e}")))?;
        match status {
            Status::StreamEnd => break,
            Status::Ok => {}
            Status::BufError => {
                if decompress.total_in() as usize == consumed && data.len() < data.capacity() {
                    return Err(Error::MalformedStructure(
                        "truncated deflate stream".to_string(),
                    ));
                }
            }
        }
    }
    let padding = input.len() - decompress.total_in() as usize;
    Ok(Inflated { data, padding })
}

/// Deflate-compress a buffer (raw stream, no zlib header).
///
/// Only the test fixtures need the forward direction, but the codec is kept
/// next to `inflate` so the pair stays symmetric.
pub fn deflate(input: &[u8]) -> Vec<u8> {
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    // Writing to a Vec cannot fail.
    let _ = encoder.write_all(input);
    encoder.finish().unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Forward (encrypting) counterparts used to build test fixtures.

    use cipher::block_padding::NoPadding;
    use cipher::generic_array::GenericArray;
    use cipher::{BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};

    /// AES-CBC encrypt; the key length selects the variant, input must
    /// already be block-aligned.
    pub fn encrypt_aes_cbc(key: &[u8], iv: &[u8], input: &[u8]) -> Vec<u8> {
        assert_eq!(input.len() % 16, 0, "test input must be block-aligned");
        match key.len() {
            16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
                .expect("test key/iv")
                .encrypt_padded_vec_mut::<NoPadding>(input),
            24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(key, iv)
                .expect("test key/iv")
                .encrypt_padded_vec_mut::<NoPadding>(input),
            32 => cbc::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
                .expect("test key/iv")
                .encrypt_padded_vec_mut::<NoPadding>(input),
            other => panic!("unsupported test key length {other}"),
        }
    }

    /// AES-256-CBC encrypt; input must already be block-aligned.
    pub fn encrypt_aes256_cbc(key: &[u8], iv: &[u8], input: &[u8]) -> Vec<u8> {
        assert_eq!(key.len(), 32);
        encrypt_aes_cbc(key, iv, input)
    }

    /// AES-ECB encrypt; the key length selects the variant.
    pub fn encrypt_aes_ecb(key: &[u8], input: &[u8]) -> Vec<u8> {
        assert_eq!(input.len() % 16, 0, "test input must be block-aligned");
        let mut buf = input.to_vec();
        match key.len() {
            16 => ecb_encrypt_blocks(&aes::Aes128::new_from_slice(key).unwrap(), &mut buf),
            24 => ecb_encrypt_blocks(&aes::Aes192::new_from_slice(key).unwrap(), &mut buf),
            32 => ecb_encrypt_blocks(&aes::Aes256::new_from_slice(key).unwrap(), &mut buf),
            other => panic!("unsupported test key length {other}"),
        }
        buf
    }

    fn ecb_encrypt_blocks<C: BlockEncrypt>(cipher: &C, buf: &mut [u8]) {
        for chunk in buf.chunks_mut(16) {
            cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
        }
    }

    /// Pad with zero bytes up to a block multiple.
    pub fn pad_to_block(input: &[u8], block: usize) -> Vec<u8> {
        let mut out = input.to_vec();
        let rem = out.len() % block;
        if rem != 0 {
            out.resize(out.len() + block - rem, 0);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_roundtrip() {
        let data = b"salt and iv bytes";
        assert_eq!(base64_decode(&base64_encode(data)).unwrap(), data);
        assert!(base64_decode("!!!").is_err());
    }

    #[test]
    fn test_digest_sizes() {
        assert_eq!(sha1(b"abc").len(), 20);
        assert_eq!(sha256(b"abc").len(), 32);
        // FIPS 180-1 test vector, first bytes.
        assert_eq!(&sha1(b"abc")[..4], &[0xa9, 0x99, 0x3e, 0x36]);
    }

    #[test]
    fn test_pbkdf2_is_deterministic() {
        let a = pbkdf2_sha1(b"start", b"salt", 1024, 32);
        let b = pbkdf2_sha1(b"start", b"salt", 1024, 32);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_ne!(a, pbkdf2_sha1(b"other", b"salt", 1024, 32));
    }

    #[test]
    fn test_aes_cbc_roundtrip() {
        let key = [7u8; 32];
        let iv = [9u8; 16];
        let plain = b"sixteen byte blk sixteen byte bl";
        let encrypted = testutil::encrypt_aes256_cbc(&key, &iv, plain);
        assert_eq!(decrypt_aes_cbc(&key, &iv, &encrypted).unwrap(), plain);
    }

    #[test]
    fn test_aes_cbc_rejects_partial_blocks() {
        assert!(decrypt_aes_cbc(&[0u8; 32], &[0u8; 16], &[0u8; 17]).is_err());
        assert!(decrypt_aes_cbc(&[0u8; 13], &[0u8; 16], &[0u8; 16]).is_err());
    }

    #[test]
    fn test_inflate_roundtrip() {
        let plain: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let compressed = deflate(&plain);
        let inflated = inflate(&compressed).unwrap();
        assert_eq!(inflated.data, plain);
        assert_eq!(inflated.padding, 0);
    }

    #[test]
    fn test_inflate_reports_padding() {
        let plain = b"padding recovery test payload";
        let mut compressed = deflate(plain);
        let unpadded = compressed.len();
        compressed = testutil::pad_to_block(&compressed, 16);
        let inflated = inflate(&compressed).unwrap();
        assert_eq!(inflated.data, plain);
        assert_eq!(inflated.padding, compressed.len() - unpadded);
    }

    #[test]
    fn test_inflate_rejects_garbage() {
        assert!(inflate(&[0xff, 0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_blowfish_cfb_any_length() {
        // CFB is stream-like; a 5-byte payload must survive the round trip.
        use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
        let key = [3u8; 16];
        let iv = [1u8; 8];
        let mut buf = b"hello".to_vec();
        cfb_mode::Encryptor::<blowfish::Blowfish>::new_from_slices(&key, &iv)
            .unwrap()
            .encrypt(&mut buf);
        assert_eq!(decrypt_blowfish(&key, &iv, &buf).unwrap(), b"hello");
    }
}
