//! MS-OFFCRYPTO decryption for Office Open XML packages.
//!
//! An encrypted OOXML file is a CFB container with two streams:
//! `EncryptionInfo` (the descriptor, binary for the Standard scheme and XML
//! for Agile) and `EncryptedPackage` (an 8-byte plaintext size followed by
//! the ciphertext of the inner ZIP package). Both schemes verify the
//! password against an encrypted verifier before touching the package, so a
//! wrong password is reported without producing garbage output.

use crate::common::xml::{parse_document, XmlElement};
use crate::common::{Error, Result};
use crate::crypto;
use hmac::{Hmac, Mac};
use log::debug;
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

/// Fixed iteration count of the Standard scheme.
const STANDARD_SPIN_COUNT: u32 = 50_000;

/// Agile ciphertext segment length.
const SEGMENT_LENGTH: usize = 4096;

// Agile per-purpose block key constants (MS-OFFCRYPTO 2.3.4.10 and 2.3.4.14).
const BLOCK_VERIFIER_INPUT: [u8; 8] = [0xfe, 0xa7, 0xd2, 0x76, 0x3b, 0x4b, 0x9e, 0x79];
const BLOCK_VERIFIER_VALUE: [u8; 8] = [0xd7, 0xaa, 0x0f, 0x6d, 0x30, 0x61, 0x34, 0x4e];
const BLOCK_ENCRYPTED_KEY: [u8; 8] = [0x14, 0x6e, 0x0b, 0xe7, 0xab, 0xac, 0xd0, 0xd6];
const BLOCK_HMAC_KEY: [u8; 8] = [0x5f, 0xb2, 0xad, 0x01, 0x0c, 0xb9, 0xe1, 0xf6];
const BLOCK_HMAC_VALUE: [u8; 8] = [0xa0, 0x67, 0x7f, 0x02, 0xb2, 0x2c, 0x84, 0x33];

/// Hash function selected by an encryption descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().replace('-', "").as_str() {
            "SHA1" => Ok(HashAlgorithm::Sha1),
            "SHA256" => Ok(HashAlgorithm::Sha256),
            "SHA384" => Ok(HashAlgorithm::Sha384),
            "SHA512" => Ok(HashAlgorithm::Sha512),
            _ => Err(Error::UnsupportedAlgorithm(format!("hash {name}"))),
        }
    }

    fn size(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    fn hmac(self, key: &[u8], data: &[u8]) -> Vec<u8> {
        fn mac<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Vec<u8> {
            let mut mac = <M as Mac>::new_from_slice(key).expect("HMAC accepts any key size");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        match self {
            HashAlgorithm::Sha1 => mac::<Hmac<Sha1>>(key, data),
            HashAlgorithm::Sha256 => mac::<Hmac<Sha256>>(key, data),
            HashAlgorithm::Sha384 => mac::<Hmac<Sha384>>(key, data),
            HashAlgorithm::Sha512 => mac::<Hmac<Sha512>>(key, data),
        }
    }
}

/// Parsed `EncryptionInfo` stream.
#[derive(Debug)]
pub enum EncryptionInfo {
    Standard(StandardEncryption),
    Agile(AgileEncryption),
}

/// Standard scheme descriptor (version 3.2, CryptoAPI header + verifier).
#[derive(Debug)]
pub struct StandardEncryption {
    /// Derived AES key length in bytes.
    pub key_size: usize,
    pub salt: Vec<u8>,
    pub encrypted_verifier: Vec<u8>,
    pub verifier_hash_size: usize,
    pub encrypted_verifier_hash: Vec<u8>,
}

/// Agile scheme descriptor (version 4.4, XML).
#[derive(Debug)]
pub struct AgileEncryption {
    pub key_data: AgileKeyData,
    pub password_key: AgilePasswordKey,
    /// Encrypted HMAC key and value, when the producer wrote dataIntegrity.
    pub integrity: Option<(Vec<u8>, Vec<u8>)>,
}

#[derive(Debug)]
pub struct AgileKeyData {
    pub salt: Vec<u8>,
    pub block_size: usize,
    pub key_bits: usize,
    pub hash: HashAlgorithm,
}

#[derive(Debug)]
pub struct AgilePasswordKey {
    pub salt: Vec<u8>,
    pub spin_count: u32,
    pub block_size: usize,
    pub key_bits: usize,
    pub hash: HashAlgorithm,
    pub encrypted_verifier_hash_input: Vec<u8>,
    pub encrypted_verifier_hash_value: Vec<u8>,
    pub encrypted_key_value: Vec<u8>,
}

impl EncryptionInfo {
    /// Parse an `EncryptionInfo` stream.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let major = reader.read_u16()?;
        let minor = reader.read_u16()?;
        match (major, minor) {
            (2..=4, 2) => parse_standard(&mut reader).map(EncryptionInfo::Standard),
            (4, 4) => {
                reader.read_u32()?; // reserved
                parse_agile(reader.rest()).map(EncryptionInfo::Agile)
            }
            _ => Err(Error::UnsupportedAlgorithm(format!(
                "EncryptionInfo version {major}.{minor}"
            ))),
        }
    }

    /// Verify the password and decrypt the `EncryptedPackage` stream into
    /// the inner ZIP bytes.
    pub fn decrypt(&self, encrypted_package: &[u8], password: &str) -> Result<Vec<u8>> {
        match self {
            EncryptionInfo::Standard(info) => info.decrypt(encrypted_package, password),
            EncryptionInfo::Agile(info) => info.decrypt(encrypted_package, password),
        }
    }
}

// --- Standard (2.3.4) ---

fn parse_standard(reader: &mut Reader) -> Result<StandardEncryption> {
    let _flags = reader.read_u32()?;
    let header_size = reader.read_u32()? as usize;
    let header = reader.take(header_size)?;

    let mut header = Reader::new(header);
    let _flags = header.read_u32()?;
    let _size_extra = header.read_u32()?;
    let alg_id = header.read_u32()?;
    let alg_id_hash = header.read_u32()?;
    let key_bits = header.read_u32()? as usize;
    // provider type, reserved fields and CSP name are not needed

    let key_size = match alg_id {
        0x660E => 16,
        0x660F => 24,
        0x6610 => 32,
        other => {
            return Err(Error::UnsupportedAlgorithm(format!(
                "Standard cipher AlgID {other:#x}"
            )))
        }
    };
    if key_bits != 0 && key_bits / 8 != key_size {
        return Err(Error::MalformedStructure(format!(
            "key size {key_bits} bits contradicts AlgID {alg_id:#x}"
        )));
    }
    if alg_id_hash != 0 && alg_id_hash != 0x8004 {
        return Err(Error::UnsupportedAlgorithm(format!(
            "Standard hash AlgID {alg_id_hash:#x}"
        )));
    }

    let salt_size = reader.read_u32()? as usize;
    if salt_size != 16 {
        return Err(Error::MalformedStructure(format!(
            "unexpected verifier salt size {salt_size}"
        )));
    }
    let salt = reader.take(salt_size)?.to_vec();
    let encrypted_verifier = reader.take(16)?.to_vec();
    let verifier_hash_size = reader.read_u32()? as usize;
    let encrypted_verifier_hash = reader.take(32)?.to_vec();

    Ok(StandardEncryption {
        key_size,
        salt,
        encrypted_verifier,
        verifier_hash_size,
        encrypted_verifier_hash,
    })
}

impl StandardEncryption {
    fn decrypt(&self, encrypted_package: &[u8], password: &str) -> Result<Vec<u8>> {
        let key = Zeroizing::new(standard_key(password, &self.salt, self.key_size));

        let verifier = crypto::decrypt_aes_ecb(&key, &self.encrypted_verifier)?;
        let verifier_hash = crypto::decrypt_aes_ecb(&key, &self.encrypted_verifier_hash)?;
        let expected = crypto::sha1(&verifier);
        let n = self.verifier_hash_size.min(expected.len());
        if verifier_hash.len() < n || verifier_hash[..n] != expected[..n] {
            return Err(Error::WrongPassword);
        }

        let (size, ciphertext) = split_package(encrypted_package)?;
        let mut plain = crypto::decrypt_aes_ecb(&key, ciphertext)?;
        truncate_package(&mut plain, size)?;
        Ok(plain)
    }
}

/// Standard key derivation: iterated SHA-1 with an index prefix, a final
/// block append, then the 0x36/0x5c fill expansion.
fn standard_key(password: &str, salt: &[u8], key_size: usize) -> Vec<u8> {
    let mut h = {
        let mut input = salt.to_vec();
        input.extend_from_slice(&password_utf16le(password));
        crypto::sha1(&input)
    };
    for i in 0..STANDARD_SPIN_COUNT {
        let mut input = i.to_le_bytes().to_vec();
        input.extend_from_slice(&h);
        h = crypto::sha1(&input);
    }
    let mut input = h;
    input.extend_from_slice(&0u32.to_le_bytes());
    let h_final = crypto::sha1(&input);

    let mut buf1 = [0x36u8; 64];
    let mut buf2 = [0x5cu8; 64];
    for (i, byte) in h_final.iter().enumerate() {
        buf1[i] ^= byte;
        buf2[i] ^= byte;
    }
    let mut key = crypto::sha1(&buf1);
    key.extend_from_slice(&crypto::sha1(&buf2));
    key.truncate(key_size);
    key
}

// --- Agile (2.3.4.10+) ---

fn parse_agile(xml: &[u8]) -> Result<AgileEncryption> {
    let root = parse_document(xml)?;
    if local_name(&root.name) != "encryption" {
        return Err(Error::MalformedStructure(format!(
            "unexpected descriptor root element: {}",
            root.name
        )));
    }

    let key_data_elem = child(&root, "keyData")?;
    let key_data = AgileKeyData {
        salt: base64_attr(key_data_elem, "saltValue")?,
        block_size: number_attr(key_data_elem, "blockSize")?,
        key_bits: number_attr(key_data_elem, "keyBits")?,
        hash: parse_cipher_attrs(key_data_elem)?,
    };

    let integrity = root
        .elements()
        .find(|e| local_name(&e.name) == "dataIntegrity")
        .map(|e| {
            Ok::<_, Error>((
                base64_attr(e, "encryptedHmacKey")?,
                base64_attr(e, "encryptedHmacValue")?,
            ))
        })
        .transpose()?;

    let encryptors = child(&root, "keyEncryptors")?;
    let encrypted_key = encryptors
        .elements()
        .find_map(|e| e.elements().find(|c| local_name(&c.name) == "encryptedKey"))
        .ok_or_else(|| {
            Error::MalformedStructure("no password key encryptor in descriptor".to_string())
        })?;
    let password_key = AgilePasswordKey {
        salt: base64_attr(encrypted_key, "saltValue")?,
        spin_count: number_attr(encrypted_key, "spinCount")? as u32,
        block_size: number_attr(encrypted_key, "blockSize")?,
        key_bits: number_attr(encrypted_key, "keyBits")?,
        hash: parse_cipher_attrs(encrypted_key)?,
        encrypted_verifier_hash_input: base64_attr(encrypted_key, "encryptedVerifierHashInput")?,
        encrypted_verifier_hash_value: base64_attr(encrypted_key, "encryptedVerifierHashValue")?,
        encrypted_key_value: base64_attr(encrypted_key, "encryptedKeyValue")?,
    };

    Ok(AgileEncryption {
        key_data,
        password_key,
        integrity,
    })
}

/// Check the cipher attributes and return the selected hash.
fn parse_cipher_attrs(elem: &XmlElement) -> Result<HashAlgorithm> {
    let cipher = elem.attribute("cipherAlgorithm").unwrap_or("AES");
    if !cipher.eq_ignore_ascii_case("AES") {
        return Err(Error::UnsupportedAlgorithm(format!("cipher {cipher}")));
    }
    let chaining = elem.attribute("cipherChaining").unwrap_or("ChainingModeCBC");
    if chaining != "ChainingModeCBC" {
        return Err(Error::UnsupportedAlgorithm(format!("chaining {chaining}")));
    }
    HashAlgorithm::from_name(elem.attribute("hashAlgorithm").unwrap_or("SHA512"))
}

impl AgileEncryption {
    fn decrypt(&self, encrypted_package: &[u8], password: &str) -> Result<Vec<u8>> {
        let pk = &self.password_key;
        let pw_hash = Zeroizing::new(agile_password_hash(
            pk.hash,
            &pk.salt,
            password,
            pk.spin_count,
        ));
        let key_len = pk.key_bits / 8;
        let iv = adjust(pk.salt.clone(), pk.block_size);

        // Password check against the verifier pair.
        let input_key = Zeroizing::new(agile_block_key(
            pk.hash,
            &pw_hash,
            &BLOCK_VERIFIER_INPUT,
            key_len,
        ));
        let verifier_input =
            crypto::decrypt_aes_cbc(&input_key, &iv, &pk.encrypted_verifier_hash_input)?;
        let value_key = Zeroizing::new(agile_block_key(
            pk.hash,
            &pw_hash,
            &BLOCK_VERIFIER_VALUE,
            key_len,
        ));
        let verifier_value =
            crypto::decrypt_aes_cbc(&value_key, &iv, &pk.encrypted_verifier_hash_value)?;
        let expected = pk.hash.digest(&verifier_input);
        let n = pk.hash.size().min(verifier_value.len());
        if expected[..n] != verifier_value[..n] {
            return Err(Error::WrongPassword);
        }

        // Unwrap the intermediate package key.
        let kv_key = Zeroizing::new(agile_block_key(
            pk.hash,
            &pw_hash,
            &BLOCK_ENCRYPTED_KEY,
            key_len,
        ));
        let mut intermediate = crypto::decrypt_aes_cbc(&kv_key, &iv, &pk.encrypted_key_value)?;
        intermediate.truncate(self.key_data.key_bits / 8);
        let intermediate = Zeroizing::new(intermediate);

        self.verify_integrity(&intermediate, encrypted_package)?;

        let (size, ciphertext) = split_package(encrypted_package)?;
        let mut plain = Vec::with_capacity(ciphertext.len());
        for (index, segment) in ciphertext.chunks(SEGMENT_LENGTH).enumerate() {
            let mut iv_input = self.key_data.salt.clone();
            iv_input.extend_from_slice(&(index as u32).to_le_bytes());
            let iv = adjust(self.key_data.hash.digest(&iv_input), self.key_data.block_size);
            plain.extend_from_slice(&crypto::decrypt_aes_cbc(&intermediate, &iv, segment)?);
        }
        truncate_package(&mut plain, size)?;
        Ok(plain)
    }

    /// HMAC check over the whole `EncryptedPackage` stream.
    fn verify_integrity(&self, intermediate: &[u8], encrypted_package: &[u8]) -> Result<()> {
        let Some((encrypted_hmac_key, encrypted_hmac_value)) = &self.integrity else {
            debug!("descriptor carries no dataIntegrity, skipping HMAC check");
            return Ok(());
        };
        let kd = &self.key_data;

        let mut input = kd.salt.clone();
        input.extend_from_slice(&BLOCK_HMAC_KEY);
        let key_iv = adjust(kd.hash.digest(&input), kd.block_size);
        let mut hmac_key = crypto::decrypt_aes_cbc(intermediate, &key_iv, encrypted_hmac_key)?;
        hmac_key.truncate(kd.hash.size());

        let mut input = kd.salt.clone();
        input.extend_from_slice(&BLOCK_HMAC_VALUE);
        let value_iv = adjust(kd.hash.digest(&input), kd.block_size);
        let mut expected = crypto::decrypt_aes_cbc(intermediate, &value_iv, encrypted_hmac_value)?;
        expected.truncate(kd.hash.size());

        if kd.hash.hmac(&hmac_key, encrypted_package) != expected {
            return Err(Error::MalformedStructure(
                "package integrity check failed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Iterated password hash shared by every agile purpose key.
fn agile_password_hash(
    hash: HashAlgorithm,
    salt: &[u8],
    password: &str,
    spin_count: u32,
) -> Vec<u8> {
    let mut input = salt.to_vec();
    input.extend_from_slice(&password_utf16le(password));
    let mut h = hash.digest(&input);
    for i in 0..spin_count {
        let mut input = i.to_le_bytes().to_vec();
        input.extend_from_slice(&h);
        h = hash.digest(&input);
    }
    h
}

/// Purpose key: hash of the password hash plus the block constant, adjusted
/// to the cipher key length.
fn agile_block_key(
    hash: HashAlgorithm,
    password_hash: &[u8],
    block: &[u8; 8],
    key_len: usize,
) -> Vec<u8> {
    let mut input = password_hash.to_vec();
    input.extend_from_slice(block);
    adjust(hash.digest(&input), key_len)
}

/// Truncate or 0x36-pad to the required length.
fn adjust(mut bytes: Vec<u8>, len: usize) -> Vec<u8> {
    bytes.resize(len, 0x36);
    bytes
}

fn password_utf16le(password: &str) -> Vec<u8> {
    password
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

/// Split the `EncryptedPackage` stream into plaintext size and ciphertext.
fn split_package(stream: &[u8]) -> Result<(usize, &[u8])> {
    if stream.len() < 8 {
        return Err(Error::MalformedStructure(
            "EncryptedPackage stream too short".to_string(),
        ));
    }
    let size = u64::from_le_bytes(stream[..8].try_into().expect("checked length")) as usize;
    Ok((size, &stream[8..]))
}

fn truncate_package(plain: &mut Vec<u8>, size: usize) -> Result<()> {
    if plain.len() < size {
        return Err(Error::MalformedStructure(format!(
            "package declares {size} bytes but only {} decrypted",
            plain.len()
        )));
    }
    plain.truncate(size);
    Ok(())
}

/// Little-endian byte stream cursor for the binary descriptor.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(Error::MalformedStructure(
                "truncated EncryptionInfo stream".to_string(),
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().expect("len 2")))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().expect("len 4")))
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

// XML helpers tolerant of namespace prefixes.

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn child<'a>(elem: &'a XmlElement, want: &str) -> Result<&'a XmlElement> {
    elem.elements()
        .find(|e| local_name(&e.name) == want)
        .ok_or_else(|| Error::MalformedStructure(format!("descriptor missing {want} element")))
}

fn base64_attr(elem: &XmlElement, name: &str) -> Result<Vec<u8>> {
    let value = elem.attribute(name).ok_or_else(|| {
        Error::MalformedStructure(format!("descriptor missing {name} attribute"))
    })?;
    crypto::base64_decode(value)
}

fn number_attr(elem: &XmlElement, name: &str) -> Result<usize> {
    let value = elem.attribute(name).ok_or_else(|| {
        Error::MalformedStructure(format!("descriptor missing {name} attribute"))
    })?;
    value
        .trim()
        .parse()
        .map_err(|_| Error::MalformedStructure(format!("invalid {name} attribute")))
}

#[cfg(test)]
pub(crate) mod testfix {
    //! Forward-direction stream builders shared with the facade tests.

    use super::*;
    use crate::crypto::testutil::{encrypt_aes_ecb, pad_to_block};

    /// Standard-scheme `EncryptionInfo` and `EncryptedPackage` streams.
    pub(crate) fn standard_streams(password: &str, plain: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let salt = [0x11u8; 16];
        let key = standard_key(password, &salt, 16);
        (
            standard_info_bytes(&salt, &key),
            standard_package(&key, plain),
        )
    }

    pub(crate) fn standard_info_bytes(salt: &[u8; 16], key: &[u8]) -> Vec<u8> {
        let verifier = [0xABu8; 16];
        let verifier_hash = pad_to_block(&crypto::sha1(&verifier), 16);

        let csp: Vec<u8> = "Microsoft Enhanced RSA and AES Cryptographic Provider\0"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3u16.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&0x24u32.to_le_bytes()); // flags
        bytes.extend_from_slice(&((32 + csp.len()) as u32).to_le_bytes());
        // header
        bytes.extend_from_slice(&0x24u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0x660Eu32.to_le_bytes()); // AES-128
        bytes.extend_from_slice(&0x8004u32.to_le_bytes()); // SHA-1
        bytes.extend_from_slice(&128u32.to_le_bytes());
        bytes.extend_from_slice(&0x18u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&csp);
        // verifier
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(salt);
        bytes.extend_from_slice(&encrypt_aes_ecb(key, &verifier));
        bytes.extend_from_slice(&20u32.to_le_bytes());
        bytes.extend_from_slice(&encrypt_aes_ecb(key, &verifier_hash));
        bytes
    }

    pub(crate) fn standard_package(key: &[u8], plain: &[u8]) -> Vec<u8> {
        let mut stream = (plain.len() as u64).to_le_bytes().to_vec();
        stream.extend_from_slice(&encrypt_aes_ecb(key, &pad_to_block(plain, 16)));
        stream
    }
}
