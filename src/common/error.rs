//! Unified error types for pomelo.
//!
//! This module provides a single error type spanning container probing,
//! decryption, and translation, presenting a consistent API to users.
use thiserror::Error;

/// Main error type for pomelo operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No sniffer recognized the byte stream
    #[error("not a recognized office document")]
    UnknownFormat,

    /// A container probe was run against the wrong container type.
    ///
    /// This is a soft signal: the detector catches it and falls through to
    /// the next sniffer. It only escapes when every sniffer has been tried.
    #[error("not a {0} container")]
    FormatMismatch(&'static str),

    /// Key verification failed; the caller may retry with another password
    #[error("wrong password")]
    WrongPassword,

    /// Operation not available for this document variant
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Encryption descriptor names an algorithm we do not implement
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Required stream or attribute missing where the format mandates it
    #[error("malformed structure: {0}")]
    MalformedStructure(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(String),

    /// Compound file error
    #[error("compound file error: {0}")]
    Cfb(String),
}

/// Result type for pomelo operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the caller may meaningfully retry the failed operation
    /// (currently only true for a failed password check).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::WrongPassword)
    }
}
