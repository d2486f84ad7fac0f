//! Type-safe encoding wrappers
//!
//! Newtypes around encoded text so that base64 token text and hex digests
//! are not confused with each other or with raw strings.

use crate::error::{Error, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Base64-encoded data
///
/// This type represents data that is base64-encoded (standard alphabet).
/// It provides safe conversion to/from raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Base64(String);

impl Base64 {
    /// Create a new Base64 wrapper from a string
    ///
    /// Note: This does not validate the base64 encoding.
    /// Use `decode()` to validate and extract bytes.
    pub fn new(s: String) -> Self {
        Base64(s)
    }

    /// Create a Base64 wrapper from raw bytes
    pub fn encode(bytes: &[u8]) -> Self {
        Base64(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// Decode the base64 string to bytes
    ///
    /// Surrounding whitespace is ignored.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.0.trim())
            .map_err(|e| Error::InvalidEncoding(format!("invalid base64: {}", e)))
    }

    /// Get the underlying string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the underlying String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Base64 {
    fn from(s: String) -> Self {
        Base64(s)
    }
}

impl From<&str> for Base64 {
    fn from(s: &str) -> Self {
        Base64(s.to_string())
    }
}

impl AsRef<str> for Base64 {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Base64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hex-encoded data
///
/// This type represents data that is hex-encoded (lowercase).
/// It provides safe conversion to/from raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hex(String);

impl Hex {
    /// Create a new Hex wrapper from a string
    ///
    /// Note: This does not validate the hex encoding.
    /// Use `decode()` to validate and extract bytes.
    pub fn new(s: String) -> Self {
        Hex(s)
    }

    /// Create a Hex wrapper from raw bytes
    pub fn encode(bytes: &[u8]) -> Self {
        Hex(hex::encode(bytes))
    }

    /// Decode the hex string to bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        hex::decode(self.0.trim())
            .map_err(|e| Error::InvalidEncoding(format!("invalid hex: {}", e)))
    }

    /// Get the underlying string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Hex {
    fn from(s: String) -> Self {
        Hex(s)
    }
}

impl AsRef<str> for Hex {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
