//! Hash algorithm types and utilities

use crate::error::{Error, Result};
use const_oid::ObjectIdentifier;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// OID for SHA-256: 2.16.840.1.101.3.4.2.1
pub const OID_SHA256: ObjectIdentifier = const_oid::db::rfc5912::ID_SHA_256;

/// OID for SHA-384: 2.16.840.1.101.3.4.2.2
pub const OID_SHA384: ObjectIdentifier = const_oid::db::rfc5912::ID_SHA_384;

/// OID for SHA-512: 2.16.840.1.101.3.4.2.3
pub const OID_SHA512: ObjectIdentifier = const_oid::db::rfc5912::ID_SHA_512;

/// Digest OIDs we recognise but refuse to timestamp with.
const WEAK_DIGESTS: &[(ObjectIdentifier, &str)] = &[
    (ObjectIdentifier::new_unwrap("1.2.840.113549.2.5"), "MD5"),
    (ObjectIdentifier::new_unwrap("1.3.14.3.2.26"), "SHA-1"),
];

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA2-256
    #[serde(rename = "SHA2_256")]
    Sha2256,
    /// SHA2-384
    #[serde(rename = "SHA2_384")]
    Sha2384,
    /// SHA2-512
    #[serde(rename = "SHA2_512")]
    Sha2512,
}

impl HashAlgorithm {
    /// Get the digest size in bytes for this algorithm
    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha2256 => 32,
            HashAlgorithm::Sha2384 => 48,
            HashAlgorithm::Sha2512 => 64,
        }
    }

    /// Get the OID for this algorithm
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha2256 => OID_SHA256,
            HashAlgorithm::Sha2384 => OID_SHA384,
            HashAlgorithm::Sha2512 => OID_SHA512,
        }
    }

    /// Look up an algorithm by its OID.
    ///
    /// Weak digests (MD5, SHA-1) and unknown OIDs are rejected.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        match *oid {
            OID_SHA256 => Ok(HashAlgorithm::Sha2256),
            OID_SHA384 => Ok(HashAlgorithm::Sha2384),
            OID_SHA512 => Ok(HashAlgorithm::Sha2512),
            _ => match WEAK_DIGESTS.iter().find(|(weak, _)| weak == oid) {
                Some((_, name)) => Err(Error::InvalidHashAlgorithm(format!(
                    "{} ({}) is too weak for timestamping",
                    name, oid
                ))),
                None => Err(Error::InvalidHashAlgorithm(format!(
                    "unsupported hash algorithm OID: {}",
                    oid
                ))),
            },
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha2256 => write!(f, "SHA2_256"),
            HashAlgorithm::Sha2384 => write!(f, "SHA2_384"),
            HashAlgorithm::Sha2512 => write!(f, "SHA2_512"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    /// Accepts the serde names (`SHA2_256`) as well as the common spellings
    /// `sha256` and `SHA-256`, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "sha256" | "sha2256" => Ok(HashAlgorithm::Sha2256),
            "sha384" | "sha2384" => Ok(HashAlgorithm::Sha2384),
            "sha512" | "sha2512" => Ok(HashAlgorithm::Sha2512),
            "sha1" | "md5" => Err(Error::InvalidHashAlgorithm(format!(
                "{} is too weak for timestamping",
                s
            ))),
            _ => Err(Error::InvalidHashAlgorithm(format!(
                "unknown hash algorithm: {}",
                s
            ))),
        }
    }
}

/// A hash output with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashOutput {
    /// The algorithm used to produce this hash
    pub algorithm: HashAlgorithm,
    /// The hash digest bytes (hex encoded in JSON)
    #[serde(with = "crate::hex_bytes")]
    pub digest: Vec<u8>,
}

impl HashOutput {
    /// Create a new hash output
    pub fn new(algorithm: HashAlgorithm, digest: Vec<u8>) -> Self {
        Self { algorithm, digest }
    }

    /// Create a hash output, checking that the digest is non-empty and has
    /// the length the algorithm produces
    pub fn try_new(algorithm: HashAlgorithm, digest: Vec<u8>) -> Result<Self> {
        if digest.is_empty() {
            return Err(Error::InvalidDigest("digest is empty".to_string()));
        }
        if digest.len() != algorithm.digest_size() {
            return Err(Error::InvalidDigest(format!(
                "{} digest must be {} bytes, got {}",
                algorithm,
                algorithm.digest_size(),
                digest.len()
            )));
        }
        Ok(Self { algorithm, digest })
    }

    /// Get the digest as a hex string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

/// Serde helper for hex encoding/decoding of byte arrays
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
