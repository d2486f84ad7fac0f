//! Error types for tsp-types

use thiserror::Error;

/// Errors that can occur in tsp-types
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid hash algorithm
    #[error("Invalid hash algorithm: {0}")]
    InvalidHashAlgorithm(String),

    /// Digest bytes do not fit the algorithm
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    /// Base64 or hex decoding error
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// Result type for tsp-types operations
pub type Result<T> = std::result::Result<T, Error>;
