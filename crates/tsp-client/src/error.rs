//! Error types for tsp-client

use std::time::Duration;
use thiserror::Error;
use tsp_types::HashAlgorithm;

/// Errors that can occur in Time-Stamp Protocol operations
#[derive(Error, Debug)]
pub enum Error {
    /// The caller supplied an unusable digest, algorithm or setting
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The authority answered with a non-200 HTTP status
    #[error("Timestamp authority returned HTTP status {status}")]
    Authority { status: u16 },

    /// The HTTP exchange broke the RFC 3161 transport contract
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The response body is not a usable answer to the request
    #[error("Malformed timestamp response: {0}")]
    MalformedResponse(String),

    /// The authority refused the request (PKIStatus other than granted)
    #[error("Timestamp authority rejected the request with status {status}: {fail_info}")]
    Rejected { status: u8, fail_info: String },

    /// The token does not prove the submitted hash
    #[error("Timestamp could not be verified for {algorithm} hash {hash}: {reason}")]
    Verification {
        hash: String,
        algorithm: HashAlgorithm,
        reason: String,
    },

    /// Persisted token text could not be decoded
    #[error("Failed to decode timestamp token: {0}")]
    Decode(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The caller cancelled the exchange
    #[error("Timestamp request was cancelled")]
    Cancelled,

    /// The authority did not answer within the configured timeout
    #[error("Timestamp request timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// ASN.1 encoding error
    #[error("ASN.1 error: {0}")]
    Asn1(String),
}

impl From<tsp_types::Error> for Error {
    fn from(err: tsp_types::Error) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

/// Result type for Time-Stamp Protocol operations
pub type Result<T> = std::result::Result<T, Error>;
