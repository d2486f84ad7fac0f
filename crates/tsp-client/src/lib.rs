//! RFC 3161 Time-Stamp Protocol client
//!
//! This crate implements the Time-Stamp Protocol as specified in RFC 3161,
//! including request creation, the HTTP exchange, token verification and
//! base64 token interchange.
//!
//! ```no_run
//! use tsp_client::{ClientConfig, TimestampClient, TimestampRequest};
//! use tsp_types::HashAlgorithm;
//!
//! # async fn run() -> tsp_client::Result<()> {
//! let client = TimestampClient::new(ClientConfig::freetsa())?;
//! let request = TimestampRequest::for_data(b"hello world", HashAlgorithm::Sha2256)?;
//! let token = client.request_timestamp(&request).await?;
//! println!("{}", token.to_base64());
//! # Ok(())
//! # }
//! ```

pub mod asn1;
pub mod client;
pub mod config;
pub mod error;
pub mod interchange;
pub mod nonce;
pub mod request;
pub mod token;
pub mod transport;
pub mod verify;

pub use asn1::{
    AlgorithmIdentifier, Asn1MessageImprint, PkiStatus, TimeStampReq, TimeStampResp, TstInfo,
};
pub use client::{RequestState, TimestampClient};
pub use config::{ClientConfig, DEFAULT_TIMEOUT, DEFAULT_TSA_URL, SIGSTORE_TSA_URL};
pub use error::{Error, Result};
pub use interchange::TimestampedDigest;
pub use nonce::{Nonce, NONCE_LEN};
pub use request::TimestampRequest;
pub use token::TimestampToken;
pub use transport::{
    HttpTransport, Transport, TransportFuture, TransportResponse, REQUEST_CONTENT_TYPE,
    RESPONSE_CONTENT_TYPE,
};
pub use verify::{verify_token, TimestampResult, VerifyOpts};
