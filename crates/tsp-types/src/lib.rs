//! Core types for the RFC 3161 Time-Stamp Protocol client
//!
//! This crate provides the hash algorithm and digest types shared by the
//! crypto and protocol crates, plus small encoding newtypes.

pub mod encoding;
pub mod error;
pub mod hash;

pub use encoding::{Base64, Hex};
pub use error::{Error, Result};
pub use hash::{hex_bytes, HashAlgorithm, HashOutput, OID_SHA256, OID_SHA384, OID_SHA512};
