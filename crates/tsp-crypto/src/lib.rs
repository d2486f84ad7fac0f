//! Cryptographic primitives for the RFC 3161 client
//!
//! This crate provides hashing, signature verification and certificate
//! helpers using aws-lc-rs as the cryptographic backend.

pub mod error;
pub mod hash;
pub mod signing;
pub mod verification;
pub mod x509;

pub use error::{Error, Result};
pub use hash::{digest, sha256, Hasher};
pub use signing::{KeyPair, Signature, SigningScheme};
pub use verification::{verify_signature, VerificationKey};
pub use x509::{certificates_from_pem, public_key_bytes, signing_scheme_for, validity_window};
