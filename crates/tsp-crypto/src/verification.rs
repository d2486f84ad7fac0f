//! Signature verification using aws-lc-rs

use crate::error::{Error, Result};
use crate::signing::SigningScheme;
use aws_lc_rs::signature::{
    UnparsedPublicKey, VerificationAlgorithm, ECDSA_P256_SHA256_ASN1, ECDSA_P256_SHA384_ASN1,
    ECDSA_P384_SHA256_ASN1, ECDSA_P384_SHA384_ASN1, ECDSA_P521_SHA512_ASN1, ED25519,
    RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512,
    RSA_PSS_2048_8192_SHA256, RSA_PSS_2048_8192_SHA384, RSA_PSS_2048_8192_SHA512,
};

fn verification_algorithm(scheme: SigningScheme) -> &'static dyn VerificationAlgorithm {
    match scheme {
        SigningScheme::EcdsaP256Sha256 => &ECDSA_P256_SHA256_ASN1,
        SigningScheme::EcdsaP256Sha384 => &ECDSA_P256_SHA384_ASN1,
        SigningScheme::EcdsaP384Sha256 => &ECDSA_P384_SHA256_ASN1,
        SigningScheme::EcdsaP384Sha384 => &ECDSA_P384_SHA384_ASN1,
        SigningScheme::EcdsaP521Sha512 => &ECDSA_P521_SHA512_ASN1,
        SigningScheme::Ed25519 => &ED25519,
        SigningScheme::RsaPssSha256 => &RSA_PSS_2048_8192_SHA256,
        SigningScheme::RsaPssSha384 => &RSA_PSS_2048_8192_SHA384,
        SigningScheme::RsaPssSha512 => &RSA_PSS_2048_8192_SHA512,
        SigningScheme::RsaPkcs1Sha256 => &RSA_PKCS1_2048_8192_SHA256,
        SigningScheme::RsaPkcs1Sha384 => &RSA_PKCS1_2048_8192_SHA384,
        SigningScheme::RsaPkcs1Sha512 => &RSA_PKCS1_2048_8192_SHA512,
    }
}

/// A public key for verification
pub struct VerificationKey {
    /// Raw public key bytes (EC point, Ed25519 key, or PKCS#1 RSAPublicKey)
    pub bytes: Vec<u8>,
    /// The scheme to use for verification
    pub scheme: SigningScheme,
}

impl VerificationKey {
    /// Create a new verification key
    pub fn new(bytes: Vec<u8>, scheme: SigningScheme) -> Self {
        Self { bytes, scheme }
    }

    /// Verify a signature over data
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        UnparsedPublicKey::new(verification_algorithm(self.scheme), &self.bytes)
            .verify(data, signature)
            .map_err(|_| Error::Verification(format!("{} signature invalid", self.scheme)))
    }
}

/// Verify a signature using the specified scheme
pub fn verify_signature(
    public_key: &[u8],
    data: &[u8],
    signature: &[u8],
    scheme: SigningScheme,
) -> Result<()> {
    let key = VerificationKey::new(public_key.to_vec(), scheme);
    key.verify(data, signature)
}
