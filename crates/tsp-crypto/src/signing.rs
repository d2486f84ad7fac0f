//! Signing schemes and key pairs using aws-lc-rs
//!
//! The client never signs anything on the wire; key pairs exist so that
//! callers (and the test suites) can produce tokens with a known signer.

use crate::error::{Error, Result};
use aws_lc_rs::{
    rand::SystemRandom,
    rsa::KeySize,
    signature::{
        EcdsaKeyPair, KeyPair as AwsKeyPair, RsaEncoding, RsaKeyPair,
        ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA384_ASN1_SIGNING, RSA_PKCS1_SHA256,
        RSA_PKCS1_SHA384, RSA_PKCS1_SHA512, RSA_PSS_SHA256, RSA_PSS_SHA384, RSA_PSS_SHA512,
    },
};
use const_oid::db::rfc5912::{ID_EC_PUBLIC_KEY, RSA_ENCRYPTION, SECP_256_R_1, SECP_384_R_1};
use der::asn1::{BitString, Null};
use der::Encode;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

/// A cryptographic signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Create a new Signature from raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw signature bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the inner bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Get the length of the signature in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the signature is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Supported signing schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    /// ECDSA P-256 with SHA-256
    EcdsaP256Sha256,
    /// ECDSA P-256 with SHA-384
    EcdsaP256Sha384,
    /// ECDSA P-384 with SHA-256
    EcdsaP384Sha256,
    /// ECDSA P-384 with SHA-384
    EcdsaP384Sha384,
    /// ECDSA P-521 with SHA-512
    EcdsaP521Sha512,
    /// Ed25519
    Ed25519,
    /// RSA PSS with SHA-256
    RsaPssSha256,
    /// RSA PSS with SHA-384
    RsaPssSha384,
    /// RSA PSS with SHA-512
    RsaPssSha512,
    /// RSA PKCS#1 v1.5 with SHA-256
    RsaPkcs1Sha256,
    /// RSA PKCS#1 v1.5 with SHA-384
    RsaPkcs1Sha384,
    /// RSA PKCS#1 v1.5 with SHA-512
    RsaPkcs1Sha512,
}

impl SigningScheme {
    /// Get the name of this scheme
    pub fn name(&self) -> &'static str {
        match self {
            SigningScheme::EcdsaP256Sha256 => "ECDSA_P256_SHA256",
            SigningScheme::EcdsaP256Sha384 => "ECDSA_P256_SHA384",
            SigningScheme::EcdsaP384Sha256 => "ECDSA_P384_SHA256",
            SigningScheme::EcdsaP384Sha384 => "ECDSA_P384_SHA384",
            SigningScheme::EcdsaP521Sha512 => "ECDSA_P521_SHA512",
            SigningScheme::Ed25519 => "ED25519",
            SigningScheme::RsaPssSha256 => "RSA_PSS_SHA256",
            SigningScheme::RsaPssSha384 => "RSA_PSS_SHA384",
            SigningScheme::RsaPssSha512 => "RSA_PSS_SHA512",
            SigningScheme::RsaPkcs1Sha256 => "RSA_PKCS1_SHA256",
            SigningScheme::RsaPkcs1Sha384 => "RSA_PKCS1_SHA384",
            SigningScheme::RsaPkcs1Sha512 => "RSA_PKCS1_SHA512",
        }
    }
}

impl std::fmt::Display for SigningScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A key pair for signing
pub enum KeyPair {
    /// ECDSA P-256 key pair
    EcdsaP256(EcdsaKeyPair),
    /// ECDSA P-384 key pair
    EcdsaP384(EcdsaKeyPair),
    /// RSA key pair
    Rsa(RsaKeyPair),
}

impl KeyPair {
    /// Generate a new ECDSA P-256 key pair
    pub fn generate_ecdsa_p256() -> Result<Self> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .map_err(|_| Error::KeyGeneration("failed to generate ECDSA P-256 key".to_string()))?;
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref())?;
        Ok(KeyPair::EcdsaP256(key_pair))
    }

    /// Generate a new ECDSA P-384 key pair
    pub fn generate_ecdsa_p384() -> Result<Self> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P384_SHA384_ASN1_SIGNING, &rng)
            .map_err(|_| Error::KeyGeneration("failed to generate ECDSA P-384 key".to_string()))?;
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P384_SHA384_ASN1_SIGNING, pkcs8.as_ref())?;
        Ok(KeyPair::EcdsaP384(key_pair))
    }

    /// Generate a new 2048-bit RSA key pair
    pub fn generate_rsa_2048() -> Result<Self> {
        let key_pair = RsaKeyPair::generate(KeySize::Rsa2048)
            .map_err(|_| Error::KeyGeneration("failed to generate RSA key".to_string()))?;
        Ok(KeyPair::Rsa(key_pair))
    }

    /// Get the public key bytes.
    ///
    /// An uncompressed point for EC keys, a PKCS#1 RSAPublicKey for RSA.
    pub fn public_key_bytes(&self) -> &[u8] {
        match self {
            KeyPair::EcdsaP256(kp) | KeyPair::EcdsaP384(kp) => kp.public_key().as_ref(),
            KeyPair::Rsa(kp) => kp.public_key().as_ref(),
        }
    }

    /// Sign data with this key pair's default scheme
    pub fn sign(&self, data: &[u8]) -> Result<Signature> {
        self.sign_with(self.default_scheme(), data)
    }

    /// Sign data under an explicit scheme.
    ///
    /// ECDSA keys are bound to their curve's default hash; RSA keys accept any
    /// PKCS#1 v1.5 or PSS scheme.
    pub fn sign_with(&self, scheme: SigningScheme, data: &[u8]) -> Result<Signature> {
        let rng = SystemRandom::new();
        match self {
            KeyPair::EcdsaP256(kp) | KeyPair::EcdsaP384(kp) => {
                if scheme != self.default_scheme() {
                    return Err(Error::UnsupportedAlgorithm(format!(
                        "{} key cannot sign with {}",
                        self.default_scheme(),
                        scheme
                    )));
                }
                let sig = kp.sign(&rng, data)?;
                Ok(Signature::new(sig.as_ref().to_vec()))
            }
            KeyPair::Rsa(kp) => {
                let encoding = rsa_encoding(scheme)?;
                let mut sig = vec![0u8; kp.public_modulus_len()];
                kp.sign(encoding, &rng, data, &mut sig)
                    .map_err(|_| Error::Signing(format!("{} signing failed", scheme)))?;
                Ok(Signature::new(sig))
            }
        }
    }

    /// Get the signing scheme for this key pair
    pub fn default_scheme(&self) -> SigningScheme {
        match self {
            KeyPair::EcdsaP256(_) => SigningScheme::EcdsaP256Sha256,
            KeyPair::EcdsaP384(_) => SigningScheme::EcdsaP384Sha384,
            KeyPair::Rsa(_) => SigningScheme::RsaPkcs1Sha256,
        }
    }

    /// Get the public key as a SubjectPublicKeyInfo
    pub fn subject_public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let algorithm = match self {
            KeyPair::EcdsaP256(_) => AlgorithmIdentifierOwned {
                oid: ID_EC_PUBLIC_KEY,
                parameters: Some(der::Any::encode_from(&SECP_256_R_1)?),
            },
            KeyPair::EcdsaP384(_) => AlgorithmIdentifierOwned {
                oid: ID_EC_PUBLIC_KEY,
                parameters: Some(der::Any::encode_from(&SECP_384_R_1)?),
            },
            KeyPair::Rsa(_) => AlgorithmIdentifierOwned {
                oid: RSA_ENCRYPTION,
                parameters: Some(der::Any::encode_from(&Null)?),
            },
        };

        Ok(SubjectPublicKeyInfoOwned {
            algorithm,
            subject_public_key: BitString::from_bytes(self.public_key_bytes())?,
        })
    }

    /// Get the public key in DER-encoded SubjectPublicKeyInfo format
    pub fn public_key_to_der(&self) -> Result<Vec<u8>> {
        Ok(self.subject_public_key_info()?.to_der()?)
    }
}

fn rsa_encoding(scheme: SigningScheme) -> Result<&'static dyn RsaEncoding> {
    Ok(match scheme {
        SigningScheme::RsaPkcs1Sha256 => &RSA_PKCS1_SHA256,
        SigningScheme::RsaPkcs1Sha384 => &RSA_PKCS1_SHA384,
        SigningScheme::RsaPkcs1Sha512 => &RSA_PKCS1_SHA512,
        SigningScheme::RsaPssSha256 => &RSA_PSS_SHA256,
        SigningScheme::RsaPssSha384 => &RSA_PSS_SHA384,
        SigningScheme::RsaPssSha512 => &RSA_PSS_SHA512,
        other => {
            return Err(Error::UnsupportedAlgorithm(format!(
                "RSA key cannot sign with {}",
                other
            )))
        }
    })
}
