//! X.509 certificate utilities
//!
//! Helpers for getting from a TSA certificate to something aws-lc-rs can
//! verify with, and for loading certificates from PEM files.

use crate::error::{Error, Result};
use crate::signing::SigningScheme;
use const_oid::db::rfc5912::{
    ID_EC_PUBLIC_KEY, ID_RSASSA_PSS, RSA_ENCRYPTION, SECP_256_R_1, SECP_384_R_1, SECP_521_R_1,
};
use const_oid::db::rfc8410::ID_ED_25519;
use const_oid::ObjectIdentifier;
use tsp_types::HashAlgorithm;
use x509_cert::der::Decode;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::Certificate;

/// Pick the verification scheme for a signer.
///
/// The key type and curve come from the certificate's SubjectPublicKeyInfo,
/// the hash from the CMS SignerInfo digest algorithm. RSA keys use PSS only
/// when the signature algorithm says so, PKCS#1 v1.5 otherwise.
pub fn signing_scheme_for(
    spki: &SubjectPublicKeyInfoOwned,
    digest: HashAlgorithm,
    signature_algorithm: &ObjectIdentifier,
) -> Result<SigningScheme> {
    let alg_oid = spki.algorithm.oid;

    if alg_oid == ID_EC_PUBLIC_KEY {
        let params = spki.algorithm.parameters.as_ref().ok_or_else(|| {
            Error::InvalidCertificate("EC key missing curve parameters".to_string())
        })?;
        let curve = params.decode_as::<ObjectIdentifier>().map_err(|e| {
            Error::InvalidCertificate(format!("failed to decode curve OID: {}", e))
        })?;

        match (curve, digest) {
            (SECP_256_R_1, HashAlgorithm::Sha2256) => Ok(SigningScheme::EcdsaP256Sha256),
            (SECP_256_R_1, HashAlgorithm::Sha2384) => Ok(SigningScheme::EcdsaP256Sha384),
            (SECP_384_R_1, HashAlgorithm::Sha2256) => Ok(SigningScheme::EcdsaP384Sha256),
            (SECP_384_R_1, HashAlgorithm::Sha2384) => Ok(SigningScheme::EcdsaP384Sha384),
            (SECP_521_R_1, HashAlgorithm::Sha2512) => Ok(SigningScheme::EcdsaP521Sha512),
            _ => Err(Error::UnsupportedAlgorithm(format!(
                "unsupported curve/digest combination: {} / {}",
                curve, digest
            ))),
        }
    } else if alg_oid == RSA_ENCRYPTION || alg_oid == ID_RSASSA_PSS {
        let pss = *signature_algorithm == ID_RSASSA_PSS || alg_oid == ID_RSASSA_PSS;
        Ok(match (pss, digest) {
            (true, HashAlgorithm::Sha2256) => SigningScheme::RsaPssSha256,
            (true, HashAlgorithm::Sha2384) => SigningScheme::RsaPssSha384,
            (true, HashAlgorithm::Sha2512) => SigningScheme::RsaPssSha512,
            (false, HashAlgorithm::Sha2256) => SigningScheme::RsaPkcs1Sha256,
            (false, HashAlgorithm::Sha2384) => SigningScheme::RsaPkcs1Sha384,
            (false, HashAlgorithm::Sha2512) => SigningScheme::RsaPkcs1Sha512,
        })
    } else if alg_oid == ID_ED_25519 {
        Ok(SigningScheme::Ed25519)
    } else {
        Err(Error::UnsupportedAlgorithm(format!(
            "unsupported public key algorithm: {}",
            alg_oid
        )))
    }
}

/// The raw public key bytes aws-lc-rs expects for the key's algorithm
pub fn public_key_bytes(spki: &SubjectPublicKeyInfoOwned) -> Result<&[u8]> {
    spki.subject_public_key
        .as_bytes()
        .ok_or_else(|| Error::InvalidCertificate("invalid public key encoding".to_string()))
}

/// Certificate validity window as Unix timestamps (not before, not after)
pub fn validity_window(cert: &Certificate) -> (i64, i64) {
    let validity = &cert.tbs_certificate.validity;
    (
        validity.not_before.to_unix_duration().as_secs() as i64,
        validity.not_after.to_unix_duration().as_secs() as i64,
    )
}

/// Parse every `CERTIFICATE` block in a PEM bundle into DER bytes
pub fn certificates_from_pem(pem_text: &str) -> Result<Vec<Vec<u8>>> {
    let blocks = pem::parse_many(pem_text).map_err(|e| Error::Pem(e.to_string()))?;

    let certs: Vec<Vec<u8>> = blocks
        .into_iter()
        .filter(|block| {
            if block.tag() == "CERTIFICATE" {
                true
            } else {
                tracing::debug!("Skipping PEM block with tag {}", block.tag());
                false
            }
        })
        .map(|block| block.into_contents())
        .collect();

    if certs.is_empty() {
        return Err(Error::Pem("no CERTIFICATE blocks found".to_string()));
    }

    // Fail early on anything that isn't a certificate
    for der in &certs {
        Certificate::from_der(der)
            .map_err(|e| Error::InvalidCertificate(format!("failed to parse certificate: {}", e)))?;
    }

    Ok(certs)
}
