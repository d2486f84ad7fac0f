//! RFC 3161 timestamp verification
//!
//! This module provides full verification of RFC 3161 timestamps including:
//! - Message imprint validation against the submitted hash
//! - CMS signature verification (ECDSA, RSA PKCS#1 v1.5 and RSA-PSS)
//! - TSA certificate validity at the generation time
//! - Optional certificate chain validation with the TimeStamping EKU

use crate::asn1;
use crate::error::{Error, Result};
use crate::token::{extract_certificates, TimestampToken};
use chrono::{DateTime, Utc};
use cms::signed_data::{SignedData, SignerIdentifier};
use const_oid::ObjectIdentifier;
use der::asn1::OctetStringRef;
use der::{Decode, Encode};
use rustls_pki_types::{CertificateDer, UnixTime};
use tsp_crypto::SigningScheme;
use tsp_types::HashAlgorithm;
use x509_cert::attr::Attributes;
use x509_cert::Certificate;

use webpki::{anchor_from_trusted_cert, EndEntityCert, KeyUsage, ALL_VERIFICATION_ALGS};

const ID_KP_TIME_STAMPING: ObjectIdentifier = const_oid::db::rfc5280::ID_KP_TIME_STAMPING;
const ID_CE_SUBJECT_KEY_IDENTIFIER: ObjectIdentifier =
    const_oid::db::rfc5280::ID_CE_SUBJECT_KEY_IDENTIFIER;

/// Verification options for RFC 3161 timestamps
#[derive(Debug, Clone, Default)]
pub struct VerifyOpts {
    /// Root certificates for chain verification
    pub roots: Vec<CertificateDer<'static>>,

    /// Intermediate certificates for chain building
    pub intermediates: Vec<CertificateDer<'static>>,

    /// TSA certificate (optional if embedded in timestamp)
    pub tsa_certificate: Option<CertificateDer<'static>>,

    /// Validity period for the TSA in the trust configuration.
    /// If provided, the timestamp must fall within this period
    pub tsa_valid_for: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl VerifyOpts {
    /// Create new verification options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root certificate
    pub fn with_root(mut self, root: CertificateDer<'static>) -> Self {
        self.roots.push(root);
        self
    }

    /// Replace the root certificates
    pub fn with_roots(mut self, roots: Vec<CertificateDer<'static>>) -> Self {
        self.roots = roots;
        self
    }

    /// Add an intermediate certificate
    pub fn with_intermediate(mut self, intermediate: CertificateDer<'static>) -> Self {
        self.intermediates.push(intermediate);
        self
    }

    /// Replace the intermediate certificates
    pub fn with_intermediates(mut self, intermediates: Vec<CertificateDer<'static>>) -> Self {
        self.intermediates = intermediates;
        self
    }

    /// Set the TSA certificate
    pub fn with_tsa_certificate(mut self, cert: CertificateDer<'static>) -> Self {
        self.tsa_certificate = Some(cert);
        self
    }

    /// Set the TSA validity period
    pub fn with_tsa_validity(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.tsa_valid_for = Some((start, end));
        self
    }
}

/// Result of timestamp verification
#[derive(Debug, Clone)]
pub struct TimestampResult {
    /// The timestamp from the TSA
    pub time: DateTime<Utc>,
    /// The certificate whose key signed the token
    pub signer: Certificate,
    /// The scheme the signature verified under
    pub scheme: SigningScheme,
}

/// Why verification failed; folded into [`Error::Verification`]
type Failure = String;

/// Verify that `token` proves `hash` under `algorithm`.
///
/// This function:
/// 1. Checks the message imprint equals the submitted hash and algorithm
/// 2. Checks the generation time against the configured TSA validity window
/// 3. Verifies the CMS signature using the embedded or provided TSA certificate
/// 4. Checks the signer certificate was valid at the generation time
/// 5. Validates the TSA certificate chain to a trusted root, when roots are given
///
/// Every failure is reported as [`Error::Verification`].
pub fn verify_token(
    token: &TimestampToken,
    hash: &[u8],
    algorithm: HashAlgorithm,
    opts: &VerifyOpts,
) -> Result<TimestampResult> {
    tracing::debug!("Starting RFC 3161 timestamp verification");

    verify_inner(token, hash, algorithm, opts).map_err(|reason| Error::Verification {
        hash: hex::encode(hash),
        algorithm,
        reason,
    })
}

fn verify_inner(
    token: &TimestampToken,
    hash: &[u8],
    algorithm: HashAlgorithm,
    opts: &VerifyOpts,
) -> std::result::Result<TimestampResult, Failure> {
    verify_message_imprint(token, hash, algorithm)?;

    let timestamp = token.gen_time();
    tracing::debug!("Extracted timestamp: {}", timestamp);

    // Check that the timestamp is within the TSA validity period
    if let Some((start, end)) = opts.tsa_valid_for {
        if timestamp < start || timestamp > end {
            return Err(format!(
                "timestamp {} is outside TSA validity period ({} to {})",
                timestamp, start, end
            ));
        }
    }

    let tst_info_der = token
        .signed_data()
        .encap_content_info
        .econtent
        .as_ref()
        .ok_or_else(|| "token carries no TSTInfo".to_string())?
        .value();

    tracing::debug!("Starting CMS signature verification");
    let (signer_cert, scheme) = verify_cms_signature(token.signed_data(), tst_info_der, opts)?;
    tracing::debug!("CMS signature verified with {}", scheme);

    verify_certificate_validity(&signer_cert, timestamp)?;

    let embedded_certs = extract_certificates(token.signed_data());
    validate_tsa_certificate_chain(&signer_cert, timestamp, opts, &embedded_certs)?;

    Ok(TimestampResult {
        time: timestamp,
        signer: signer_cert,
        scheme,
    })
}

/// Verify the message imprint matches the submitted hash and algorithm
fn verify_message_imprint(
    token: &TimestampToken,
    hash: &[u8],
    algorithm: HashAlgorithm,
) -> std::result::Result<(), Failure> {
    let asserted_oid = token.hash_algorithm_oid();
    if asserted_oid != algorithm.oid() {
        return Err(format!(
            "token asserts hash algorithm {}, expected {}",
            asserted_oid,
            algorithm.oid()
        ));
    }

    let asserted = token.hashed_message();
    if asserted != hash {
        return Err(format!(
            "message imprint mismatch: token asserts {}",
            hex::encode(asserted)
        ));
    }

    Ok(())
}

/// Re-encode signed attributes for signature verification.
///
/// RFC 5652: The signed attributes are stored with [0] IMPLICIT tag in SignerInfo,
/// but for signature verification they must be re-encoded as a generic SET OF.
/// This strips the [0] tag and applies the default SET (0x31) tag.
fn get_signed_attrs_for_verification(
    attrs: &Attributes,
) -> std::result::Result<Vec<u8>, Failure> {
    use der::asn1::SetOfVec;

    let attrs_vec: Vec<x509_cert::attr::Attribute> = attrs.iter().cloned().collect();
    let generic_set =
        SetOfVec::try_from(attrs_vec).map_err(|e| format!("failed to create SetOfVec: {}", e))?;

    generic_set
        .to_der()
        .map_err(|e| format!("failed to re-encode attributes: {}", e))
}

/// Verify the CMS signature and return the signer certificate
fn verify_cms_signature(
    signed_data: &SignedData,
    tst_info_der: &[u8],
    opts: &VerifyOpts,
) -> std::result::Result<(Certificate, SigningScheme), Failure> {
    // RFC 3161 2.4.2: exactly one signer, the TSA
    let signer_info = match signed_data.signer_infos.0.as_slice() {
        [single] => single,
        [] => return Err("no signer info found".to_string()),
        many => return Err(format!("expected one signer info, found {}", many.len())),
    };

    let mut all_certs = extract_certificates(signed_data);
    if let Some(tsa_cert) = &opts.tsa_certificate {
        let cert = Certificate::from_der(tsa_cert.as_ref())
            .map_err(|e| format!("failed to parse supplied TSA certificate: {}", e))?;
        all_certs.push(cert);
    }

    let signer_cert = find_signer_certificate(&signer_info.sid, &all_certs)?;

    let signed_attrs = signer_info
        .signed_attrs
        .as_ref()
        .ok_or_else(|| "no signed attributes found".to_string())?;

    let digest_algorithm = HashAlgorithm::from_oid(&signer_info.digest_alg.oid)
        .map_err(|e| format!("unsupported signer digest algorithm: {}", e))?;

    verify_content_type_attribute(signed_attrs)?;
    verify_message_digest_attribute(signed_attrs, tst_info_der, digest_algorithm)?;

    let signed_attrs_bytes = get_signed_attrs_for_verification(signed_attrs)?;

    let spki = &signer_cert.tbs_certificate.subject_public_key_info;
    let scheme = tsp_crypto::signing_scheme_for(
        spki,
        digest_algorithm,
        &signer_info.signature_algorithm.oid,
    )
    .map_err(|e| e.to_string())?;
    let public_key = tsp_crypto::public_key_bytes(spki).map_err(|e| e.to_string())?;

    tsp_crypto::verify_signature(
        public_key,
        &signed_attrs_bytes,
        signer_info.signature.as_bytes(),
        scheme,
    )
    .map_err(|e| e.to_string())?;

    Ok((signer_cert, scheme))
}

/// Find the signer certificate that matches the SignerIdentifier
fn find_signer_certificate(
    signer_id: &SignerIdentifier,
    certificates: &[Certificate],
) -> std::result::Result<Certificate, Failure> {
    match signer_id {
        SignerIdentifier::IssuerAndSerialNumber(issuer_serial) => certificates
            .iter()
            .find(|cert| {
                cert.tbs_certificate.issuer == issuer_serial.issuer
                    && cert.tbs_certificate.serial_number == issuer_serial.serial_number
            })
            .cloned()
            .ok_or_else(|| "no certificate matches issuer and serial number".to_string()),
        SignerIdentifier::SubjectKeyIdentifier(ski) => certificates
            .iter()
            .find(|cert| subject_key_identifier(cert).as_ref() == Some(ski))
            .cloned()
            .ok_or_else(|| "no certificate matches subject key identifier".to_string()),
    }
}

fn subject_key_identifier(
    cert: &Certificate,
) -> Option<x509_cert::ext::pkix::SubjectKeyIdentifier> {
    cert.tbs_certificate
        .extensions
        .as_ref()?
        .iter()
        .find(|ext| ext.extn_id == ID_CE_SUBJECT_KEY_IDENTIFIER)
        .and_then(|ext| {
            x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes()).ok()
        })
}

/// The single value of a signed attribute, re-encoded as DER
fn single_attribute_value(
    signed_attrs: &Attributes,
    oid: ObjectIdentifier,
    name: &str,
) -> std::result::Result<Vec<u8>, Failure> {
    let attr = signed_attrs
        .iter()
        .find(|attr| attr.oid == oid)
        .ok_or_else(|| format!("{} attribute not found in signed_attrs", name))?;

    if attr.values.len() != 1 {
        return Err(format!("{} attribute should have exactly one value", name));
    }

    attr.values
        .get(0)
        .ok_or_else(|| format!("failed to get {} attribute value", name))?
        .to_der()
        .map_err(|e| format!("failed to encode {} attribute value: {}", name, e))
}

/// The content-type attribute must name TSTInfo
fn verify_content_type_attribute(signed_attrs: &Attributes) -> std::result::Result<(), Failure> {
    let value_der = single_attribute_value(signed_attrs, asn1::OID_CONTENT_TYPE, "content-type")?;
    let content_type = ObjectIdentifier::from_der(&value_der)
        .map_err(|e| format!("failed to decode content-type as OID: {}", e))?;

    if content_type != asn1::OID_TST_INFO {
        return Err(format!(
            "content-type attribute is {}, expected TSTInfo",
            content_type
        ));
    }

    Ok(())
}

/// Verify the message-digest attribute in signed_attrs matches the TSTInfo content
fn verify_message_digest_attribute(
    signed_attrs: &Attributes,
    tst_info_der: &[u8],
    digest_algorithm: HashAlgorithm,
) -> std::result::Result<(), Failure> {
    let value_der =
        single_attribute_value(signed_attrs, asn1::OID_MESSAGE_DIGEST, "message-digest")?;
    let message_digest = OctetStringRef::from_der(&value_der)
        .map_err(|e| format!("failed to decode message-digest as OCTET STRING: {}", e))?;

    let content_hash = tsp_crypto::digest(digest_algorithm, tst_info_der);

    if content_hash.as_slice() != message_digest.as_bytes() {
        return Err(format!(
            "message-digest attribute mismatch: expected {}, got {}",
            hex::encode(&content_hash),
            hex::encode(message_digest.as_bytes())
        ));
    }

    Ok(())
}

/// The signer certificate must be valid when the token was generated
fn verify_certificate_validity(
    signer_cert: &Certificate,
    timestamp: DateTime<Utc>,
) -> std::result::Result<(), Failure> {
    let (not_before, not_after) = tsp_crypto::validity_window(signer_cert);
    let at = timestamp.timestamp();

    if at < not_before || at > not_after {
        return Err(format!(
            "TSA certificate is not valid at {} (valid {} to {})",
            timestamp,
            DateTime::from_timestamp(not_before, 0).unwrap_or_default(),
            DateTime::from_timestamp(not_after, 0).unwrap_or_default()
        ));
    }

    Ok(())
}

/// Validate the TSA certificate chain
fn validate_tsa_certificate_chain(
    signer_cert: &Certificate,
    timestamp: DateTime<Utc>,
    opts: &VerifyOpts,
    embedded_certs: &[Certificate],
) -> std::result::Result<(), Failure> {
    // If no roots are provided, skip certificate chain validation
    if opts.roots.is_empty() {
        tracing::debug!("No trusted roots provided, skipping certificate chain validation");
        return Ok(());
    }

    let signer_cert_der = signer_cert
        .to_der()
        .map_err(|e| format!("failed to encode signer certificate to DER: {}", e))?;
    let signer_cert_der = CertificateDer::from(signer_cert_der);
    let end_entity_cert = EndEntityCert::try_from(&signer_cert_der)
        .map_err(|e| format!("failed to parse end-entity certificate: {}", e))?;

    let trust_anchors = opts
        .roots
        .iter()
        .map(|cert| {
            anchor_from_trusted_cert(cert)
                .map(|anchor| anchor.to_owned())
                .map_err(|e| format!("failed to create trust anchor: {}", e))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut intermediate_ders: Vec<CertificateDer<'static>> = Vec::new();
    for cert in embedded_certs.iter().filter(|cert| *cert != signer_cert) {
        let cert_der = cert
            .to_der()
            .map_err(|e| format!("failed to encode embedded certificate to DER: {}", e))?;
        intermediate_ders.push(CertificateDer::from(cert_der));
    }
    intermediate_ders.extend(opts.intermediates.iter().cloned());

    tracing::debug!(
        "Verifying certificate chain at {} with {} intermediate cert(s)",
        timestamp,
        intermediate_ders.len()
    );

    let verification_time =
        UnixTime::since_unix_epoch(std::time::Duration::from_secs(timestamp.timestamp() as u64));

    end_entity_cert
        .verify_for_usage(
            ALL_VERIFICATION_ALGS,
            &trust_anchors,
            &intermediate_ders,
            verification_time,
            KeyUsage::required(ID_KP_TIME_STAMPING.as_bytes()),
            None, // No revocation checking
            None, // No path verification callback
        )
        .map_err(|e| format!("TSA certificate chain validation failed: {}", e))?;

    tracing::debug!("TSA certificate chain validated successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_opts_builder() {
        let start = DateTime::from_timestamp(0, 0).unwrap();
        let end = DateTime::from_timestamp(1_000, 0).unwrap();
        let opts = VerifyOpts::new()
            .with_root(CertificateDer::from(vec![1u8]))
            .with_intermediate(CertificateDer::from(vec![2u8]))
            .with_tsa_certificate(CertificateDer::from(vec![3u8]))
            .with_tsa_validity(start, end);

        assert_eq!(opts.roots.len(), 1);
        assert_eq!(opts.intermediates.len(), 1);
        assert!(opts.tsa_certificate.is_some());
        assert_eq!(opts.tsa_valid_for, Some((start, end)));

        let opts = opts.with_roots(Vec::new()).with_intermediates(Vec::new());
        assert!(opts.roots.is_empty());
        assert!(opts.intermediates.is_empty());
    }

    #[test]
    fn test_find_signer_without_certificates() {
        let sid = SignerIdentifier::SubjectKeyIdentifier(
            x509_cert::ext::pkix::SubjectKeyIdentifier(
                der::asn1::OctetString::new(vec![1, 2, 3]).unwrap(),
            ),
        );
        let err = find_signer_certificate(&sid, &[]).unwrap_err();
        assert!(err.contains("subject key identifier"));
    }

    #[test]
    fn test_message_digest_mismatch_reports_computed_as_expected() {
        use der::asn1::{OctetString, SetOfVec};
        use x509_cert::attr::Attribute;

        let stated = vec![0xaau8; 32];
        let attrs: Attributes = SetOfVec::try_from(vec![Attribute {
            oid: asn1::OID_MESSAGE_DIGEST,
            values: SetOfVec::try_from(vec![
                der::Any::encode_from(&OctetString::new(stated.clone()).unwrap()).unwrap(),
            ])
            .unwrap(),
        }])
        .unwrap();

        let err =
            verify_message_digest_attribute(&attrs, b"tstinfo", HashAlgorithm::Sha2256)
                .unwrap_err();
        let computed = hex::encode(tsp_crypto::sha256(b"tstinfo"));
        assert_eq!(
            err,
            format!(
                "message-digest attribute mismatch: expected {}, got {}",
                computed,
                hex::encode(&stated)
            )
        );

        let matching: Attributes = SetOfVec::try_from(vec![Attribute {
            oid: asn1::OID_MESSAGE_DIGEST,
            values: SetOfVec::try_from(vec![der::Any::encode_from(
                &OctetString::new(tsp_crypto::sha256(b"tstinfo").to_vec()).unwrap(),
            )
            .unwrap()])
            .unwrap(),
        }])
        .unwrap();
        verify_message_digest_attribute(&matching, b"tstinfo", HashAlgorithm::Sha2256).unwrap();
    }
}
