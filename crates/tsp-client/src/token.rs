//! Decoded timestamp tokens
//!
//! A token is the CMS ContentInfo the authority returns inside the
//! TimeStampResp. It keeps its original DER next to the decoded SignedData
//! and TSTInfo so it can be persisted byte-for-byte.

use crate::asn1::{self, Accuracy, TstInfo};
use crate::error::{Error, Result};
use crate::verify::{verify_token, TimestampResult, VerifyOpts};
use chrono::{DateTime, Utc};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::SignedData;
use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use tsp_types::HashAlgorithm;
use x509_cert::Certificate;

/// An RFC 3161 timestamp token
#[derive(Clone, Debug)]
pub struct TimestampToken {
    der: Vec<u8>,
    signed_data: SignedData,
    tst_info: TstInfo,
}

impl TimestampToken {
    /// Parse a token from its ContentInfo DER encoding
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::parse(der).map_err(Error::Decode)
    }

    pub(crate) fn parse(der: &[u8]) -> std::result::Result<Self, String> {
        let content_info = ContentInfo::from_der(der)
            .map_err(|e| format!("failed to decode ContentInfo: {}", e))?;

        if content_info.content_type != asn1::OID_SIGNED_DATA {
            return Err(format!(
                "ContentInfo content type {} is not SignedData",
                content_info.content_type
            ));
        }

        let signed_data_der = content_info
            .content
            .to_der()
            .map_err(|e| format!("failed to encode SignedData content: {}", e))?;
        let signed_data = SignedData::from_der(&signed_data_der)
            .map_err(|e| format!("failed to decode SignedData: {}", e))?;

        if signed_data.encap_content_info.econtent_type != asn1::OID_TST_INFO {
            return Err(format!(
                "encapsulated content type {} is not TSTInfo",
                signed_data.encap_content_info.econtent_type
            ));
        }

        // The eContent is an OCTET STRING wrapping the TSTInfo DER
        let tst_info = match &signed_data.encap_content_info.econtent {
            Some(content) => TstInfo::from_der(content.value())
                .map_err(|e| format!("failed to decode TSTInfo: {}", e))?,
            None => return Err("token carries no TSTInfo".to_string()),
        };

        Ok(Self {
            der: der.to_vec(),
            signed_data,
            tst_info,
        })
    }

    /// The token's ContentInfo DER encoding
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Consume the token, returning its DER encoding
    pub fn into_der(self) -> Vec<u8> {
        self.der
    }

    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    pub fn tst_info(&self) -> &TstInfo {
        &self.tst_info
    }

    /// The hash algorithm the token asserts, if it is one we support
    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        self.tst_info.message_imprint.hash_algorithm.to_hash_algorithm()
    }

    /// The hash algorithm OID exactly as asserted
    pub fn hash_algorithm_oid(&self) -> ObjectIdentifier {
        self.tst_info.message_imprint.hash_algorithm.algorithm
    }

    /// The hashed message the token asserts
    pub fn hashed_message(&self) -> &[u8] {
        self.tst_info.message_imprint.hashed_message.as_bytes()
    }

    /// The echoed nonce as an unsigned big-endian magnitude
    pub fn nonce(&self) -> Option<&[u8]> {
        self.tst_info.nonce.as_ref().map(|n| n.as_bytes())
    }

    /// When the authority generated the token
    pub fn gen_time(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.tst_info.gen_time.to_system_time())
    }

    /// How far genTime may deviate from UTC, if the authority states it
    pub fn accuracy(&self) -> Option<&Accuracy> {
        self.tst_info.accuracy.as_ref()
    }

    /// The authority-assigned serial number
    pub fn serial_number(&self) -> &[u8] {
        self.tst_info.serial_number.as_bytes()
    }

    /// The TSA policy the token was issued under
    pub fn policy(&self) -> ObjectIdentifier {
        self.tst_info.policy
    }

    /// Certificates embedded in the SignedData
    pub fn certificates(&self) -> Vec<Certificate> {
        extract_certificates(&self.signed_data)
    }

    /// Verify the token proves `hash` under `algorithm`
    pub fn verify(
        &self,
        hash: &[u8],
        algorithm: HashAlgorithm,
        opts: &VerifyOpts,
    ) -> Result<TimestampResult> {
        verify_token(self, hash, algorithm, opts)
    }
}

impl PartialEq for TimestampToken {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for TimestampToken {}

/// Extract certificates from SignedData
pub(crate) fn extract_certificates(signed_data: &SignedData) -> Vec<Certificate> {
    let mut certificates = Vec::new();

    if let Some(cert_set) = &signed_data.certificates {
        for cert_choice in cert_set.0.iter() {
            match cert_choice {
                CertificateChoices::Certificate(cert) => {
                    certificates.push(cert.clone());
                }
                CertificateChoices::Other(_) => {
                    tracing::debug!("Skipping non-standard certificate format");
                }
            }
        }
    }

    certificates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_der_rejects_garbage() {
        assert!(matches!(
            TimestampToken::from_der(b"not a token"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_from_der_rejects_non_signed_data() {
        // ContentInfo { id-data, [0] OCTET STRING "" }
        let content_info = ContentInfo {
            content_type: ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1"),
            content: der::Any::encode_from(&der::asn1::OctetString::new(Vec::new()).unwrap())
                .unwrap(),
        };
        let der = content_info.to_der().unwrap();
        let err = TimestampToken::from_der(&der).unwrap_err();
        assert!(err.to_string().contains("is not SignedData"));
    }
}
