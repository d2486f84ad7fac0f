//! Timestamp requests
//!
//! A [`TimestampRequest`] is immutable once built. It is the only way to turn
//! response bytes into a [`TimestampToken`], so every token is checked
//! against the digest, algorithm and nonce that were actually sent.

use crate::asn1::{AlgorithmIdentifier, Asn1MessageImprint, TimeStampReq, TimeStampResp};
use crate::error::{Error, Result};
use crate::nonce::Nonce;
use crate::token::TimestampToken;
use const_oid::ObjectIdentifier;
use der::Encode;
use tsp_types::{HashAlgorithm, HashOutput};

/// An RFC 3161 request for a single digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampRequest {
    imprint: HashOutput,
    nonce: Nonce,
    cert_req: bool,
}

impl TimestampRequest {
    /// Build a request for a precomputed digest.
    ///
    /// Fails with [`Error::InvalidInput`] when the digest is empty or its
    /// length does not match the algorithm's output size.
    pub fn new(digest: &[u8], algorithm: HashAlgorithm) -> Result<Self> {
        let imprint = HashOutput::try_new(algorithm, digest.to_vec())?;
        Ok(Self {
            imprint,
            nonce: Nonce::generate(),
            cert_req: true,
        })
    }

    /// Build a request for a digest identified by its algorithm OID
    pub fn for_oid(digest: &[u8], algorithm: &ObjectIdentifier) -> Result<Self> {
        Self::new(digest, HashAlgorithm::from_oid(algorithm)?)
    }

    /// Hash `data` with `algorithm` and build a request for the result
    pub fn for_data(data: &[u8], algorithm: HashAlgorithm) -> Result<Self> {
        Self::new(&tsp_crypto::digest(algorithm, data), algorithm)
    }

    pub fn digest(&self) -> &[u8] {
        &self.imprint.digest
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.imprint.algorithm
    }

    /// The digest and its algorithm
    pub fn hash_output(&self) -> &HashOutput {
        &self.imprint
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Whether the authority is asked to embed its certificate
    pub fn cert_req(&self) -> bool {
        self.cert_req
    }

    /// The ASN.1 TimeStampReq for this request
    pub fn to_asn1(&self) -> Result<TimeStampReq> {
        let imprint = Asn1MessageImprint::new(
            AlgorithmIdentifier::from(self.algorithm()),
            self.digest().to_vec(),
        )
        .map_err(|e| Error::Asn1(format!("failed to build message imprint: {}", e)))?;
        let nonce = self
            .nonce
            .to_uint()
            .map_err(|e| Error::Asn1(format!("failed to encode nonce: {}", e)))?;

        Ok(TimeStampReq {
            version: 1,
            message_imprint: imprint,
            req_policy: None,
            nonce: Some(nonce),
            cert_req: self.cert_req,
            extensions: None,
        })
    }

    /// DER encoding of the TimeStampReq
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_asn1()?
            .to_der()
            .map_err(|e| Error::Asn1(format!("failed to encode request: {}", e)))
    }

    /// Decode a TimeStampResp answering this request.
    ///
    /// A non-granted status is [`Error::Rejected`]. Anything else that keeps
    /// the body from being a token for this exact request is
    /// [`Error::MalformedResponse`]. The token's signature is not checked
    /// here.
    pub fn process_response(&self, response: &[u8]) -> Result<TimestampToken> {
        let resp = TimeStampResp::from_der_bytes(response).map_err(|e| {
            Error::MalformedResponse(format!("failed to decode TimeStampResp: {}", e))
        })?;

        if !resp.status.is_success() {
            let status = resp.status.status;
            let fail_info = resp.status.describe();
            tracing::warn!(status, %fail_info, "Timestamp authority rejected the request");
            return Err(Error::Rejected { status, fail_info });
        }

        let token_any = resp.time_stamp_token.as_ref().ok_or_else(|| {
            Error::MalformedResponse("granted response carries no timeStampToken".to_string())
        })?;
        let token_der = token_any
            .to_der()
            .map_err(|e| Error::MalformedResponse(format!("failed to re-encode token: {}", e)))?;
        let token = TimestampToken::parse(&token_der).map_err(Error::MalformedResponse)?;

        self.check_token(&token)?;
        Ok(token)
    }

    fn check_token(&self, token: &TimestampToken) -> Result<()> {
        let asserted_oid = token.hash_algorithm_oid();
        if asserted_oid != self.algorithm().oid() {
            return Err(Error::MalformedResponse(format!(
                "hash algorithm mismatch: requested {}, token asserts {}",
                self.algorithm().oid(),
                asserted_oid
            )));
        }

        if token.hashed_message() != self.digest() {
            return Err(Error::MalformedResponse(format!(
                "digest mismatch: requested {}, token asserts {}",
                hex::encode(self.digest()),
                hex::encode(token.hashed_message())
            )));
        }

        match &token.tst_info().nonce {
            Some(echoed) if self.nonce.matches(echoed) => {}
            Some(_) => {
                return Err(Error::MalformedResponse(
                    "nonce mismatch: token does not echo the request nonce".to_string(),
                ))
            }
            None => {
                return Err(Error::MalformedResponse(
                    "token carries no nonce".to_string(),
                ))
            }
        }

        if self.cert_req && token.certificates().is_empty() {
            return Err(Error::MalformedResponse(
                "certificate requested but token embeds none".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::{PkiStatus, PkiStatusInfo};
    use crate::nonce::NONCE_LEN;
    use rstest::rstest;

    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_new_request_defaults() {
        let digest = hex::decode(HELLO_WORLD_SHA256).unwrap();
        let request = TimestampRequest::new(&digest, HashAlgorithm::Sha2256).unwrap();

        assert_eq!(request.digest(), digest.as_slice());
        assert_eq!(request.algorithm(), HashAlgorithm::Sha2256);
        assert_eq!(request.nonce().len(), NONCE_LEN);
        assert!(request.cert_req());

        let asn1 = request.to_asn1().unwrap();
        assert_eq!(asn1.version, 1);
        assert!(asn1.req_policy.is_none());
        assert!(asn1.cert_req);
    }

    #[test]
    fn test_requests_never_share_a_nonce() {
        let digest = [7u8; 32];
        let a = TimestampRequest::new(&digest, HashAlgorithm::Sha2256).unwrap();
        let b = TimestampRequest::new(&digest, HashAlgorithm::Sha2256).unwrap();
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a, b);
    }

    #[rstest]
    #[case::empty(&[], HashAlgorithm::Sha2256)]
    #[case::short(&[1u8; 20], HashAlgorithm::Sha2256)]
    #[case::sha256_for_sha512(&[1u8; 32], HashAlgorithm::Sha2512)]
    fn test_invalid_digest_rejected(#[case] digest: &[u8], #[case] algorithm: HashAlgorithm) {
        assert!(matches!(
            TimestampRequest::new(digest, algorithm),
            Err(Error::InvalidInput(_))
        ));
    }

    #[rstest]
    #[case::sha1("1.3.14.3.2.26")]
    #[case::md5("1.2.840.113549.2.5")]
    #[case::unknown("1.2.3.4")]
    fn test_weak_or_unknown_oid_rejected(#[case] oid: &str) {
        let oid = ObjectIdentifier::new_unwrap(oid);
        assert!(matches!(
            TimestampRequest::for_oid(&[0u8; 20], &oid),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_for_oid_accepts_sha384() {
        let request =
            TimestampRequest::for_oid(&[0u8; 48], &crate::asn1::OID_SHA384).unwrap();
        assert_eq!(request.algorithm(), HashAlgorithm::Sha2384);
    }

    #[test]
    fn test_for_data_hashes_input() {
        let request = TimestampRequest::for_data(b"hello world", HashAlgorithm::Sha2256).unwrap();
        assert_eq!(hex::encode(request.digest()), HELLO_WORLD_SHA256);
    }

    #[test]
    fn test_to_der_roundtrips() {
        let request = TimestampRequest::for_data(b"data", HashAlgorithm::Sha2512).unwrap();
        let der = request.to_der().unwrap();
        let decoded = TimeStampReq::from_der_bytes(&der).unwrap();

        assert_eq!(decoded, request.to_asn1().unwrap());
        assert_eq!(
            decoded.message_imprint.hashed_message.as_bytes(),
            request.digest()
        );
        assert!(request.nonce().matches(decoded.nonce.as_ref().unwrap()));
    }

    fn encode_response(status: PkiStatusInfo) -> Vec<u8> {
        Encode::to_der(&TimeStampResp {
            status,
            time_stamp_token: None,
        })
        .unwrap()
    }

    #[test]
    fn test_process_response_rejected_status() {
        let request = TimestampRequest::for_data(b"data", HashAlgorithm::Sha2256).unwrap();
        let body = encode_response(PkiStatusInfo {
            status: PkiStatus::Rejection as u8,
            status_string: Some(vec!["policy not supported".to_string()]),
            fail_info: None,
        });

        match request.process_response(&body) {
            Err(Error::Rejected { status, fail_info }) => {
                assert_eq!(status, 2);
                assert_eq!(fail_info, "policy not supported");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_process_response_granted_without_token() {
        let request = TimestampRequest::for_data(b"data", HashAlgorithm::Sha2256).unwrap();
        let body = encode_response(PkiStatusInfo {
            status: PkiStatus::Granted as u8,
            status_string: None,
            fail_info: None,
        });

        assert!(matches!(
            request.process_response(&body),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[rstest]
    #[case::empty(b"")]
    #[case::html(b"<html>busy</html>")]
    fn test_process_response_garbage(#[case] body: &[u8]) {
        let request = TimestampRequest::for_data(b"data", HashAlgorithm::Sha2256).unwrap();
        assert!(matches!(
            request.process_response(body),
            Err(Error::MalformedResponse(_))
        ));
    }
}
