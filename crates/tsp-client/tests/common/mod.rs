//! In-process timestamp authority for integration tests
//!
//! `MockTsa` signs real CMS tokens with a freshly generated key and a
//! self-issued certificate; `MockTransport` routes client requests to it.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedAttributes, SignedData, SignerIdentifier,
    SignerInfo, SignerInfos,
};
use const_oid::db::rfc5280::ID_CE_SUBJECT_KEY_IDENTIFIER;
use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, ID_RSASSA_PSS, SHA_256_WITH_RSA_ENCRYPTION,
};
use const_oid::ObjectIdentifier;
use der::asn1::{BitString, GeneralizedTime, Int, Null, OctetString, SetOfVec, Uint};
use der::{Any, Decode, Encode};
use rustls_pki_types::CertificateDer;
use tsp_client::asn1::{
    Accuracy, Asn1MessageImprint, PkiStatusInfo, TimeStampReq, TimeStampResp, TstInfo,
    OID_CONTENT_TYPE, OID_MESSAGE_DIGEST, OID_SIGNED_DATA, OID_TST_INFO,
};
use tsp_client::{Result, Transport, TransportFuture, TransportResponse, RESPONSE_CONTENT_TYPE};
use tsp_crypto::{KeyPair, SigningScheme};
use tsp_types::HashAlgorithm;
use url::Url;
use x509_cert::attr::Attribute;
use x509_cert::certificate::{TbsCertificate, Version};
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::time::{Time, Validity};
use x509_cert::Certificate;

/// SHA-256("hello world")
pub const HELLO_WORLD_SHA256: &str =
    "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

pub const TEST_POLICY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.4146.2.3");

/// OpenSSL's default TSA accuracy: secs 1, millisecs 500, microsecs 100
pub const TEST_ACCURACY: Accuracy = Accuracy {
    seconds: Some(1),
    millis: Some(500),
    micros: Some(100),
};

/// Key type and signer digest the authority signs with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignerProfile {
    EcdsaP256Sha256,
    EcdsaP384Sha384,
    RsaPkcs1Sha256,
    RsaPssSha512,
}

impl SignerProfile {
    fn generate_key(self) -> KeyPair {
        match self {
            SignerProfile::EcdsaP256Sha256 => KeyPair::generate_ecdsa_p256(),
            SignerProfile::EcdsaP384Sha384 => KeyPair::generate_ecdsa_p384(),
            SignerProfile::RsaPkcs1Sha256 | SignerProfile::RsaPssSha512 => {
                KeyPair::generate_rsa_2048()
            }
        }
        .expect("generate key")
    }

    pub fn scheme(self) -> SigningScheme {
        match self {
            SignerProfile::EcdsaP256Sha256 => SigningScheme::EcdsaP256Sha256,
            SignerProfile::EcdsaP384Sha384 => SigningScheme::EcdsaP384Sha384,
            SignerProfile::RsaPkcs1Sha256 => SigningScheme::RsaPkcs1Sha256,
            SignerProfile::RsaPssSha512 => SigningScheme::RsaPssSha512,
        }
    }

    /// SignerInfo digest algorithm
    pub fn digest(self) -> HashAlgorithm {
        match self {
            SignerProfile::EcdsaP256Sha256 | SignerProfile::RsaPkcs1Sha256 => {
                HashAlgorithm::Sha2256
            }
            SignerProfile::EcdsaP384Sha384 => HashAlgorithm::Sha2384,
            SignerProfile::RsaPssSha512 => HashAlgorithm::Sha2512,
        }
    }
}

/// How the next token deviates from an honest answer
#[derive(Clone, Debug, Default)]
pub struct Tamper {
    /// Replace the echoed nonce
    pub nonce: Option<Option<Vec<u8>>>,
    /// Replace the asserted digest
    pub digest: Option<Vec<u8>>,
    /// Replace the asserted hash algorithm
    pub algorithm: Option<ObjectIdentifier>,
    /// Leave the certificate out of the SignedData
    pub omit_certificate: bool,
    /// Sign with a key that does not belong to the embedded certificate
    pub foreign_signer: bool,
}

pub struct MockTsa {
    profile: SignerProfile,
    key: KeyPair,
    key_id: Vec<u8>,
    cert: Certificate,
    identify_by_key_id: bool,
}

impl MockTsa {
    pub fn new() -> Self {
        Self::with_profile(SignerProfile::EcdsaP256Sha256)
    }

    pub fn with_profile(profile: SignerProfile) -> Self {
        let key = profile.generate_key();
        let key_id = tsp_crypto::sha256(key.public_key_bytes())[..20].to_vec();
        let cert = self_issued_certificate(&key, &key_id);
        Self {
            profile,
            key,
            key_id,
            cert,
            identify_by_key_id: false,
        }
    }

    /// Name the signer by subjectKeyIdentifier instead of issuer and serial
    pub fn identified_by_key_id(mut self) -> Self {
        self.identify_by_key_id = true;
        self
    }

    pub fn profile(&self) -> SignerProfile {
        self.profile
    }

    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    pub fn certificate_der(&self) -> CertificateDer<'static> {
        CertificateDer::from(self.cert.to_der().expect("encode certificate"))
    }

    /// An honest response to a DER TimeStampReq
    pub fn respond(&self, request_der: &[u8]) -> Vec<u8> {
        self.respond_with(request_der, &Tamper::default())
    }

    pub fn respond_with(&self, request_der: &[u8], tamper: &Tamper) -> Vec<u8> {
        let request = TimeStampReq::from_der(request_der).expect("decode request");
        let token = self.token_for(&request, tamper);
        granted(token)
    }

    /// Token DER (ContentInfo) answering `request`
    pub fn token_for(&self, request: &TimeStampReq, tamper: &Tamper) -> Vec<u8> {
        let mut imprint = request.message_imprint.clone();
        if let Some(digest) = &tamper.digest {
            imprint = Asn1MessageImprint::new(imprint.hash_algorithm.clone(), digest.clone())
                .expect("imprint");
        }
        if let Some(oid) = tamper.algorithm {
            imprint.hash_algorithm.algorithm = oid;
        }

        let nonce = match &tamper.nonce {
            Some(Some(bytes)) => Some(Uint::new(bytes).expect("nonce")),
            Some(None) => None,
            None => request.nonce.clone(),
        };

        let tst_info = TstInfo {
            version: 1,
            policy: TEST_POLICY,
            message_imprint: imprint,
            serial_number: Int::new(&[0x2a]).expect("serial"),
            gen_time: GeneralizedTime::from_unix_duration(now()).expect("gen time"),
            accuracy: Some(TEST_ACCURACY),
            ordering: false,
            nonce,
            tsa: None,
            extensions: None,
        };

        let other_key;
        let signer = if tamper.foreign_signer {
            other_key = self.profile.generate_key();
            &other_key
        } else {
            &self.key
        };

        self.sign_tst_info(
            &tst_info.to_der().expect("encode TSTInfo"),
            signer,
            !tamper.omit_certificate,
        )
    }

    fn sign_tst_info(&self, tst_der: &[u8], signer: &KeyPair, embed_certificate: bool) -> Vec<u8> {
        let digest_algorithm = self.profile.digest();

        let content_type = Attribute {
            oid: OID_CONTENT_TYPE,
            values: SetOfVec::try_from(vec![Any::encode_from(&OID_TST_INFO).expect("oid")])
                .expect("values"),
        };
        let message_digest = Attribute {
            oid: OID_MESSAGE_DIGEST,
            values: SetOfVec::try_from(vec![Any::encode_from(
                &OctetString::new(tsp_crypto::digest(digest_algorithm, tst_der))
                    .expect("digest"),
            )
            .expect("any")])
            .expect("values"),
        };
        let signed_attrs: SignedAttributes =
            SetOfVec::try_from(vec![content_type, message_digest]).expect("attrs");

        let signature = signer
            .sign_with(
                self.profile.scheme(),
                &signed_attrs.to_der().expect("encode attrs"),
            )
            .expect("sign attrs");

        let (version, sid) = if self.identify_by_key_id {
            (
                CmsVersion::V3,
                SignerIdentifier::SubjectKeyIdentifier(SubjectKeyIdentifier(
                    OctetString::new(self.key_id.clone()).expect("key id"),
                )),
            )
        } else {
            (
                CmsVersion::V1,
                SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                    issuer: self.cert.tbs_certificate.issuer.clone(),
                    serial_number: self.cert.tbs_certificate.serial_number.clone(),
                }),
            )
        };

        let signer_info = SignerInfo {
            version,
            sid,
            digest_alg: digest_alg(digest_algorithm),
            signed_attrs: Some(signed_attrs),
            signature_algorithm: signature_alg(self.profile.scheme()),
            signature: OctetString::new(signature.into_bytes()).expect("signature"),
            unsigned_attrs: None,
        };

        let certificates = embed_certificate.then(|| {
            CertificateSet(
                SetOfVec::try_from(vec![CertificateChoices::Certificate(self.cert.clone())])
                    .expect("certificates"),
            )
        });

        let signed_data = SignedData {
            version: CmsVersion::V3,
            digest_algorithms: SetOfVec::try_from(vec![digest_alg(digest_algorithm)])
                .expect("digest algorithms"),
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: OID_TST_INFO,
                econtent: Some(
                    Any::encode_from(&OctetString::new(tst_der.to_vec()).expect("econtent"))
                        .expect("any"),
                ),
            },
            certificates,
            crls: None,
            signer_infos: SignerInfos(
                SetOfVec::try_from(vec![signer_info]).expect("signer infos"),
            ),
        };

        ContentInfo {
            content_type: OID_SIGNED_DATA,
            content: Any::encode_from(&signed_data).expect("signed data"),
        }
        .to_der()
        .expect("encode token")
    }
}

fn now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
}

fn digest_alg(algorithm: HashAlgorithm) -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: algorithm.oid(),
        parameters: None,
    }
}

// PSS parameters are left out; the scheme is picked from the OID and the
// signer digest.
fn signature_alg(scheme: SigningScheme) -> AlgorithmIdentifierOwned {
    let null = || Some(Any::encode_from(&Null).expect("null"));
    let (oid, parameters) = match scheme {
        SigningScheme::EcdsaP256Sha256 => (ECDSA_WITH_SHA_256, None),
        SigningScheme::EcdsaP384Sha384 => (ECDSA_WITH_SHA_384, None),
        SigningScheme::RsaPkcs1Sha256 => (SHA_256_WITH_RSA_ENCRYPTION, null()),
        SigningScheme::RsaPssSha512 => (ID_RSASSA_PSS, None),
        other => panic!("no test signature algorithm for {other}"),
    };
    AlgorithmIdentifierOwned { oid, parameters }
}

fn self_issued_certificate(key: &KeyPair, key_id: &[u8]) -> Certificate {
    let name = Name::from_str("CN=Mock TSA,O=tsp-client tests").expect("name");
    let validity = Validity {
        not_before: Time::GeneralTime(
            GeneralizedTime::from_unix_duration(now() - Duration::from_secs(3600))
                .expect("not before"),
        ),
        not_after: Time::GeneralTime(
            GeneralizedTime::from_unix_duration(now() + Duration::from_secs(86400))
                .expect("not after"),
        ),
    };

    let key_identifier = Extension {
        extn_id: ID_CE_SUBJECT_KEY_IDENTIFIER,
        critical: false,
        extn_value: OctetString::new(
            SubjectKeyIdentifier(OctetString::new(key_id.to_vec()).expect("key id"))
                .to_der()
                .expect("encode key id"),
        )
        .expect("extension value"),
    };

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[0x01, 0x02, 0x03]).expect("serial"),
        signature: signature_alg(key.default_scheme()),
        issuer: name.clone(),
        validity,
        subject: name,
        subject_public_key_info: key.subject_public_key_info().expect("spki"),
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(vec![key_identifier]),
    };

    let signature = key
        .sign(&tbs_certificate.to_der().expect("encode tbs"))
        .expect("sign tbs");

    Certificate {
        tbs_certificate,
        signature_algorithm: signature_alg(key.default_scheme()),
        signature: BitString::from_bytes(signature.as_bytes()).expect("signature bits"),
    }
}

/// TimeStampResp with status granted around `token_der`
pub fn granted(token_der: Vec<u8>) -> Vec<u8> {
    TimeStampResp {
        status: PkiStatusInfo {
            status: 0,
            status_string: None,
            fail_info: None,
        },
        time_stamp_token: Some(Any::from_der(&token_der).expect("token any")),
    }
    .to_der()
    .expect("encode response")
}

/// TimeStampResp refusing the request
pub fn rejection(status: u8, text: &str) -> Vec<u8> {
    TimeStampResp {
        status: PkiStatusInfo {
            status,
            status_string: Some(vec![text.to_string()]),
            fail_info: Some(BitString::new(7, vec![0x80]).expect("fail info")),
        },
        time_stamp_token: None,
    }
    .to_der()
    .expect("encode response")
}

pub fn reply(body: Vec<u8>) -> TransportResponse {
    TransportResponse {
        status: 200,
        content_type: Some(RESPONSE_CONTENT_TYPE.to_string()),
        body,
    }
}

type Handler = dyn Fn(&[u8]) -> Result<TransportResponse> + Send + Sync;

/// Records every request and answers from a closure
pub struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<(Url, String, Vec<u8>)>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&[u8]) -> Result<TransportResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer every request honestly from `tsa`
    pub fn honest(tsa: Arc<MockTsa>) -> Arc<Self> {
        Self::new(move |body| Ok(reply(tsa.respond(body))))
    }

    pub fn requests(&self) -> Vec<(Url, String, Vec<u8>)> {
        self.requests.lock().expect("lock").clone()
    }
}

impl Transport for MockTransport {
    fn post<'a>(
        &'a self,
        url: &'a Url,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> TransportFuture<'a> {
        Box::pin(async move {
            let response = (self.handler)(&body);
            self.requests
                .lock()
                .expect("lock")
                .push((url.clone(), content_type.to_string(), body));
            response
        })
    }
}

/// Never answers
pub struct HangingTransport;

impl Transport for HangingTransport {
    fn post<'a>(
        &'a self,
        _url: &'a Url,
        _content_type: &'static str,
        _body: Vec<u8>,
    ) -> TransportFuture<'a> {
        Box::pin(std::future::pending())
    }
}
