//! HTTP transport for timestamp requests
//!
//! The client talks to the authority through the object-safe [`Transport`]
//! trait so a different HTTP stack, or a test double, can be plugged in.

use crate::error::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// MIME type of a DER TimeStampReq body
pub const REQUEST_CONTENT_TYPE: &str = "application/timestamp-query";

/// MIME type of a DER TimeStampResp body
pub const RESPONSE_CONTENT_TYPE: &str = "application/timestamp-reply";

/// What came back from a single POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// The `Content-Type` header, if the authority sent one
    pub content_type: Option<String>,
    /// The full response body
    pub body: Vec<u8>,
}

/// Future returned by [`Transport::post`]
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>>;

/// Sends one request body and returns the raw answer.
///
/// Implementations report timeouts as [`Error::Timeout`] and other
/// connection failures as [`Error::Http`]. They do not retry.
pub trait Transport: Send + Sync {
    /// POST `body` to `url` with the given `Content-Type`
    fn post<'a>(
        &'a self,
        url: &'a Url,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> TransportFuture<'a>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post<'a>(
        &'a self,
        url: &'a Url,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> TransportFuture<'a> {
        (**self).post(url, content_type, body)
    }
}

/// [`Transport`] backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }

    /// Wrap an existing client; `timeout` is only used for error reporting
    pub fn from_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn map_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Http(err.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn post<'a>(
        &'a self,
        url: &'a Url,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> TransportFuture<'a> {
        Box::pin(async move {
            let response = self
                .client
                .post(url.clone())
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body)
                .send()
                .await
                .map_err(|e| self.map_error(e))?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

            let body = response
                .bytes()
                .await
                .map_err(|e| self.map_error(e))?
                .to_vec();

            Ok(TransportResponse {
                status,
                content_type,
                body,
            })
        })
    }
}

/// Check a response `Content-Type` against [`RESPONSE_CONTENT_TYPE`].
///
/// Parameters are ignored and the media type compares case-insensitively.
pub fn check_response_content_type(content_type: Option<&str>) -> Result<()> {
    let header = content_type.ok_or_else(|| Error::Protocol("missing content type".to_string()))?;

    let media_type = header.split(';').next().unwrap_or_default().trim();
    if media_type.eq_ignore_ascii_case(RESPONSE_CONTENT_TYPE) {
        Ok(())
    } else {
        Err(Error::Protocol(format!(
            "unexpected content type {:?}, expected {}",
            header, RESPONSE_CONTENT_TYPE
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("application/timestamp-reply")]
    #[case("Application/Timestamp-Reply")]
    #[case("application/timestamp-reply; charset=binary")]
    #[case(" application/timestamp-reply ;foo=bar")]
    fn test_accepts_reply_content_type(#[case] value: &str) {
        assert!(check_response_content_type(Some(value)).is_ok());
    }

    #[rstest]
    #[case("text/plain")]
    #[case("text/html; charset=utf-8")]
    #[case("application/timestamp-query")]
    #[case("")]
    fn test_rejects_other_content_types(#[case] value: &str) {
        assert!(matches!(
            check_response_content_type(Some(value)),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_missing_content_type() {
        match check_response_content_type(None) {
            Err(Error::Protocol(msg)) => assert_eq!(msg, "missing content type"),
            other => panic!("expected Protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(Duration::from_secs(5)).is_ok());
    }
}
