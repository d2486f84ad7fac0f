//! TSA client for RFC 3161 Time-Stamp Protocol

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::request::TimestampRequest;
use crate::token::TimestampToken;
use crate::transport::{
    check_response_content_type, HttpTransport, Transport, REQUEST_CONTENT_TYPE,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tsp_types::HashAlgorithm;

/// Where an exchange is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Request built, nothing sent yet
    Built,
    /// DER TimeStampReq produced
    Encoded,
    /// POST issued
    Sent,
    /// Waiting for and checking the HTTP answer
    AwaitingResponse,
    /// TimeStampResp decoded and matched against the request
    Decoded,
    /// Token signature verified; the token is returned
    Verified,
    /// Terminal failure
    Rejected,
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestState::Built => "built",
            RequestState::Encoded => "encoded",
            RequestState::Sent => "sent",
            RequestState::AwaitingResponse => "awaiting-response",
            RequestState::Decoded => "decoded",
            RequestState::Verified => "verified",
            RequestState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// A client for interacting with a Time-Stamp Authority
pub struct TimestampClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl TimestampClient {
    /// Create a client that talks HTTP with the configured timeout
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a caller-supplied transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Create a client for the FreeTSA service
    pub fn freetsa() -> Result<Self> {
        Self::new(ClientConfig::freetsa())
    }

    /// Create a client for the Sigstore TSA
    pub fn sigstore() -> Result<Self> {
        Self::new(ClientConfig::sigstore())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Obtain a verified token for `request`.
    ///
    /// One POST, no retries. The token is only returned once its signature
    /// has been verified against the request's digest.
    pub async fn request_timestamp(&self, request: &TimestampRequest) -> Result<TimestampToken> {
        let mut state = RequestState::Built;
        match self.exchange(request, &mut state).await {
            Ok(token) => Ok(token),
            Err(err) => {
                tracing::warn!(
                    endpoint = %self.config.endpoint,
                    last_state = %state,
                    error = %err,
                    "Timestamp request failed"
                );
                transition(&mut state, RequestState::Rejected);
                Err(err)
            }
        }
    }

    /// Like [`request_timestamp`](Self::request_timestamp), but gives up with
    /// [`Error::Cancelled`] as soon as `cancel` fires.
    pub async fn request_timestamp_with_cancellation(
        &self,
        request: &TimestampRequest,
        cancel: &CancellationToken,
    ) -> Result<TimestampToken> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(endpoint = %self.config.endpoint, "Timestamp request cancelled");
                Err(Error::Cancelled)
            }
            result = self.request_timestamp(request) => result,
        }
    }

    /// Request a timestamp for a precomputed digest
    pub async fn timestamp(&self, digest: &[u8], algorithm: HashAlgorithm) -> Result<TimestampToken> {
        let request = TimestampRequest::new(digest, algorithm)?;
        self.request_timestamp(&request).await
    }

    /// Request a timestamp for SHA-256 digest
    pub async fn timestamp_sha256(&self, digest: &[u8]) -> Result<TimestampToken> {
        self.timestamp(digest, HashAlgorithm::Sha2256).await
    }

    /// Request a timestamp for SHA-384 digest
    pub async fn timestamp_sha384(&self, digest: &[u8]) -> Result<TimestampToken> {
        self.timestamp(digest, HashAlgorithm::Sha2384).await
    }

    /// Request a timestamp for SHA-512 digest
    pub async fn timestamp_sha512(&self, digest: &[u8]) -> Result<TimestampToken> {
        self.timestamp(digest, HashAlgorithm::Sha2512).await
    }

    async fn exchange(
        &self,
        request: &TimestampRequest,
        state: &mut RequestState,
    ) -> Result<TimestampToken> {
        let request_der = request.to_der()?;
        transition(state, RequestState::Encoded);

        let pending = self
            .transport
            .post(&self.config.endpoint, REQUEST_CONTENT_TYPE, request_der);
        transition(state, RequestState::Sent);

        let response = pending.await?;
        transition(state, RequestState::AwaitingResponse);

        if response.status != 200 {
            return Err(Error::Authority {
                status: response.status,
            });
        }
        check_response_content_type(response.content_type.as_deref())?;

        let token = request.process_response(&response.body)?;
        transition(state, RequestState::Decoded);

        token.verify(request.digest(), request.algorithm(), &self.config.verify)?;
        transition(state, RequestState::Verified);

        tracing::debug!(
            gen_time = %token.gen_time(),
            serial = %hex::encode(token.serial_number()),
            "Timestamp token verified"
        );

        Ok(token)
    }
}

fn transition(state: &mut RequestState, next: RequestState) {
    tracing::debug!(from = %state, to = %next, "Timestamp request state");
    *state = next;
}
