//! Client configuration

use crate::error::{Error, Result};
use crate::verify::VerifyOpts;
use std::time::Duration;
use url::Url;

/// FreeTSA public endpoint, the default authority
pub const DEFAULT_TSA_URL: &str = "https://freetsa.org/tsr";

/// Sigstore public good timestamp authority
pub const SIGSTORE_TSA_URL: &str = "https://timestamp.sigstore.dev/api/v1/timestamp";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where to send requests and how to check what comes back
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// TSA endpoint
    pub endpoint: Url,
    /// Timeout for a single exchange
    pub timeout: Duration,
    /// Options applied when verifying every token
    pub verify: VerifyOpts,
}

impl ClientConfig {
    /// Configuration for an arbitrary endpoint
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            verify: VerifyOpts::default(),
        }
    }

    /// Parse `endpoint` and build a configuration for it
    pub fn for_url(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::InvalidInput(format!("invalid TSA URL {:?}: {}", endpoint, e)))?;
        match endpoint.scheme() {
            "http" | "https" => Ok(Self::new(endpoint)),
            scheme => Err(Error::InvalidInput(format!(
                "unsupported TSA URL scheme {:?}",
                scheme
            ))),
        }
    }

    /// FreeTSA
    pub fn freetsa() -> Self {
        Self::new(builtin_url(DEFAULT_TSA_URL))
    }

    /// Sigstore's public timestamp authority
    pub fn sigstore() -> Self {
        Self::new(builtin_url(SIGSTORE_TSA_URL))
    }

    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_opts(mut self, verify: VerifyOpts) -> Self {
        self.verify = verify;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::freetsa()
    }
}

fn builtin_url(url: &'static str) -> Url {
    Url::parse(url).expect("built-in TSA URL is valid")
}
