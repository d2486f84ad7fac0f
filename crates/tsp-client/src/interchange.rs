//! Persisting tokens as text
//!
//! Tokens are stored as standard base64 of their ContentInfo DER. The same
//! form is used when a token is a field of a JSON document.

use crate::error::{Error, Result};
use crate::token::TimestampToken;
use crate::verify::{TimestampResult, VerifyOpts};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tsp_types::{Base64, HashOutput};

impl TimestampToken {
    /// Standard base64 of the token DER
    pub fn to_base64(&self) -> String {
        Base64::encode(self.as_der()).into_string()
    }

    /// Parse a token from [`to_base64`](Self::to_base64) output.
    ///
    /// Bad base64 and undecodable DER are both [`Error::Decode`].
    pub fn from_base64(text: &str) -> Result<Self> {
        let der = Base64::from(text)
            .decode()
            .map_err(|e| Error::Decode(e.to_string()))?;
        Self::from_der(&der)
    }
}

impl Serialize for TimestampToken {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for TimestampToken {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::from_base64(&text).map_err(serde::de::Error::custom)
    }
}

/// A digest together with the token that timestamps it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampedDigest {
    /// The timestamped digest and its algorithm
    #[serde(flatten)]
    pub digest: HashOutput,
    /// The authority's token
    pub timestamp_token: TimestampToken,
}

impl TimestampedDigest {
    pub fn new(digest: HashOutput, timestamp_token: TimestampToken) -> Self {
        Self {
            digest,
            timestamp_token,
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document; any failure, including in the token field, is
    /// [`Error::Decode`]
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Check the stored token still proves the stored digest
    pub fn verify(&self, opts: &VerifyOpts) -> Result<TimestampResult> {
        self.timestamp_token
            .verify(&self.digest.digest, self.digest.algorithm, opts)
    }
}
