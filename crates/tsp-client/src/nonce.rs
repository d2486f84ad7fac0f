//! Request nonces
//!
//! Every request carries 20 fresh bytes from the operating system CSPRNG.
//! The authority echoes them in the TSTInfo, which binds a response to the
//! request that asked for it.

use der::asn1::Uint;
use rand::Rng;

/// Nonce length in bytes
pub const NONCE_LEN: usize = 20;

/// A request nonce
#[derive(Clone, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    /// Draw a fresh nonce from the thread-local CSPRNG
    pub fn generate() -> Self {
        Self(rand::rng().random())
    }

    /// Wrap known bytes
    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw nonce bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Always [`NONCE_LEN`]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Encode as a positive ASN.1 INTEGER
    pub fn to_uint(&self) -> der::Result<Uint> {
        Uint::new(&self.0)
    }

    /// Whether an echoed INTEGER carries this nonce's value
    pub fn matches(&self, echoed: &Uint) -> bool {
        strip_leading_zeros(&self.0) == strip_leading_zeros(echoed.as_bytes())
    }
}

// INTEGER encodings drop leading zero octets, so compare magnitudes.
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    &bytes[first..]
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nonce({})", hex::encode(self.0))
    }
}
