//! Hashing utilities using aws-lc-rs

use aws_lc_rs::digest::{self, Context, SHA256, SHA384, SHA512};
use tsp_types::{HashAlgorithm, HashOutput};

fn aws_algorithm(algorithm: HashAlgorithm) -> &'static digest::Algorithm {
    match algorithm {
        HashAlgorithm::Sha2256 => &SHA256,
        HashAlgorithm::Sha2384 => &SHA384,
        HashAlgorithm::Sha2512 => &SHA512,
    }
}

/// Hash data with the given algorithm
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    digest::digest(aws_algorithm(algorithm), data)
        .as_ref()
        .to_vec()
}

/// Hash data using SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let digest = digest::digest(&SHA256, data);
    let mut result = [0u8; 32];
    result.copy_from_slice(digest.as_ref());
    result
}

/// Incremental hasher for any supported algorithm
pub struct Hasher {
    algorithm: HashAlgorithm,
    context: Context,
}

impl Hasher {
    /// Create a new hasher
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            context: Context::new(aws_algorithm(algorithm)),
        }
    }

    /// Update the hasher with data
    pub fn update(&mut self, data: &[u8]) {
        self.context.update(data);
    }

    /// Finalize and get the digest together with its algorithm
    pub fn finalize(self) -> HashOutput {
        let digest = self.context.finish();
        HashOutput::new(self.algorithm, digest.as_ref().to_vec())
    }
}
