//! # Keccak-256
//!
//! The legacy Keccak-256 variant used by Ethereum (not NIST SHA3-256).
//! Address checksums, address derivation and EIP-191 message digests all
//! flow through [`keccak256`].

use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 hash of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}
