//! # Error Types
//!
//! Boundary validation errors and cryptographic errors shared by the
//! workspace. All errors use `thiserror`.
//!
//! - Validation errors carry the offending input and the reason it was
//!   rejected.
//! - `CryptoError::MalformedSignature` is the only failure signature recovery
//!   may report. A valid signature from the wrong key is not an error.

use thiserror::Error;

/// Rejected input at a parsing boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The string is not a syntactically valid DID.
    #[error("invalid DID {value:?}: {reason}")]
    InvalidDid {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The string is not a `0x`-prefixed 20-byte hex address.
    #[error("invalid wallet address {value:?}: {reason}")]
    InvalidAddress {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Mixed-case address whose casing does not match its EIP-55 checksum.
    #[error("wallet address {value} fails its EIP-55 checksum (expected {expected})")]
    ChecksumMismatch {
        /// The rejected input.
        value: String,
        /// The correctly checksummed rendering of the same bytes.
        expected: String,
    },

    /// The string is not an `at://authority/collection/rkey` URI.
    #[error("invalid record locator {value:?}: {reason}")]
    InvalidLocator {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Error in signature or key operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The signature is short, badly encoded, out of range, or carries an
    /// invalid recovery id, so no signer can be recovered from it.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Key parsing or generation failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Producing a signature failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_includes_input() {
        let err = ValidationError::InvalidDid {
            value: "plc:abc".into(),
            reason: "missing did: prefix".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("plc:abc"));
        assert!(msg.contains("missing did: prefix"));
    }

    #[test]
    fn crypto_error_display() {
        let err = CryptoError::MalformedSignature("expected 65 bytes, got 3".into());
        assert_eq!(err.to_string(), "malformed signature: expected 65 bytes, got 3");
    }
}
