//! Store error types.

use crate::config::ConfigError;

/// Errors from attestation and passkey record operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The slot holds no record. Expected for identities that never linked.
    #[error("no record in {collection}/{rkey}")]
    NotFound { collection: String, rkey: String },

    /// The repository rejected the session credentials.
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Network failure or unexpected response status.
    #[error("transport error calling {endpoint}: {reason}")]
    Transport {
        endpoint: String,
        reason: String,
        /// Whether repeating the same call may succeed.
        retryable: bool,
    },

    /// A record exists but its value does not have the expected shape.
    #[error("malformed record at {locator}: {reason}")]
    MalformedRecord { locator: String, reason: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// `true` for transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { retryable: true, .. })
    }

    /// `true` for the expected empty-slot outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_retryable_transport_is_retryable() {
        let transient = StoreError::Transport {
            endpoint: "GET getRecord".into(),
            reason: "HTTP 503".into(),
            retryable: true,
        };
        let permanent = StoreError::Transport {
            endpoint: "GET getRecord".into(),
            reason: "HTTP 418".into(),
            retryable: false,
        };
        assert!(transient.is_retryable());
        assert!(!permanent.is_retryable());
        assert!(!StoreError::Unauthorized { reason: "x".into() }.is_retryable());
        assert!(!StoreError::NotFound {
            collection: "c".into(),
            rkey: "self".into()
        }
        .is_retryable());
    }

    #[test]
    fn display_names_the_slot() {
        let err = StoreError::NotFound {
            collection: "com.hypercert.walletAttestationTest".into(),
            rkey: "self".into(),
        };
        assert_eq!(
            err.to_string(),
            "no record in com.hypercert.walletAttestationTest/self"
        );
        assert!(err.is_not_found());
    }
}
