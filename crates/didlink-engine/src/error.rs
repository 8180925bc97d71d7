//! Engine, signer and wallet-source error types.

use didlink_store::StoreError;
use thiserror::Error;

/// Errors returned by engine operations.
///
/// Failures that move the engine into `Error(kind)` are also returned here so
/// callers can surface the cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The operation needs an active session.
    #[error("no active session")]
    NoSession,

    /// Attempted transition is not valid from the current state.
    #[error("invalid engine transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// The session ended or changed while the operation was in flight; its
    /// result was discarded.
    #[error("session changed while {operation} was in flight")]
    SessionChanged { operation: String },

    /// The attestation store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The wallet did not produce a signature.
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),
}

/// Failure to obtain a signature from a wallet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The user or wallet refused to sign.
    #[error("signature request declined: {reason}")]
    Declined { reason: String },

    /// The wallet failed while signing.
    #[error("signing failed: {reason}")]
    Failed { reason: String },
}

/// Failure of one active-wallet source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("wallet source {source_name} unavailable: {reason}")]
pub struct SourceError {
    pub source_name: String,
    pub reason: String,
}
