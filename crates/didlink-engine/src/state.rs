//! # Attestation Lifecycle State Machine
//!
//! Models what the engine currently knows about the session's attestation.
//!
//! ## States
//!
//! ```text
//!  NoSession ──▶ Loading ──▶ NoRecord
//!      ▲            │
//!      │            ▼
//!   (any)     RecordUnverified ──▶ RecordVerified
//!                                        │
//!  (any but NoSession) ──▶ LinkInProgress ──▶ Loading
//!  (any but NoSession) ──▶ Error(kind) ──retry──▶ Loading
//! ```
//!
//! - Every state returns to `NoSession` when the session ends. There is no
//!   terminal state.
//! - `RecordVerified` is entered only from `RecordUnverified`, and only with
//!   an authentic [`VerificationResult`].
//! - `NoRecord`, `RecordUnverified`, `RecordVerified` and `Error` may go back
//!   to `Loading` on refresh or retry.

use chrono::{DateTime, Utc};
use didlink_store::StoreError;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, SignerError};
use crate::verify::VerificationResult;

/// Oldest transitions are dropped past this many entries.
const MAX_TRANSITION_LOG: usize = 256;

// ─── Error Kinds ─────────────────────────────────────────────────────

/// Why the engine is in `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The session credentials were rejected. Re-authenticate.
    Unauthorized,
    /// Transient failure (network, 5xx, timeout). Retry may succeed.
    Transport,
    /// The wallet declined to sign. Never retried automatically.
    SigningDeclined,
    /// The wallet failed while signing.
    SigningFailed,
    /// The repository rejected the request permanently.
    Store,
}

impl ErrorKind {
    /// Classify a store failure that is not an expected outcome.
    pub fn from_store(error: &StoreError) -> Self {
        match error {
            StoreError::Unauthorized { .. } => Self::Unauthorized,
            StoreError::Transport {
                retryable: true, ..
            } => Self::Transport,
            StoreError::Transport { .. }
            | StoreError::NotFound { .. }
            | StoreError::MalformedRecord { .. }
            | StoreError::Config(_) => Self::Store,
        }
    }

    /// Classify a signer failure.
    pub fn from_signer(error: &SignerError) -> Self {
        match error {
            SignerError::Declined { .. } => Self::SigningDeclined,
            SignerError::Failed { .. } => Self::SigningFailed,
        }
    }

    /// Whether an explicit retry can be expected to help.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport)
    }

    /// User-facing description.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Session expired. Sign in again.",
            Self::Transport => "Repository unreachable. Try again.",
            Self::SigningDeclined => "Signature request declined.",
            Self::SigningFailed => "Wallet failed to sign.",
            Self::Store => "Repository rejected the request.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Transport => "TRANSPORT",
            Self::SigningDeclined => "SIGNING_DECLINED",
            Self::SigningFailed => "SIGNING_FAILED",
            Self::Store => "STORE",
        };
        f.write_str(s)
    }
}

// ─── Engine State ────────────────────────────────────────────────────

/// The engine's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// No authenticated identity.
    NoSession,
    /// Fetching the attestation.
    Loading,
    /// The identity has no (usable) attestation.
    NoRecord,
    /// A record exists but its signature has not been shown authentic.
    RecordUnverified,
    /// The record's signature recovers to its own address.
    RecordVerified,
    /// A link request is being written.
    LinkInProgress,
    /// The last operation failed.
    Error(ErrorKind),
}

impl EngineState {
    /// Whether a record is held (verified or not).
    pub fn has_record(&self) -> bool {
        matches!(self, Self::RecordUnverified | Self::RecordVerified)
    }

    /// Whether an operation is running.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Loading | Self::LinkInProgress)
    }

    /// The error kind, if in `Error`.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Whether `self → to` is a valid transition.
    pub fn can_transition_to(&self, to: &EngineState) -> bool {
        use EngineState::*;
        match (self, to) {
            (_, NoSession) => true,
            (NoSession, Loading) => true,
            (NoSession, _) => false,
            (_, LinkInProgress) | (_, Error(_)) => true,
            (Loading, NoRecord) | (Loading, RecordUnverified) => true,
            (RecordUnverified, RecordVerified) => true,
            (RecordVerified, RecordUnverified) => true,
            (NoRecord | RecordUnverified | RecordVerified | LinkInProgress | Error(_), Loading) => {
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSession => write!(f, "NO_SESSION"),
            Self::Loading => write!(f, "LOADING"),
            Self::NoRecord => write!(f, "NO_RECORD"),
            Self::RecordUnverified => write!(f, "RECORD_UNVERIFIED"),
            Self::RecordVerified => write!(f, "RECORD_VERIFIED"),
            Self::LinkInProgress => write!(f, "LINK_IN_PROGRESS"),
            Self::Error(kind) => write!(f, "ERROR_{kind}"),
        }
    }
}

// ─── Transition Log ──────────────────────────────────────────────────

/// Record of an engine state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State before the transition.
    pub from_state: EngineState,
    /// State after the transition.
    pub to_state: EngineState,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
    /// Reason for the transition.
    pub reason: String,
}

/// The engine state plus its recent transition history.
///
/// Enforces valid transitions. Invalid transitions are rejected with the
/// current and attempted states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationLifecycle {
    state: EngineState,
    transitions: Vec<TransitionRecord>,
}

impl Default for AttestationLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl AttestationLifecycle {
    /// Start in `NoSession`.
    pub fn new() -> Self {
        Self {
            state: EngineState::NoSession,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Ordered log of recent transitions, oldest first.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Move to `to`, validating the edge. Same-state moves are no-ops.
    pub fn transition(&mut self, to: EngineState, reason: &str) -> Result<(), EngineError> {
        if self.state == to {
            return Ok(());
        }
        if !self.state.can_transition_to(&to) {
            return Err(EngineError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.do_transition(to, reason);
        Ok(())
    }

    /// RECORD_UNVERIFIED → RECORD_VERIFIED.
    ///
    /// Requires an authentic verification result, so the verified state is
    /// only reachable through signature recovery.
    pub fn mark_verified(&mut self, result: &VerificationResult) -> Result<(), EngineError> {
        if self.state != EngineState::RecordUnverified || !result.is_authentic() {
            return Err(EngineError::InvalidTransition {
                from: self.state.to_string(),
                to: EngineState::RecordVerified.to_string(),
            });
        }
        self.do_transition(EngineState::RecordVerified, "signature recovered to record address");
        Ok(())
    }

    /// Record a state transition.
    fn do_transition(&mut self, to: EngineState, reason: &str) {
        tracing::info!(from = %self.state, to = %to, reason, "attestation state transition");
        self.transitions.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        if self.transitions.len() > MAX_TRANSITION_LOG {
            let excess = self.transitions.len() - MAX_TRANSITION_LOG;
            self.transitions.drain(..excess);
        }
        self.state = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::verify_record;
    use didlink_core::{AttestationRecord, Identity, RecordLocator, WalletAddress};
    use didlink_crypto::{build_message, WalletKeyPair};

    fn authentic_result() -> VerificationResult {
        let key = WalletKeyPair::generate();
        let identity = Identity::parse("did:plc:abc").unwrap();
        let sig = key.sign_message(&build_message(&identity, &key.address())).unwrap();
        let record = AttestationRecord {
            address: key.address(),
            signature: sig.to_hex(),
            locator: RecordLocator::parse("at://did:plc:abc/c/self").unwrap(),
        };
        verify_record(&identity, &record)
    }

    fn forged_result() -> VerificationResult {
        let identity = Identity::parse("did:plc:abc").unwrap();
        let record = AttestationRecord {
            address: WalletAddress::from_bytes([0xaa; 20]),
            signature: "0x00".into(),
            locator: RecordLocator::parse("at://did:plc:abc/c/self").unwrap(),
        };
        verify_record(&identity, &record)
    }

    #[test]
    fn starts_without_session() {
        let lc = AttestationLifecycle::new();
        assert_eq!(lc.state(), EngineState::NoSession);
        assert!(lc.transitions().is_empty());
    }

    #[test]
    fn happy_path_records_transitions() {
        let mut lc = AttestationLifecycle::new();
        lc.transition(EngineState::Loading, "session started").unwrap();
        lc.transition(EngineState::RecordUnverified, "record fetched").unwrap();
        lc.mark_verified(&authentic_result()).unwrap();
        assert_eq!(lc.state(), EngineState::RecordVerified);
        assert_eq!(lc.transitions().len(), 3);
        assert_eq!(lc.transitions()[2].from_state, EngineState::RecordUnverified);
        assert_eq!(lc.transitions()[2].to_state, EngineState::RecordVerified);
    }

    #[test]
    fn verified_requires_authentic_result() {
        let mut lc = AttestationLifecycle::new();
        lc.transition(EngineState::Loading, "session started").unwrap();
        lc.transition(EngineState::RecordUnverified, "record fetched").unwrap();
        assert!(lc.mark_verified(&forged_result()).is_err());
        assert_eq!(lc.state(), EngineState::RecordUnverified);
    }

    #[test]
    fn verified_is_not_reachable_by_plain_transition() {
        let mut lc = AttestationLifecycle::new();
        lc.transition(EngineState::Loading, "session started").unwrap();
        assert!(lc.transition(EngineState::RecordVerified, "shortcut").is_err());
        lc.transition(EngineState::NoRecord, "empty").unwrap();
        assert!(lc.transition(EngineState::RecordVerified, "shortcut").is_err());
        // mark_verified from the wrong state is rejected too.
        assert!(lc.mark_verified(&authentic_result()).is_err());
    }

    #[test]
    fn no_session_only_goes_to_loading() {
        let mut lc = AttestationLifecycle::new();
        for target in [
            EngineState::NoRecord,
            EngineState::RecordUnverified,
            EngineState::LinkInProgress,
            EngineState::Error(ErrorKind::Transport),
        ] {
            let err = lc.transition(target, "nope").unwrap_err();
            assert!(matches!(err, EngineError::InvalidTransition { .. }));
        }
        lc.transition(EngineState::Loading, "session").unwrap();
    }

    #[test]
    fn error_recovers_through_loading() {
        let mut lc = AttestationLifecycle::new();
        lc.transition(EngineState::Loading, "session").unwrap();
        lc.transition(EngineState::Error(ErrorKind::Transport), "503")
            .unwrap();
        assert!(lc.transition(EngineState::NoRecord, "skip").is_err());
        lc.transition(EngineState::Loading, "retry").unwrap();
        lc.transition(EngineState::NoRecord, "empty").unwrap();
    }

    #[test]
    fn every_state_can_end_session() {
        for from in [
            EngineState::Loading,
            EngineState::NoRecord,
            EngineState::RecordUnverified,
            EngineState::RecordVerified,
            EngineState::LinkInProgress,
            EngineState::Error(ErrorKind::Unauthorized),
        ] {
            assert!(from.can_transition_to(&EngineState::NoSession), "{from}");
            assert!(from.can_transition_to(&EngineState::LinkInProgress), "{from}");
        }
    }

    #[test]
    fn same_state_is_noop() {
        let mut lc = AttestationLifecycle::new();
        lc.transition(EngineState::NoSession, "again").unwrap();
        assert!(lc.transitions().is_empty());
    }

    #[test]
    fn log_is_bounded() {
        let mut lc = AttestationLifecycle::new();
        for _ in 0..200 {
            lc.transition(EngineState::Loading, "session").unwrap();
            lc.transition(EngineState::NoSession, "ended").unwrap();
        }
        assert_eq!(lc.transitions().len(), MAX_TRANSITION_LOG);
        assert_eq!(lc.transitions().last().unwrap().to_state, EngineState::NoSession);
    }

    #[test]
    fn store_errors_classify() {
        assert_eq!(
            ErrorKind::from_store(&StoreError::Unauthorized { reason: "x".into() }),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            ErrorKind::from_store(&StoreError::Transport {
                endpoint: "e".into(),
                reason: "503".into(),
                retryable: true
            }),
            ErrorKind::Transport
        );
        assert_eq!(
            ErrorKind::from_store(&StoreError::Transport {
                endpoint: "e".into(),
                reason: "418".into(),
                retryable: false
            }),
            ErrorKind::Store
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(EngineState::RecordVerified.to_string(), "RECORD_VERIFIED");
        assert_eq!(
            EngineState::Error(ErrorKind::SigningDeclined).to_string(),
            "ERROR_SIGNING_DECLINED"
        );
    }
}
