//! # Reconciliation View
//!
//! Pure projection of engine state into user-facing status. No I/O and no
//! side effects; the same inputs always produce the same view.
//!
//! Flags are conservative: a flag is only set when both the state and the
//! verification result support it, so a stale result can never show a
//! record as verified while the engine is loading or in error.

use serde::Serialize;

use crate::state::EngineState;
use crate::verify::VerificationResult;

/// The three status flags shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusFlags {
    pub record_present: bool,
    pub record_verified: bool,
    pub active_wallet_matches: bool,
}

/// Project state and result into [`StatusFlags`].
pub fn project(state: &EngineState, result: Option<&VerificationResult>) -> StatusFlags {
    let result = result.filter(|_| state.has_record());
    let record_present = result.is_some();
    let record_verified =
        *state == EngineState::RecordVerified && result.is_some_and(|r| r.is_authentic());
    let active_wallet_matches =
        record_verified && result.is_some_and(|r| r.matches_active_wallet());
    StatusFlags {
        record_present,
        record_verified,
        active_wallet_matches,
    }
}

/// Flags plus the strings the status panel renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub state: String,
    pub flags: StatusFlags,
    /// Record badge; `None` when there is no record to badge.
    pub record_badge: Option<&'static str>,
    /// Active wallet comparison; `None` unless the record is verified.
    pub wallet_badge: Option<&'static str>,
    /// The linked-wallet line.
    pub record_line: String,
    /// Label of the link button.
    pub link_cta: &'static str,
    /// Whether a re-verify action makes sense.
    pub offers_reverify: bool,
}

impl StatusView {
    pub fn project(state: &EngineState, result: Option<&VerificationResult>) -> Self {
        let flags = project(state, result);
        let shown = result.filter(|_| flags.record_present);

        let record_badge = match state {
            EngineState::Loading if result.is_some() => Some("Checking…"),
            _ if flags.record_verified => Some("wallet ownership verified"),
            _ if flags.record_present => Some("Record unverified"),
            _ => None,
        };

        let wallet_badge = flags.record_verified.then_some(if flags.active_wallet_matches {
            "Current wallet = attested wallet"
        } else {
            "Current wallet != attested wallet"
        });

        let record_line = match (state, shown) {
            (EngineState::Loading, _) => "Loading…".to_string(),
            (EngineState::Error(kind), _) => kind.describe().to_string(),
            (_, Some(r)) => r.record_address().to_string(),
            _ => "None linked yet.".to_string(),
        };

        let link_cta = match state {
            EngineState::LinkInProgress => "Linking…",
            _ if flags.record_present => "Update linked wallet",
            _ => "Link wallet to DID",
        };

        Self {
            state: state.to_string(),
            flags,
            record_badge,
            wallet_badge,
            record_line,
            link_cta,
            offers_reverify: flags.record_present,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ErrorKind;
    use crate::verify::{reconcile, verify_record};
    use didlink_core::{ActiveWallets, AttestationRecord, Identity, RecordLocator, WalletAddress};
    use didlink_crypto::{build_message, WalletKeyPair};

    fn identity() -> Identity {
        Identity::parse("did:plc:abc").unwrap()
    }

    fn record(address: WalletAddress, signature: String) -> AttestationRecord {
        AttestationRecord {
            address,
            signature,
            locator: RecordLocator::parse("at://did:plc:abc/c/self").unwrap(),
        }
    }

    fn authentic(active: bool) -> VerificationResult {
        let key = WalletKeyPair::generate();
        let sig = key
            .sign_message(&build_message(&identity(), &key.address()))
            .unwrap();
        let wallets: ActiveWallets = if active {
            [key.address()].into_iter().collect()
        } else {
            ActiveWallets::new()
        };
        reconcile(&identity(), &record(key.address(), sig.to_hex()), &wallets)
    }

    fn forged() -> VerificationResult {
        verify_record(
            &identity(),
            &record(WalletAddress::from_bytes([0xaa; 20]), "0x01".into()),
        )
    }

    #[test]
    fn no_record_shows_none_linked() {
        let view = StatusView::project(&EngineState::NoRecord, None);
        assert_eq!(view.flags, StatusFlags::default());
        assert_eq!(view.record_line, "None linked yet.");
        assert_eq!(view.link_cta, "Link wallet to DID");
        assert_eq!(view.record_badge, None);
        assert!(!view.offers_reverify);
    }

    #[test]
    fn verified_and_matching() {
        let result = authentic(true);
        let view = StatusView::project(&EngineState::RecordVerified, Some(&result));
        assert_eq!(
            view.flags,
            StatusFlags {
                record_present: true,
                record_verified: true,
                active_wallet_matches: true
            }
        );
        assert_eq!(view.record_badge, Some("wallet ownership verified"));
        assert_eq!(view.wallet_badge, Some("Current wallet = attested wallet"));
        assert_eq!(view.record_line, result.record_address().to_checksum());
        assert_eq!(view.link_cta, "Update linked wallet");
    }

    #[test]
    fn verified_without_active_match() {
        let result = authentic(false);
        let view = StatusView::project(&EngineState::RecordVerified, Some(&result));
        assert!(view.flags.record_verified);
        assert!(!view.flags.active_wallet_matches);
        assert_eq!(view.wallet_badge, Some("Current wallet != attested wallet"));
    }

    #[test]
    fn unverified_record_is_present_not_verified() {
        let result = forged();
        let view = StatusView::project(&EngineState::RecordUnverified, Some(&result));
        assert!(view.flags.record_present);
        assert!(!view.flags.record_verified);
        assert_eq!(view.record_badge, Some("Record unverified"));
        assert_eq!(view.wallet_badge, None);
        assert!(view.offers_reverify);
    }

    #[test]
    fn stale_result_does_not_leak_into_other_states() {
        let result = authentic(true);
        for state in [
            EngineState::Loading,
            EngineState::NoRecord,
            EngineState::LinkInProgress,
            EngineState::Error(ErrorKind::Transport),
            EngineState::NoSession,
        ] {
            assert_eq!(project(&state, Some(&result)), StatusFlags::default(), "{state}");
        }
        // Inauthentic result cannot be shown as verified even in RecordVerified.
        let flags = project(&EngineState::RecordVerified, Some(&forged()));
        assert!(!flags.record_verified);
    }

    #[test]
    fn loading_and_error_lines() {
        let result = authentic(true);
        let loading = StatusView::project(&EngineState::Loading, Some(&result));
        assert_eq!(loading.record_line, "Loading…");
        assert_eq!(loading.record_badge, Some("Checking…"));

        let error = StatusView::project(&EngineState::Error(ErrorKind::Unauthorized), None);
        assert_eq!(error.record_line, ErrorKind::Unauthorized.describe());

        let linking = StatusView::project(&EngineState::LinkInProgress, None);
        assert_eq!(linking.link_cta, "Linking…");
    }
}
