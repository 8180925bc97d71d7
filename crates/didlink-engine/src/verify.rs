//! # Verification and Reconciliation
//!
//! Recomputes a [`VerificationResult`] from a record, the session identity
//! and the current active wallet set. Results are derived and never
//! persisted; every fetch, wallet change and re-verify produces a new one.
//!
//! A result can only report `is_authentic = true` if the record's signature
//! was recovered and the recovered signer equals the record address.
//! Malformed signatures are reported as unauthentic, never as errors.

use didlink_core::{ActiveWallets, AttestationRecord, Identity, WalletAddress};
use didlink_crypto::{build_message, recover_signer};
use serde::Serialize;

/// Outcome of checking one attestation record.
///
/// Fields are private so a result can only be produced by [`verify_record`]
/// or [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    record_address: WalletAddress,
    signer_recovered: Option<WalletAddress>,
    is_authentic: bool,
    matches_active_wallet: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    malformed_signature: Option<String>,
}

impl VerificationResult {
    /// The address the record claims.
    pub fn record_address(&self) -> &WalletAddress {
        &self.record_address
    }

    /// The recovered signer, or `None` if the signature was malformed.
    pub fn signer_recovered(&self) -> Option<&WalletAddress> {
        self.signer_recovered.as_ref()
    }

    /// The recovered signer equals the record address.
    pub fn is_authentic(&self) -> bool {
        self.is_authentic
    }

    /// Authentic, and the record address is among the active wallets.
    pub fn matches_active_wallet(&self) -> bool {
        self.matches_active_wallet
    }

    /// Why recovery failed, if it did.
    pub fn malformed_signature(&self) -> Option<&str> {
        self.malformed_signature.as_deref()
    }

    /// The same result re-checked against another wallet set.
    pub fn against(&self, active: &ActiveWallets) -> Self {
        Self {
            matches_active_wallet: self.is_authentic && active.contains(&self.record_address),
            ..self.clone()
        }
    }
}

/// Recover the signer of `record` and compare it with the record address.
///
/// `matches_active_wallet` is always `false`; use [`reconcile`] to check the
/// active wallet set as well.
pub fn verify_record(identity: &Identity, record: &AttestationRecord) -> VerificationResult {
    let message = build_message(identity, &record.address);
    match recover_signer(&message, &record.signature) {
        Ok(signer) => {
            let is_authentic = signer == record.address;
            if !is_authentic {
                tracing::warn!(
                    did = %identity,
                    address = %record.address,
                    signer = %signer,
                    locator = %record.locator,
                    "attestation signer does not match record address"
                );
            }
            VerificationResult {
                record_address: record.address,
                signer_recovered: Some(signer),
                is_authentic,
                matches_active_wallet: false,
                malformed_signature: None,
            }
        }
        Err(e) => {
            tracing::warn!(
                did = %identity,
                locator = %record.locator,
                error = %e,
                "attestation signature is malformed"
            );
            VerificationResult {
                record_address: record.address,
                signer_recovered: None,
                is_authentic: false,
                matches_active_wallet: false,
                malformed_signature: Some(e.to_string()),
            }
        }
    }
}

/// Verify `record` and check it against the active wallet set.
pub fn reconcile(
    identity: &Identity,
    record: &AttestationRecord,
    active: &ActiveWallets,
) -> VerificationResult {
    verify_record(identity, record).against(active)
}
