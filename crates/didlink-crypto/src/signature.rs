//! # Recoverable Signatures
//!
//! A secp256k1 ECDSA signature plus the parity bit needed to recover the
//! signer's public key.
//!
//! ## Accepted Encodings
//!
//! Hex, with or without a `0x` prefix:
//!
//! - 65 bytes `r ‖ s ‖ v` with `v ∈ {27, 28}`.
//! - 64 bytes EIP-2098 compact `r ‖ yParityAndS`, parity in the top bit of `s`.
//!
//! Anything else, including zero or out-of-range scalars, is
//! `CryptoError::MalformedSignature`. A raw `v` of 0 or 1 is rejected too: no
//! one-byte edit of a valid signature may yield an equivalent encoding.
//! Output is always the 65-byte form.

use didlink_core::{CryptoError, WalletAddress};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::message::eip191_hash;
use crate::secp256k1::address_of;

/// A parsed, range-checked recoverable signature.
#[derive(Clone, PartialEq, Eq)]
pub struct RecoverableSignature {
    signature: Signature,
    recovery_id: RecoveryId,
}

impl RecoverableSignature {
    /// Length of the full `r ‖ s ‖ v` encoding.
    pub const LEN: usize = 65;
    /// Length of the EIP-2098 compact encoding.
    pub const COMPACT_LEN: usize = 64;

    pub(crate) fn new(signature: Signature, recovery_id: RecoveryId) -> Self {
        Self {
            signature,
            recovery_id,
        }
    }

    /// Parse a hex-encoded signature.
    pub fn parse(value: &str) -> Result<Self, CryptoError> {
        let trimmed = value.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(body)
            .map_err(|e| CryptoError::MalformedSignature(format!("invalid hex: {e}")))?;
        Self::from_slice(&bytes)
    }

    /// Parse raw signature bytes in either accepted layout.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let mut rs = [0u8; 64];
        let y_odd = match bytes.len() {
            Self::LEN => {
                rs.copy_from_slice(&bytes[..64]);
                match bytes[64] {
                    27 => false,
                    28 => true,
                    v => {
                        return Err(CryptoError::MalformedSignature(format!(
                            "invalid recovery id {v}"
                        )))
                    }
                }
            }
            Self::COMPACT_LEN => {
                rs.copy_from_slice(bytes);
                let y_odd = rs[32] & 0x80 != 0;
                rs[32] &= 0x7f;
                y_odd
            }
            n => {
                return Err(CryptoError::MalformedSignature(format!(
                    "expected 64 or 65 bytes, got {n}"
                )))
            }
        };

        let signature = Signature::from_slice(&rs)
            .map_err(|_| CryptoError::MalformedSignature("r or s out of range".to_string()))?;
        Ok(Self::new(signature, RecoveryId::new(y_odd, false)))
    }

    /// The 65-byte `r ‖ s ‖ v` encoding with `v ∈ {27, 28}`.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&self.signature.to_bytes());
        out[64] = 27 + u8::from(self.recovery_id.is_y_odd());
        out
    }

    /// `0x`-prefixed lowercase hex of [`Self::to_bytes`].
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Recover the address that produced this signature over the EIP-191
    /// digest of `message`.
    ///
    /// High-`s` signatures are normalised first, flipping the parity bit to
    /// keep the same recovered key.
    pub fn recover(&self, message: &[u8]) -> Result<WalletAddress, CryptoError> {
        let (signature, recovery_id) = match self.signature.normalize_s() {
            Some(low_s) => (
                low_s,
                RecoveryId::new(!self.recovery_id.is_y_odd(), self.recovery_id.is_x_reduced()),
            ),
            None => (self.signature.clone(), self.recovery_id),
        };

        let digest = eip191_hash(message);
        let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id).map_err(
            |_| CryptoError::MalformedSignature("no public key recoverable".to_string()),
        )?;
        Ok(address_of(&key))
    }
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex = self.to_hex();
        write!(f, "RecoverableSignature({}...)", &hex[..18])
    }
}

impl std::fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::parse(&hex).map_err(serde::de::Error::custom)
    }
}
