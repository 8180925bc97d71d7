//! # Canonical Wallet Addresses
//!
//! [`WalletAddress`] is a 20-byte account address. It is the only address
//! representation past the parsing boundary.
//!
//! ## Canonicalization
//!
//! - Input must be `0x` followed by exactly 40 hex digits.
//! - All-lowercase and all-uppercase digits are accepted as unchecksummed
//!   input and normalised.
//! - Mixed-case input is treated as checksummed and must match EIP-55
//!   exactly; a wrong checksum is rejected rather than silently accepted.
//! - Equality, ordering and hashing are over the raw bytes, so two spellings
//!   of the same account always compare equal.
//! - `Display` and `Serialize` always emit the EIP-55 checksummed string.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::keccak256;
use crate::error::ValidationError;

/// A canonical 20-byte wallet address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress([u8; 20]);

impl WalletAddress {
    /// Address length in bytes.
    pub const LEN: usize = 20;

    /// Wrap raw address bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The raw 20 address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse an address string, enforcing the EIP-55 checksum on mixed-case
    /// input.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let body = value
            .strip_prefix("0x")
            .ok_or_else(|| ValidationError::InvalidAddress {
                value: value.to_string(),
                reason: "missing 0x prefix".to_string(),
            })?;

        if body.len() != Self::LEN * 2 {
            return Err(ValidationError::InvalidAddress {
                value: value.to_string(),
                reason: format!("expected 40 hex digits, got {}", body.len()),
            });
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(body, &mut bytes).map_err(|e| ValidationError::InvalidAddress {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
        let address = Self(bytes);

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            let expected = address.to_checksum();
            if expected != value {
                return Err(ValidationError::ChecksumMismatch {
                    value: value.to_string(),
                    expected,
                });
            }
        }

        Ok(address)
    }

    /// Render the EIP-55 mixed-case checksummed form (`0x` + 40 digits).
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Lowercase rendering, used only for diagnostics.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for WalletAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl std::fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletAddress({})", self.to_checksum())
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
