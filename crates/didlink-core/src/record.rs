//! # Attestation Records
//!
//! The single per-identity attestation slot and its storage locator.
//!
//! Every identity owns exactly one attestation, stored under
//! [`WALLET_ATTESTATION_COLLECTION`] with the fixed record key
//! [`SELF_RECORD_KEY`]. A write replaces the prior record in place.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::WalletAddress;
use crate::error::ValidationError;
use crate::identity::Did;

/// Collection NSID holding wallet attestations.
pub const WALLET_ATTESTATION_COLLECTION: &str = "com.hypercert.walletAttestationTest";

/// Collection NSID holding the passkey-derived wallet address.
pub const PASSKEY_WALLET_COLLECTION: &str = "com.hypercert.walletPasskeyTest";

/// Record key of the single logical slot per identity.
pub const SELF_RECORD_KEY: &str = "self";

/// Storage location of a record: `at://<authority>/<collection>/<rkey>`.
///
/// Assigned by the store on write and treated as opaque afterwards.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RecordLocator(String);

impl RecordLocator {
    const SCHEME: &'static str = "at://";

    /// Parse an AT URI with exactly three non-empty path segments.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidLocator {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let rest = value
            .strip_prefix(Self::SCHEME)
            .ok_or_else(|| invalid("missing at:// scheme"))?;
        let segments: Vec<&str> = rest.split('/').collect();
        if segments.len() != 3 {
            return Err(invalid("expected authority/collection/rkey"));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty path segment"));
        }
        if rest.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
            return Err(invalid("illegal character"));
        }
        Ok(Self(value.to_string()))
    }

    /// Build the locator of a slot from its parts.
    pub fn for_slot(did: &Did, collection: &str, rkey: &str) -> Self {
        Self(format!("{}{}/{}/{}", Self::SCHEME, did, collection, rkey))
    }

    /// The full URI.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segment(&self, index: usize) -> &str {
        self.0[Self::SCHEME.len()..]
            .split('/')
            .nth(index)
            .unwrap_or_default()
    }

    /// The repository authority (normally the owner's DID).
    pub fn authority(&self) -> &str {
        self.segment(0)
    }

    /// The collection NSID.
    pub fn collection(&self) -> &str {
        self.segment(1)
    }

    /// The record key.
    pub fn rkey(&self) -> &str {
        self.segment(2)
    }
}

impl FromStr for RecordLocator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for RecordLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for RecordLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordLocator({})", self.0)
    }
}

impl Serialize for RecordLocator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordLocator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A stored claim that an identity controls `address`.
///
/// The signature is kept as the string the wallet produced. It is only
/// interpreted during recovery, so a malformed signature survives the read
/// path and is reported as unverified rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
    /// Claimed wallet, canonical form.
    pub address: WalletAddress,
    /// Signature over the binding message for `(identity, address)`.
    pub signature: String,
    /// Where the record lives.
    pub locator: RecordLocator,
}
