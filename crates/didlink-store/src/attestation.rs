//! # Attestation Store
//!
//! The [`AttestationStore`] trait and its XRPC implementation.
//!
//! Each identity has one slot: collection
//! [`WALLET_ATTESTATION_COLLECTION`], record key [`SELF_RECORD_KEY`]. `put`
//! replaces that slot in place and is safe to repeat. There is no delete.

use std::sync::Arc;

use async_trait::async_trait;
use didlink_core::{
    AttestationRecord, Identity, RecordLocator, WalletAddress, SELF_RECORD_KEY,
    WALLET_ATTESTATION_COLLECTION,
};

use crate::error::StoreError;
use crate::types::WalletAttestationValue;
use crate::xrpc::XrpcClient;

/// Persistence for the per-identity attestation slot.
///
/// Implementations must be `Send + Sync` so engines can share them across
/// tasks. Single writer per identity; no optimistic concurrency.
#[async_trait]
pub trait AttestationStore: Send + Sync {
    /// Fetch the identity's attestation.
    ///
    /// `StoreError::NotFound` means the slot is empty.
    async fn get(&self, identity: &Identity) -> Result<AttestationRecord, StoreError>;

    /// Create or replace the identity's attestation. Returns the record's
    /// locator.
    async fn put(
        &self,
        identity: &Identity,
        address: &WalletAddress,
        signature: &str,
    ) -> Result<RecordLocator, StoreError>;
}

#[async_trait]
impl<T: AttestationStore + ?Sized> AttestationStore for Arc<T> {
    async fn get(&self, identity: &Identity) -> Result<AttestationRecord, StoreError> {
        (**self).get(identity).await
    }

    async fn put(
        &self,
        identity: &Identity,
        address: &WalletAddress,
        signature: &str,
    ) -> Result<RecordLocator, StoreError> {
        (**self).put(identity, address, signature).await
    }
}

/// Build the stored value for an attestation.
pub fn attestation_value(address: &WalletAddress, signature: &str) -> WalletAttestationValue {
    WalletAttestationValue {
        record_type: WALLET_ATTESTATION_COLLECTION.to_string(),
        address: address.to_checksum(),
        attestation: signature.to_string(),
    }
}

/// Validate a fetched attestation value.
///
/// `$type` must match when present. `address` must parse as a wallet
/// address and `attestation` must be a non-empty string. The signature is
/// not interpreted here.
pub fn parse_attestation_value(
    locator: &RecordLocator,
    value: &serde_json::Value,
) -> Result<AttestationRecord, StoreError> {
    let malformed = |reason: String| StoreError::MalformedRecord {
        locator: locator.to_string(),
        reason,
    };

    let object = value
        .as_object()
        .ok_or_else(|| malformed("value is not an object".into()))?;

    if let Some(record_type) = object.get("$type") {
        if record_type.as_str() != Some(WALLET_ATTESTATION_COLLECTION) {
            return Err(malformed(format!("unexpected $type {record_type}")));
        }
    }

    let address = object
        .get("address")
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed("missing address".into()))?;
    let address = WalletAddress::parse(address).map_err(|e| malformed(e.to_string()))?;

    let signature = object
        .get("attestation")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("missing attestation".into()))?;

    Ok(AttestationRecord {
        address,
        signature: signature.to_string(),
        locator: locator.clone(),
    })
}

/// [`AttestationStore`] over an AT Protocol repository.
#[derive(Debug, Clone)]
pub struct XrpcAttestationStore {
    client: XrpcClient,
}

impl XrpcAttestationStore {
    pub fn new(client: XrpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AttestationStore for XrpcAttestationStore {
    async fn get(&self, identity: &Identity) -> Result<AttestationRecord, StoreError> {
        let fetched = self
            .client
            .get_record(identity.sub(), WALLET_ATTESTATION_COLLECTION, SELF_RECORD_KEY)
            .await?;
        parse_attestation_value(&fetched.locator, &fetched.value)
    }

    async fn put(
        &self,
        identity: &Identity,
        address: &WalletAddress,
        signature: &str,
    ) -> Result<RecordLocator, StoreError> {
        let value = serde_json::to_value(attestation_value(address, signature)).map_err(|e| {
            StoreError::Transport {
                endpoint: "encode attestation".into(),
                reason: e.to_string(),
                retryable: false,
            }
        })?;
        let locator = self
            .client
            .put_record(
                identity.sub(),
                WALLET_ATTESTATION_COLLECTION,
                SELF_RECORD_KEY,
                value,
            )
            .await?;
        tracing::info!(did = %identity, address = %address, locator = %locator, "attestation written");
        Ok(locator)
    }
}
