//! # Passkey Wallet Registry
//!
//! Records the address of the wallet derived from a user's passkey, so the
//! passkey channel can contribute it to the active wallet set on later
//! sessions. One slot per identity in [`PASSKEY_WALLET_COLLECTION`] under
//! [`SELF_RECORD_KEY`], value `{"$type", "address"}`.

use async_trait::async_trait;
use didlink_core::{
    Identity, RecordLocator, WalletAddress, PASSKEY_WALLET_COLLECTION, SELF_RECORD_KEY,
};

use crate::error::StoreError;
use crate::types::PasskeyWalletValue;
use crate::xrpc::XrpcClient;

/// Per-identity registry of the passkey-derived wallet.
#[async_trait]
pub trait PasskeyWalletRegistry: Send + Sync {
    /// Record `address` as the identity's passkey wallet, replacing any
    /// previous one.
    async fn register(
        &self,
        identity: &Identity,
        address: &WalletAddress,
    ) -> Result<RecordLocator, StoreError>;

    /// The registered passkey wallet, or `None` if the slot is empty.
    async fn lookup(&self, identity: &Identity) -> Result<Option<WalletAddress>, StoreError>;
}

/// [`PasskeyWalletRegistry`] over an AT Protocol repository.
#[derive(Debug, Clone)]
pub struct XrpcPasskeyRegistry {
    client: XrpcClient,
}

impl XrpcPasskeyRegistry {
    pub fn new(client: XrpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PasskeyWalletRegistry for XrpcPasskeyRegistry {
    async fn register(
        &self,
        identity: &Identity,
        address: &WalletAddress,
    ) -> Result<RecordLocator, StoreError> {
        let value = PasskeyWalletValue {
            record_type: PASSKEY_WALLET_COLLECTION.to_string(),
            address: address.to_checksum(),
        };
        let value = serde_json::to_value(value).map_err(|e| StoreError::Transport {
            endpoint: "encode passkey wallet".into(),
            reason: e.to_string(),
            retryable: false,
        })?;
        let locator = self
            .client
            .put_record(identity.sub(), PASSKEY_WALLET_COLLECTION, SELF_RECORD_KEY, value)
            .await?;
        tracing::info!(did = %identity, address = %address, "passkey wallet registered");
        Ok(locator)
    }

    async fn lookup(&self, identity: &Identity) -> Result<Option<WalletAddress>, StoreError> {
        let fetched = match self
            .client
            .get_record(identity.sub(), PASSKEY_WALLET_COLLECTION, SELF_RECORD_KEY)
            .await
        {
            Ok(fetched) => fetched,
            Err(StoreError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let value: PasskeyWalletValue =
            serde_json::from_value(fetched.value).map_err(|e| StoreError::MalformedRecord {
                locator: fetched.locator.to_string(),
                reason: e.to_string(),
            })?;
        if value.record_type != PASSKEY_WALLET_COLLECTION {
            return Err(StoreError::MalformedRecord {
                locator: fetched.locator.to_string(),
                reason: format!("unexpected $type {}", value.record_type),
            });
        }
        WalletAddress::parse(&value.address)
            .map(Some)
            .map_err(|e| StoreError::MalformedRecord {
                locator: fetched.locator.to_string(),
                reason: e.to_string(),
            })
    }
}
