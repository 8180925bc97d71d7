//! # In-Memory Backends
//!
//! Process-local implementations of [`AttestationStore`] and
//! [`PasskeyWalletRegistry`], used by tests and offline tooling.
//!
//! Values are held as the raw strings a repository would hold, so tests can
//! plant records a real client would never write (bad addresses, forged
//! signatures). Failures can be queued per operation, and reads can be
//! delayed to hold an operation in flight.
//!
//! Lock discipline: the `parking_lot` lock is never held across an `.await`.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use didlink_core::{
    AttestationRecord, Did, Identity, RecordLocator, WalletAddress, PASSKEY_WALLET_COLLECTION,
    SELF_RECORD_KEY, WALLET_ATTESTATION_COLLECTION,
};
use parking_lot::RwLock;

use crate::attestation::{parse_attestation_value, AttestationStore};
use crate::error::StoreError;
use crate::passkey::PasskeyWalletRegistry;

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<Did, serde_json::Value>,
    get_faults: VecDeque<StoreError>,
    put_faults: VecDeque<StoreError>,
    get_delay: Option<Duration>,
    gets: usize,
    puts: usize,
}

/// In-memory [`AttestationStore`].
#[derive(Debug, Default)]
pub struct MemoryAttestationStore {
    state: RwLock<MemoryState>,
}

impl MemoryAttestationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locator(did: &Did) -> RecordLocator {
        RecordLocator::for_slot(did, WALLET_ATTESTATION_COLLECTION, SELF_RECORD_KEY)
    }

    /// Store a raw record value, bypassing address canonicalization.
    pub fn insert_raw(&self, identity: &Identity, address: &str, signature: &str) {
        self.insert_value(
            identity,
            serde_json::json!({
                "$type": WALLET_ATTESTATION_COLLECTION,
                "address": address,
                "attestation": signature,
            }),
        );
    }

    /// Store an arbitrary JSON value in the identity's slot.
    pub fn insert_value(&self, identity: &Identity, value: serde_json::Value) {
        self.state
            .write()
            .records
            .insert(identity.sub().clone(), value);
    }

    /// Queue a failure for the next `get`.
    pub fn fail_next_get(&self, error: StoreError) {
        self.state.write().get_faults.push_back(error);
    }

    /// Queue a failure for the next `put`.
    pub fn fail_next_put(&self, error: StoreError) {
        self.state.write().put_faults.push_back(error);
    }

    /// Delay every subsequent `get` by `delay` (`None` to clear).
    pub fn set_get_delay(&self, delay: Option<Duration>) {
        self.state.write().get_delay = delay;
    }

    /// Number of `get` calls served, including failed ones.
    pub fn get_count(&self) -> usize {
        self.state.read().gets
    }

    /// Number of `put` calls served, including failed ones.
    pub fn put_count(&self) -> usize {
        self.state.read().puts
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }
}

#[async_trait]
impl AttestationStore for MemoryAttestationStore {
    async fn get(&self, identity: &Identity) -> Result<AttestationRecord, StoreError> {
        let delay = self.state.read().get_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let value = {
            let mut state = self.state.write();
            state.gets += 1;
            if let Some(fault) = state.get_faults.pop_front() {
                return Err(fault);
            }
            state.records.get(identity.sub()).cloned()
        };

        match value {
            Some(value) => parse_attestation_value(&Self::locator(identity.sub()), &value),
            None => Err(StoreError::NotFound {
                collection: WALLET_ATTESTATION_COLLECTION.to_string(),
                rkey: SELF_RECORD_KEY.to_string(),
            }),
        }
    }

    async fn put(
        &self,
        identity: &Identity,
        address: &WalletAddress,
        signature: &str,
    ) -> Result<RecordLocator, StoreError> {
        {
            let mut state = self.state.write();
            state.puts += 1;
            if let Some(fault) = state.put_faults.pop_front() {
                return Err(fault);
            }
        }
        self.insert_raw(identity, &address.to_checksum(), signature);
        Ok(Self::locator(identity.sub()))
    }
}

/// In-memory [`PasskeyWalletRegistry`].
#[derive(Debug, Default)]
pub struct MemoryPasskeyRegistry {
    wallets: RwLock<HashMap<Did, WalletAddress>>,
    lookup_faults: RwLock<VecDeque<StoreError>>,
}

impl MemoryPasskeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next `lookup`.
    pub fn fail_next_lookup(&self, error: StoreError) {
        self.lookup_faults.write().push_back(error);
    }
}

#[async_trait]
impl PasskeyWalletRegistry for MemoryPasskeyRegistry {
    async fn register(
        &self,
        identity: &Identity,
        address: &WalletAddress,
    ) -> Result<RecordLocator, StoreError> {
        self.wallets.write().insert(identity.sub().clone(), *address);
        Ok(RecordLocator::for_slot(
            identity.sub(),
            PASSKEY_WALLET_COLLECTION,
            SELF_RECORD_KEY,
        ))
    }

    async fn lookup(&self, identity: &Identity) -> Result<Option<WalletAddress>, StoreError> {
        if let Some(fault) = self.lookup_faults.write().pop_front() {
            return Err(fault);
        }
        Ok(self.wallets.read().get(identity.sub()).copied())
    }
}
