//! # Active Wallet Sources
//!
//! Each wallet channel (connected wallet, embedded wallet, passkey wallet)
//! is an [`ActiveWalletSource`]. The engine merges every source into one
//! [`ActiveWallets`] set on each reconciliation and never caches the result.
//! Which channel contributed an address is not retained.
//!
//! A failing source is logged and contributes nothing. Missing an address
//! can only turn `matches_active_wallet` off, never on.

use std::sync::Arc;

use async_trait::async_trait;
use didlink_core::{ActiveWallets, Identity, WalletAddress, WalletChannel};
use didlink_store::PasskeyWalletRegistry;
use parking_lot::RwLock;

use crate::error::SourceError;

/// A provider of wallets the caller currently controls.
#[async_trait]
pub trait ActiveWalletSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// The channel this source represents.
    fn channel(&self) -> WalletChannel;

    /// Addresses currently available through this channel.
    async fn active_wallets(&self, identity: &Identity)
        -> Result<Vec<WalletAddress>, SourceError>;
}

/// Merge every source into one set.
pub async fn collect_active_wallets(
    identity: &Identity,
    sources: &[Arc<dyn ActiveWalletSource>],
) -> ActiveWallets {
    let mut wallets = ActiveWallets::new();
    for source in sources {
        match source.active_wallets(identity).await {
            Ok(addresses) => {
                tracing::debug!(
                    source = source.name(),
                    channel = %source.channel(),
                    count = addresses.len(),
                    "active wallets collected"
                );
                wallets.extend(addresses);
            }
            Err(e) => {
                tracing::warn!(
                    source = source.name(),
                    channel = %source.channel(),
                    error = %e,
                    "active wallet source failed; skipping"
                );
            }
        }
    }
    wallets
}

/// A source whose wallets are set by the host (connected or embedded).
#[derive(Debug)]
pub struct StaticWalletSource {
    name: String,
    channel: WalletChannel,
    wallets: RwLock<Vec<WalletAddress>>,
}

impl StaticWalletSource {
    pub fn new(name: impl Into<String>, channel: WalletChannel) -> Self {
        Self {
            name: name.into(),
            channel,
            wallets: RwLock::new(Vec::new()),
        }
    }

    /// Replace the current wallets.
    pub fn set(&self, wallets: impl IntoIterator<Item = WalletAddress>) {
        *self.wallets.write() = wallets.into_iter().collect();
    }

    /// Disconnect every wallet.
    pub fn clear(&self) {
        self.wallets.write().clear();
    }
}

#[async_trait]
impl ActiveWalletSource for StaticWalletSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel(&self) -> WalletChannel {
        self.channel
    }

    async fn active_wallets(
        &self,
        _identity: &Identity,
    ) -> Result<Vec<WalletAddress>, SourceError> {
        Ok(self.wallets.read().clone())
    }
}

/// The passkey-derived wallet, looked up in the identity's repository.
pub struct PasskeyWalletSource {
    registry: Arc<dyn PasskeyWalletRegistry>,
}

impl PasskeyWalletSource {
    pub fn new(registry: Arc<dyn PasskeyWalletRegistry>) -> Self {
        Self { registry }
    }
}

impl std::fmt::Debug for PasskeyWalletSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasskeyWalletSource")
    }
}

#[async_trait]
impl ActiveWalletSource for PasskeyWalletSource {
    fn name(&self) -> &str {
        "passkey"
    }

    fn channel(&self) -> WalletChannel {
        WalletChannel::Passkey
    }

    async fn active_wallets(
        &self,
        identity: &Identity,
    ) -> Result<Vec<WalletAddress>, SourceError> {
        self.registry
            .lookup(identity)
            .await
            .map(|found| found.into_iter().collect())
            .map_err(|e| SourceError {
                source_name: self.name().to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use didlink_store::{MemoryPasskeyRegistry, StoreError};

    fn identity() -> Identity {
        Identity::parse("did:plc:abc").unwrap()
    }

    fn addr(byte: u8) -> WalletAddress {
        WalletAddress::from_bytes([byte; 20])
    }

    #[tokio::test]
    async fn merges_channels_into_one_set() {
        let connected = Arc::new(StaticWalletSource::new("connected", WalletChannel::Connected));
        connected.set([addr(1), addr(2)]);
        let embedded = Arc::new(StaticWalletSource::new("embedded", WalletChannel::Embedded));
        embedded.set([addr(2), addr(3)]);
        let registry = Arc::new(MemoryPasskeyRegistry::new());
        registry.register(&identity(), &addr(4)).await.unwrap();

        let sources: Vec<Arc<dyn ActiveWalletSource>> = vec![
            connected,
            embedded,
            Arc::new(PasskeyWalletSource::new(registry)),
        ];
        let wallets = collect_active_wallets(&identity(), &sources).await;
        assert_eq!(wallets.len(), 4);
        for b in 1..=4 {
            assert!(wallets.contains(&addr(b)));
        }
    }

    #[tokio::test]
    async fn failing_source_contributes_nothing() {
        let connected = Arc::new(StaticWalletSource::new("connected", WalletChannel::Connected));
        connected.set([addr(1)]);
        let registry = Arc::new(MemoryPasskeyRegistry::new());
        registry.register(&identity(), &addr(4)).await.unwrap();
        registry.fail_next_lookup(StoreError::Transport {
            endpoint: "getRecord".into(),
            reason: "503".into(),
            retryable: true,
        });

        let sources: Vec<Arc<dyn ActiveWalletSource>> =
            vec![connected, Arc::new(PasskeyWalletSource::new(registry))];
        let wallets = collect_active_wallets(&identity(), &sources).await;
        assert_eq!(wallets.len(), 1);
        assert!(wallets.contains(&addr(1)));
    }

    #[tokio::test]
    async fn cleared_source_is_empty() {
        let source = StaticWalletSource::new("connected", WalletChannel::Connected);
        source.set([addr(1)]);
        source.clear();
        assert!(source.active_wallets(&identity()).await.unwrap().is_empty());
        assert!(collect_active_wallets(&identity(), &[]).await.is_empty());
    }
}
