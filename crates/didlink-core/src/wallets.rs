//! # Active Wallet Sets
//!
//! [`ActiveWallets`] is the set of addresses the caller controls right now,
//! merged from every wallet channel. It is rebuilt for each reconciliation
//! and never cached across checks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::address::WalletAddress;

/// Channel through which a wallet became active.
///
/// Used for logging and source labelling only. Reconciliation never looks
/// at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletChannel {
    /// An externally connected wallet.
    Connected,
    /// A custodial wallet embedded by the login provider.
    Embedded,
    /// A wallet derived from a passkey.
    Passkey,
}

impl std::fmt::Display for WalletChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connected => "connected",
            Self::Embedded => "embedded",
            Self::Passkey => "passkey",
        };
        f.write_str(s)
    }
}

/// Unordered set of canonical wallet addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWallets(BTreeSet<WalletAddress>);

impl ActiveWallets {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address. Returns `false` if it was already present.
    pub fn insert(&mut self, address: WalletAddress) -> bool {
        self.0.insert(address)
    }

    /// Remove an address. Returns `true` if it was present.
    pub fn remove(&mut self, address: &WalletAddress) -> bool {
        self.0.remove(address)
    }

    /// Canonical membership test.
    pub fn contains(&self, address: &WalletAddress) -> bool {
        self.0.contains(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WalletAddress> {
        self.0.iter()
    }

    /// Union with another set.
    pub fn merge(&mut self, other: ActiveWallets) {
        self.0.extend(other.0);
    }

    /// `true` if every address in `self` is also in `other`.
    pub fn is_subset(&self, other: &ActiveWallets) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl FromIterator<WalletAddress> for ActiveWallets {
    fn from_iter<I: IntoIterator<Item = WalletAddress>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<WalletAddress> for ActiveWallets {
    fn extend<I: IntoIterator<Item = WalletAddress>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ActiveWallets {
    type Item = WalletAddress;
    type IntoIter = std::collections::btree_set::IntoIter<WalletAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
