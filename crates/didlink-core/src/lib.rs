//! # didlink-core — Foundational Types for DID ↔ Wallet Attestations
//!
//! Defines the type-system primitives every other didlink crate builds on.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated newtypes for identifiers.** `Did`, `WalletAddress` and
//!    `RecordLocator` can only be built through parsing constructors. There
//!    are no bare strings for identities or addresses past the boundary.
//!
//! 2. **One canonical address form.** `WalletAddress` stores the 20 raw
//!    bytes; equality is byte equality, and the only rendering is the EIP-55
//!    checksummed string. Case differences can never make two addresses
//!    compare unequal.
//!
//! 3. **Single attestation slot.** The collection NSID and the fixed record
//!    key live here as constants so the store and the engine cannot drift.
//!
//! 4. **Channel-blind wallet sets.** `ActiveWallets` is an unordered set of
//!    canonical addresses; it carries no memory of which channel produced an
//!    address.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `didlink-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod address;
pub mod digest;
pub mod error;
pub mod identity;
pub mod record;
pub mod wallets;

pub use address::WalletAddress;
pub use digest::keccak256;
pub use error::{CryptoError, ValidationError};
pub use identity::{Did, Identity};
pub use record::{
    AttestationRecord, RecordLocator, PASSKEY_WALLET_COLLECTION, SELF_RECORD_KEY,
    WALLET_ATTESTATION_COLLECTION,
};
pub use wallets::{ActiveWallets, WalletChannel};
