//! # didlink-store — Attestation Storage
//!
//! Reads and writes the single attestation record each identity owns, plus
//! the passkey-derived wallet record:
//!
//! - [`AttestationStore`]: `get` / `put` over the fixed `self` slot.
//! - [`XrpcClient`]: typed AT Protocol repository client
//!   (`com.atproto.repo.getRecord` / `com.atproto.repo.putRecord`) with retry
//!   and status classification.
//! - [`XrpcAttestationStore`] and [`XrpcPasskeyRegistry`]: the two record
//!   kinds over one client.
//! - [`MemoryAttestationStore`] and [`MemoryPasskeyRegistry`]: in-process
//!   backends with fault injection, for tests and offline use.
//!
//! ## Wire Path Convention
//!
//! `{pds_url}/xrpc/{nsid}`. Writes always use `validate: false` since the
//! collections carry no published lexicon.
//!
//! ## Error Model
//!
//! `NotFound` is an ordinary outcome and never a transport failure. Record
//! values that fail validation surface as `MalformedRecord`, distinct from
//! both. See [`StoreError`].

pub mod attestation;
pub mod config;
pub mod error;
pub mod memory;
pub mod passkey;
pub(crate) mod retry;
pub mod types;
pub mod xrpc;

pub use attestation::{AttestationStore, XrpcAttestationStore};
pub use config::{ConfigError, RepoConfig};
pub use error::StoreError;
pub use memory::{MemoryAttestationStore, MemoryPasskeyRegistry};
pub use passkey::{PasskeyWalletRegistry, XrpcPasskeyRegistry};
pub use xrpc::XrpcClient;
