//! # didlink-cli — Command-Line Interface
//!
//! Provides the `didlink` binary.
//!
//! ## Subcommands
//!
//! - `didlink keygen` — generate a secp256k1 wallet key.
//! - `didlink message` — print the binding message for a DID and address.
//! - `didlink sign` — sign the binding message with a local key.
//! - `didlink recover` — recover and check the signer of a signature.
//! - `didlink link` — write an attestation and verify it by reading it back.
//! - `didlink status` — fetch, verify and reconcile the current attestation.
//! - `didlink passkey register|show` — manage the passkey wallet record.
//!
//! ```bash
//! didlink keygen --out wallet.key
//! didlink sign --did did:plc:abc --key-file wallet.key
//! DIDLINK_ACCESS_TOKEN=... didlink link --did did:plc:abc --key-file wallet.key
//! didlink status --did did:plc:abc --wallet 0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed
//! ```

pub mod keys;
pub mod passkey;
pub mod repo;

use anyhow::{Context, Result};

/// Single-threaded runtime for repository commands.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
