//! # didlink-engine — Attestation Lifecycle Engine
//!
//! Drives one session's attestation through fetch, link and re-verify:
//!
//! - [`state`]: the lifecycle state machine with a bounded transition log.
//! - [`verify`]: signature recovery and reconciliation against the active
//!   wallet set.
//! - [`view`]: pure projection into status flags and status text.
//! - [`sources`]: active wallet channels merged into one set.
//! - [`signer`]: the wallet signer interface and an in-process signer.
//! - [`engine`]: the orchestrator tying store, sources and state together.
//!
//! ## Crate Policy
//!
//! - `RecordVerified` is only entered with an authentic
//!   [`VerificationResult`]; there is no other path.
//! - Failures degrade to a conservative state and are never reported as
//!   verified.
//! - No locks are held across `.await`.

pub mod engine;
pub mod error;
pub mod signer;
pub mod sources;
pub mod state;
pub mod verify;
pub mod view;

pub use engine::{AttestationEngine, EngineConfig, EngineSnapshot};
pub use error::{EngineError, SignerError, SourceError};
pub use signer::{LocalKeySigner, WalletSigner};
pub use sources::{
    collect_active_wallets, ActiveWalletSource, PasskeyWalletSource, StaticWalletSource,
};
pub use state::{AttestationLifecycle, EngineState, ErrorKind, TransitionRecord};
pub use verify::{reconcile, verify_record, VerificationResult};
pub use view::{project, StatusFlags, StatusView};
