//! # didlink-crypto — Signature Codec
//!
//! Builds the canonical binding message for an `(identity, wallet)` pair and
//! recovers the signer of a wallet signature over it:
//!
//! - **Binding message**: `"{sub},{checksummed address}"`, injective over the
//!   pair.
//! - **EIP-191** `personal_sign` digest over Keccak-256.
//! - **secp256k1** signing and public-key recovery with `k256`.
//!
//! ## Crate Policy
//!
//! - Depends only on `didlink-core` internally.
//! - Every function is pure; no I/O, no logging.
//! - Recovery never guesses. Anything that is not a well-formed recoverable
//!   signature is `CryptoError::MalformedSignature`.
//! - No mocking of cryptographic operations in tests; all tests sign and
//!   recover with real keys.

pub mod message;
pub mod secp256k1;
pub mod signature;

pub use message::{build_message, eip191_hash, AttestationMessage};
pub use secp256k1::{recover_signer, WalletKeyPair};
pub use signature::RecoverableSignature;
