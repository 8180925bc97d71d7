//! Wallet signer interface.
//!
//! The engine never holds wallet keys. A [`WalletSigner`] is asked to sign
//! the binding message and may decline.

use async_trait::async_trait;
use didlink_core::WalletAddress;
use didlink_crypto::{AttestationMessage, WalletKeyPair};

use crate::error::SignerError;

/// Produces `personal_sign` signatures over binding messages.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The address the signer will sign with.
    fn address(&self) -> WalletAddress;

    /// Sign `message`, returning the hex signature string.
    async fn sign_message(&self, message: &AttestationMessage) -> Result<String, SignerError>;
}

/// A signer over an in-process secp256k1 key.
#[derive(Debug)]
pub struct LocalKeySigner {
    key: WalletKeyPair,
}

impl LocalKeySigner {
    pub fn new(key: WalletKeyPair) -> Self {
        Self { key }
    }
}

#[async_trait]
impl WalletSigner for LocalKeySigner {
    fn address(&self) -> WalletAddress {
        self.key.address()
    }

    async fn sign_message(&self, message: &AttestationMessage) -> Result<String, SignerError> {
        self.key
            .sign_message(message)
            .map(|sig| sig.to_hex())
            .map_err(|e| SignerError::Failed {
                reason: e.to_string(),
            })
    }
}
