//! # secp256k1 Wallet Keys and Signer Recovery
//!
//! - [`WalletKeyPair`] holds a secp256k1 signing key in process and produces
//!   EIP-191 signatures. Used by local signers and tests.
//! - [`recover_signer`] turns `(message, signature)` back into the address of
//!   the key that signed it.
//!
//! ## Security Invariant
//!
//! - Private keys are never serialized or logged. `WalletKeyPair` does not
//!   implement `Serialize` and its `Debug` shows only the address.
//! - Secret material handed out by [`WalletKeyPair::secret_hex`] is wrapped in
//!   `Zeroizing` and wiped on drop.
//! - A well-formed signature by a different key recovers a different address.
//!   It is not an error; callers compare addresses.

use didlink_core::{keccak256, CryptoError, WalletAddress};
use k256::ecdsa::{SigningKey, VerifyingKey};
use zeroize::{Zeroize, Zeroizing};

use crate::message::{eip191_hash, AttestationMessage};
use crate::signature::RecoverableSignature;

/// Derive the wallet address of a public key: the last 20 bytes of the
/// Keccak-256 of the uncompressed point without its `0x04` tag.
pub(crate) fn address_of(key: &VerifyingKey) -> WalletAddress {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    WalletAddress::from_bytes(bytes)
}

/// A secp256k1 key pair controlling one wallet address.
pub struct WalletKeyPair {
    signing_key: SigningKey,
}

impl WalletKeyPair {
    /// Generate a new random key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand_core::OsRng),
        }
    }

    /// Load a key pair from a 32-byte secret scalar.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|_| CryptoError::KeyError("secret scalar out of range".to_string()))?;
        Ok(Self { signing_key })
    }

    /// Load a key pair from a 64-digit hex secret, `0x` prefix optional.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let trimmed = hex.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if body.len() != 64 {
            return Err(CryptoError::KeyError(format!(
                "secret key hex must be 64 chars, got {}",
                body.len()
            )));
        }
        let mut secret = [0u8; 32];
        let decoded = hex::decode_to_slice(body, &mut secret)
            .map_err(|e| CryptoError::KeyError(e.to_string()));
        let result = decoded.and_then(|()| Self::from_bytes(&secret));
        secret.zeroize();
        result
    }

    /// The `0x`-prefixed hex secret. Wiped when the returned value drops.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        let mut secret: [u8; 32] = self.signing_key.to_bytes().into();
        let out = Zeroizing::new(format!("0x{}", hex::encode(secret)));
        secret.zeroize();
        out
    }

    /// The wallet address this key controls.
    pub fn address(&self) -> WalletAddress {
        address_of(self.signing_key.verifying_key())
    }

    /// EIP-191 `personal_sign` over arbitrary message bytes.
    pub fn sign_bytes(&self, message: &[u8]) -> Result<RecoverableSignature, CryptoError> {
        let digest = eip191_hash(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        Ok(RecoverableSignature::new(signature, recovery_id))
    }

    /// Sign a binding message.
    pub fn sign_message(
        &self,
        message: &AttestationMessage,
    ) -> Result<RecoverableSignature, CryptoError> {
        self.sign_bytes(message.as_bytes())
    }
}

impl std::fmt::Debug for WalletKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletKeyPair({}, <private>)", self.address())
    }
}

/// Recover the signer of `signature` over `message`.
///
/// Fails only with `CryptoError::MalformedSignature`.
pub fn recover_signer(
    message: &AttestationMessage,
    signature: &str,
) -> Result<WalletAddress, CryptoError> {
    RecoverableSignature::parse(signature)?.recover(message.as_bytes())
}
