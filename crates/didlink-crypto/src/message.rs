//! # Binding Message
//!
//! The message a wallet signs to claim an identity:
//!
//! ```text
//! <did>,<0x + 40 EIP-55 checksummed hex digits>
//! ```
//!
//! DIDs cannot contain `,` and the address suffix has a fixed width, so the
//! pair is recoverable from the message and distinct pairs always produce
//! distinct messages.

use didlink_core::{keccak256, Did, Identity, WalletAddress};

const EIP191_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// A canonical binding message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttestationMessage(String);

impl AttestationMessage {
    /// Wrap an arbitrary message string (for recovering over messages built
    /// elsewhere).
    pub fn from_raw(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Split a well-formed binding message back into its pair.
    ///
    /// Returns `None` for messages not produced by [`build_message`].
    pub fn parts(&self) -> Option<(Did, WalletAddress)> {
        let (did, address) = self.0.rsplit_once(',')?;
        let did = Did::parse(did).ok()?;
        let address = WalletAddress::parse(address).ok()?;
        (address.to_checksum() == self.0[self.0.len() - 42..]).then_some((did, address))
    }

    /// EIP-191 digest of this message.
    pub fn digest(&self) -> [u8; 32] {
        eip191_hash(self.as_bytes())
    }
}

impl std::fmt::Display for AttestationMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the canonical binding message for `(identity.sub, address)`.
pub fn build_message(identity: &Identity, address: &WalletAddress) -> AttestationMessage {
    AttestationMessage(format!("{},{}", identity.sub(), address.to_checksum()))
}

/// EIP-191 `personal_sign` digest:
/// `keccak256("\x19Ethereum Signed Message:\n" + len(message) + message)`.
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(EIP191_PREFIX.len() + 20 + message.len());
    buf.extend_from_slice(EIP191_PREFIX.as_bytes());
    buf.extend_from_slice(message.len().to_string().as_bytes());
    buf.extend_from_slice(message);
    keccak256(&buf)
}
