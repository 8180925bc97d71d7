//! Wire types for `com.atproto.repo.*` and the didlink record values.

use serde::{Deserialize, Serialize};

/// `com.atproto.repo.putRecord` input.
#[derive(Debug, Clone, Serialize)]
pub struct PutRecordRequest<'a> {
    pub repo: &'a str,
    pub collection: &'a str,
    pub rkey: &'a str,
    pub record: serde_json::Value,
    pub validate: bool,
}

/// `com.atproto.repo.putRecord` output.
#[derive(Debug, Clone, Deserialize)]
pub struct PutRecordResponse {
    pub uri: String,
    #[serde(default)]
    pub cid: Option<String>,
}

/// `com.atproto.repo.getRecord` output.
#[derive(Debug, Clone, Deserialize)]
pub struct GetRecordResponse {
    pub uri: String,
    #[serde(default)]
    pub cid: Option<String>,
    pub value: serde_json::Value,
}

/// XRPC error body: `{"error": "...", "message": "..."}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct XrpcErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Value stored in the wallet attestation collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAttestationValue {
    #[serde(rename = "$type")]
    pub record_type: String,
    /// EIP-55 checksummed address.
    pub address: String,
    /// Hex signature over the binding message.
    pub attestation: String,
}

/// Value stored in the passkey wallet collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasskeyWalletValue {
    #[serde(rename = "$type")]
    pub record_type: String,
    /// EIP-55 checksummed address.
    pub address: String,
}
