//! # Decentralized Identities
//!
//! [`Did`] is a syntactically validated W3C Decentralized Identifier and
//! [`Identity`] is the session subject the attestation is bound to.
//!
//! ## Syntax
//!
//! ```text
//! did                = "did:" method-name ":" method-specific-id
//! method-name        = 1*method-char            ; a-z / 0-9
//! method-specific-id = *( *idchar ":" ) 1*idchar
//! idchar             = ALPHA / DIGIT / "." / "-" / "_" / pct-encoded
//! ```
//!
//! The grammar admits no `,`, which the binding message relies on.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A validated Decentralized Identifier, e.g. `did:plc:ewvi7nxzyoun6zhxrhs64oiz`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Did(String);

impl Did {
    /// Parse and validate a DID string.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidDid {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let rest = value
            .strip_prefix("did:")
            .ok_or_else(|| invalid("missing did: prefix"))?;
        let (method, specific_id) = rest
            .split_once(':')
            .ok_or_else(|| invalid("missing method-specific identifier"))?;

        if method.is_empty() {
            return Err(invalid("empty method name"));
        }
        if !method
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(invalid("method name must be lowercase alphanumeric"));
        }

        if specific_id.is_empty() {
            return Err(invalid("empty method-specific identifier"));
        }
        if specific_id.ends_with(':') {
            return Err(invalid("method-specific identifier must not end with ':'"));
        }

        let bytes = specific_id.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'%' => {
                    let pct_ok = bytes.len() > i + 2
                        && bytes[i + 1].is_ascii_hexdigit()
                        && bytes[i + 2].is_ascii_hexdigit();
                    if !pct_ok {
                        return Err(invalid("malformed percent-encoding"));
                    }
                    i += 3;
                }
                b if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':') => {
                    i += 1;
                }
                _ => return Err(invalid("illegal character in method-specific identifier")),
            }
        }

        Ok(Self(value.to_string()))
    }

    /// The full DID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The DID method, e.g. `plc` or `web`.
    pub fn method(&self) -> &str {
        // Validated in `parse`: "did:" method ":" ...
        self.0[4..].split(':').next().unwrap_or_default()
    }
}

impl FromStr for Did {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Did({})", self.0)
    }
}

impl Serialize for Did {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// The authenticated subject an attestation binds a wallet to.
///
/// Owned by the external session provider. The core reads `sub` and nothing
/// else from a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    sub: Did,
}

impl Identity {
    /// Wrap a session subject.
    pub fn new(sub: Did) -> Self {
        Self { sub }
    }

    /// Parse a subject string into an identity.
    pub fn parse(sub: &str) -> Result<Self, ValidationError> {
        Did::parse(sub).map(Self::new)
    }

    /// The stable subject identifier.
    pub fn sub(&self) -> &Did {
        &self.sub
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.sub.fmt(f)
    }
}
