//! Identifiers used throughout tokensale.
//!
//! Principals and asset handles are 20-byte account identities rendered as
//! `0x`-prefixed hex. Roles are 32-byte identifiers; audit entries use
//! UUIDv7 for time-ordered sorting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Result, SaleError};

/// Decode a 20-byte identity from hex, accepting an optional `0x` prefix.
fn parse_identity(input: &str) -> Result<[u8; 20]> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(digits)
        .map_err(|e| SaleError::Configuration(format!("invalid identity {input:?}: {e}")))?;
    bytes.try_into().map_err(|raw: Vec<u8>| {
        SaleError::Configuration(format!(
            "invalid identity {input:?}: expected 20 bytes, got {}",
            raw.len()
        ))
    })
}

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// An identity capable of initiating operations or receiving transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Principal(pub [u8; 20]);

impl Principal {
    /// The null identity. Never a valid participant.
    pub const NULL: Self = Self([0u8; 20]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// First four bytes in hex, for compact log fields.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// A random non-null principal.
    #[cfg(feature = "test-helpers")]
    #[must_use]
    pub fn random() -> Self {
        use rand::Rng;
        let mut bytes: [u8; 20] = rand::thread_rng().r#gen();
        bytes[0] |= 1;
        Self(bytes)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Principal {
    type Err = SaleError;

    fn from_str(s: &str) -> Result<Self> {
        parse_identity(s).map(Self)
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Handle to an asset ledger (the token's contract address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct AssetId(pub [u8; 20]);

impl AssetId {
    pub const NULL: Self = Self([0u8; 20]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for AssetId {
    type Err = SaleError;

    fn from_str(s: &str) -> Result<Self> {
        parse_identity(s).map(Self)
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// RoleId
// ---------------------------------------------------------------------------

/// Identifier of an access-control role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RoleId(pub [u8; 32]);

impl RoleId {
    /// The admin role. Administers every role unless reconfigured.
    pub const DEFAULT_ADMIN: Self = Self([0u8; 32]);

    /// Derive a role ID from a human-readable label.
    #[must_use]
    pub fn named(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"tokensale:role:v1:");
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::DEFAULT_ADMIN {
            write!(f, "role:DEFAULT_ADMIN")
        } else {
            write!(f, "role:{}", hex::encode(&self.0[..8]))
        }
    }
}

// ---------------------------------------------------------------------------
// RecordId
// ---------------------------------------------------------------------------

/// Unique identifier of an audit-log entry. UUIDv7, so IDs sort by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_principal() {
        assert!(Principal::NULL.is_null());
        assert!(!Principal([7u8; 20]).is_null());
    }

    #[test]
    fn principal_display_and_parse() {
        let p = Principal([0xab; 20]);
        let s = p.to_string();
        assert!(s.starts_with("0xabab"));
        assert_eq!(s.len(), 42);
        assert_eq!(s.parse::<Principal>().unwrap(), p);
        // Prefix is optional on input.
        assert_eq!(s.trim_start_matches("0x").parse::<Principal>().unwrap(), p);
    }

    #[test]
    fn principal_parse_rejects_wrong_length() {
        let err = "0xabcd".parse::<Principal>().unwrap_err();
        assert!(matches!(err, SaleError::Configuration(_)));
        assert!(format!("{err}").contains("expected 20 bytes"));
    }

    #[test]
    fn principal_parse_rejects_non_hex() {
        assert!("0xzz".parse::<Principal>().is_err());
    }

    #[test]
    fn principal_serializes_as_hex_string() {
        let p = Principal([1u8; 20]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, format!("\"{p}\""));
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn role_named_is_stable_and_distinct() {
        assert_eq!(RoleId::named("PAUSER"), RoleId::named("PAUSER"));
        assert_ne!(RoleId::named("PAUSER"), RoleId::named("MINTER"));
        assert_ne!(RoleId::named("PAUSER"), RoleId::DEFAULT_ADMIN);
    }

    #[test]
    fn default_admin_display() {
        assert_eq!(RoleId::DEFAULT_ADMIN.to_string(), "role:DEFAULT_ADMIN");
    }

    #[test]
    fn record_id_ordering() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert!(a < b);
    }
}
