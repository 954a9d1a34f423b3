//! Identifiers used throughout Keystone.
//!
//! Addresses, contexts, roles and selectors are derived from SHA-256 digests
//! so the same label always maps to the same identifier on every host.
//! Per-call correlation ids use UUIDv7 for time-ordered sorting.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

fn digest(domain: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account or contract address. Serialized as `0x`-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    /// Deterministic address for a named externally-owned account.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        Self::truncate(digest(b"keystone:address:", &[label.as_bytes()]))
    }

    /// Address of a contract created by `deployer` at creation counter `nonce`.
    #[must_use]
    pub fn derive(deployer: Address, nonce: u64) -> Self {
        Self::truncate(digest(
            b"keystone:create:",
            &[&deployer.0, &nonce.to_le_bytes()],
        ))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    fn truncate(hash: [u8; 32]) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ContextId
// ---------------------------------------------------------------------------

/// Authorization context: the scope under which role assignments are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ContextId(pub [u8; 32]);

impl ContextId {
    /// The reserved context holding global role assignments.
    pub const SYSTEM: Self = Self([0u8; 32]);

    /// The context a contract owns by default, derived from its address.
    #[must_use]
    pub fn of(address: Address) -> Self {
        Self(digest(b"keystone:context:", &[&address.0]))
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        *self == Self::SYSTEM
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_system() {
            write!(f, "ctx:system")
        } else {
            write!(f, "ctx:{}", hex::encode(&self.0[..8]))
        }
    }
}

// ---------------------------------------------------------------------------
// RoleId
// ---------------------------------------------------------------------------

/// A named capability checked before privileged operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RoleId(pub [u8; 32]);

impl RoleId {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self(digest(b"keystone:role:", &[name.as_bytes()]))
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role:{}", hex::encode(&self.0[..4]))
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Four-byte operation selector, derived from the operation signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Selector(pub [u8; 4]);

impl Selector {
    /// Selector for a signature such as `"deposit(address,uint256)"`.
    #[must_use]
    pub fn of(signature: &str) -> Self {
        let hash = digest(b"", &[signature.as_bytes()]);
        Self([hash[0], hash[1], hash[2], hash[3]])
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// OfferId
// ---------------------------------------------------------------------------

/// Sequential identifier assigned by the venue to each offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OfferId(pub u64);

impl OfferId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offer:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CallId
// ---------------------------------------------------------------------------

/// Correlation id for one top-level call into the host. UUIDv7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_from_label_is_deterministic() {
        assert_eq!(Address::from_label("alice"), Address::from_label("alice"));
        assert_ne!(Address::from_label("alice"), Address::from_label("bob"));
    }

    #[test]
    fn derived_addresses_differ_by_nonce() {
        let deployer = Address::from_label("deployer");
        assert_ne!(Address::derive(deployer, 0), Address::derive(deployer, 1));
    }

    #[test]
    fn address_display_is_hex() {
        let s = format!("{}", Address::ZERO);
        assert_eq!(s, format!("0x{}", "00".repeat(20)));
    }

    #[test]
    fn own_context_is_never_system() {
        let ctx = ContextId::of(Address::from_label("entity"));
        assert!(!ctx.is_system());
        assert_eq!(format!("{}", ContextId::SYSTEM), "ctx:system");
    }

    #[test]
    fn selector_depends_on_signature() {
        let a = Selector::of("deposit(address,uint256)");
        let b = Selector::of("withdraw(address,uint256)");
        assert_ne!(a, b);
        assert_eq!(a, Selector::of("deposit(address,uint256)"));
        assert!(format!("{a}").starts_with("0x"));
    }

    #[test]
    fn offer_id_next() {
        assert_eq!(OfferId(4).next(), OfferId(5));
    }

    #[test]
    fn call_ids_are_unique() {
        let a = CallId::new();
        let b = CallId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn serde_roundtrips() {
        let addr = Address::from_label("carol");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
        assert!(serde_json::from_str::<Address>("\"0x1234\"").is_err());

        let role = RoleId::named("ENTITY_ADMIN");
        let json = serde_json::to_string(&role).unwrap();
        let back: RoleId = serde_json::from_str(&json).unwrap();
        assert_eq!(role, back);
    }
}
