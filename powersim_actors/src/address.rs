//! Actor addresses.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of the payload hash of key and actor addresses.
pub const PAYLOAD_HASH_LEN: usize = 20;

/// Identity of an actor.
///
/// - `Id` addresses (`f0<n>`) are assigned by the init actor and are stable
///   only once the creating message has been applied.
/// - `Key` addresses (`f1<hex>`) are derived from a public key.
/// - `Actor` addresses (`f2<hex>`) are derived from the creating message and
///   are robust against chain reorganisation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Address {
    Id(u64),
    Key([u8; PAYLOAD_HASH_LEN]),
    Actor([u8; PAYLOAD_HASH_LEN]),
}

impl Address {
    pub const fn new_id(id: u64) -> Self {
        Address::Id(id)
    }

    /// Derives a key address from public key bytes.
    pub fn new_key(public_key: &[u8]) -> Self {
        Address::Key(payload_hash(public_key))
    }

    /// Derives a robust actor address from the creator and a creation counter.
    pub fn new_actor(creator: &Address, seq: u64) -> Self {
        let mut buf = creator.to_string().into_bytes();
        buf.extend_from_slice(&seq.to_le_bytes());
        Address::Actor(payload_hash(&buf))
    }

    /// Returns the numeric ID of an ID address.
    pub fn id(&self) -> Option<u64> {
        match self {
            Address::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_id(&self) -> bool {
        matches!(self, Address::Id(_))
    }

    pub fn is_key(&self) -> bool {
        matches!(self, Address::Key(_))
    }
}

fn payload_hash(bytes: &[u8]) -> [u8; PAYLOAD_HASH_LEN] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; PAYLOAD_HASH_LEN];
    out.copy_from_slice(&digest[..PAYLOAD_HASH_LEN]);
    out
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Id(id) => write!(f, "f0{}", id),
            Address::Key(hash) => write!(f, "f1{}", hex::encode(hash)),
            Address::Actor(hash) => write!(f, "f2{}", hex::encode(hash)),
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl std::str::FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix('f')
            .ok_or_else(|| format!("Address missing network prefix: {}", s))?;
        let mut chars = body.chars();
        let protocol = chars.next();
        let payload = chars.as_str();

        let decode_hash = |payload: &str| -> Result<[u8; PAYLOAD_HASH_LEN], String> {
            let bytes = hex::decode(payload).map_err(|e| format!("Invalid address {}: {}", s, e))?;
            bytes
                .try_into()
                .map_err(|_| format!("Address payload has wrong length: {}", s))
        };

        match protocol {
            Some('0') => payload
                .parse::<u64>()
                .map(Address::Id)
                .map_err(|e| format!("Invalid ID address {}: {}", s, e)),
            Some('1') => decode_hash(payload).map(Address::Key),
            Some('2') => decode_hash(payload).map(Address::Actor),
            _ => Err(format!("Unknown address protocol: {}", s)),
        }
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(Address::new_id(4).to_string(), "f04");
        assert!(Address::new_key(b"pubkey").to_string().starts_with("f1"));
        assert!(Address::new_actor(&Address::new_id(100), 0)
            .to_string()
            .starts_with("f2"));
    }

    #[test]
    fn test_actor_addresses_differ_by_sequence() {
        let creator = Address::new_id(100);
        assert_ne!(Address::new_actor(&creator, 0), Address::new_actor(&creator, 1));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("x01".parse::<Address>().is_err());
        assert!("f9abc".parse::<Address>().is_err());
        assert!("f1zz".parse::<Address>().is_err());
        assert!("f".parse::<Address>().is_err());
    }

    proptest! {
        #[test]
        fn prop_id_address_parses_back(id in any::<u64>()) {
            let addr = Address::new_id(id);
            prop_assert_eq!(addr.to_string().parse::<Address>().unwrap(), addr);
        }

        #[test]
        fn prop_key_address_parses_back(key in proptest::collection::vec(any::<u8>(), 1..64)) {
            let addr = Address::new_key(&key);
            prop_assert_eq!(addr.to_string().parse::<Address>().unwrap(), addr);
        }
    }
}
