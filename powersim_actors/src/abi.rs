//! Primitive on-chain value types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// The network's discrete time step.
pub type ChainEpoch = i64;

/// Method selector on an actor. Method 0 is a plain value transfer.
pub type MethodNum = u64;

/// Miner-chosen identifier of a sector.
pub type SectorNumber = u64;

macro_rules! big_int_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(#[serde(with = "crate::serde_str")] i128);

        impl $name {
            /// Creates a value from its integer representation.
            pub const fn new(value: i128) -> Self {
                Self(value)
            }

            pub const fn zero() -> Self {
                Self(0)
            }

            /// Returns the integer representation.
            pub const fn value(&self) -> i128 {
                self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == 0
            }

            pub fn is_positive(&self) -> bool {
                self.0 > 0
            }

            pub fn is_negative(&self) -> bool {
                self.0 < 0
            }

            /// Multiplies by an integer scalar, saturating on overflow.
            pub fn scale(&self, factor: i128) -> Self {
                Self(self.0.saturating_mul(factor))
            }

            /// Floor division by an integer scalar. Division by zero yields zero.
            pub fn div_floor(&self, divisor: i128) -> Self {
                if divisor == 0 {
                    return Self::zero();
                }
                Self(self.0.div_euclid(divisor))
            }
        }

        impl From<i128> for $name {
            fn from(value: i128) -> Self {
                Self(value)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value as i128)
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::zero(), |acc, x| acc + x)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

big_int_newtype!(
    /// An amount of the native token, in its smallest indivisible unit.
    TokenAmount
);

big_int_newtype!(
    /// Storage power in bytes (raw or quality-adjusted).
    StoragePower
);

/// Content identifier: SHA-256 of an encoded object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cid([u8; 32]);

impl Cid {
    /// Computes the CID of a byte string.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are plenty to tell objects apart in logs
        write!(f, "Cid(b{}..)", hex::encode(&self.0[..8]))
    }
}

impl std::str::FromStr for Cid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix('b').ok_or_else(|| format!("CID missing multibase prefix: {}", s))?;
        let bytes = hex::decode(raw).map_err(|e| format!("invalid CID {}: {}", s, e))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| format!("CID has wrong length: {}", s))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Proof type used to seal a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisteredSealProof {
    StackedDrg2KiBV1_1,
    StackedDrg512MiBV1_1,
    StackedDrg32GiBV1_1,
    StackedDrg64GiBV1_1,
}

impl RegisteredSealProof {
    /// Sector size in bytes.
    pub fn sector_size(&self) -> StoragePower {
        let bytes: i128 = match self {
            RegisteredSealProof::StackedDrg2KiBV1_1 => 2 << 10,
            RegisteredSealProof::StackedDrg512MiBV1_1 => 512 << 20,
            RegisteredSealProof::StackedDrg32GiBV1_1 => 32 << 30,
            RegisteredSealProof::StackedDrg64GiBV1_1 => 64 << 30,
        };
        StoragePower::new(bytes)
    }

    /// Minimum raw power a miner of this proof type needs to be eligible
    /// for block rewards once enough miners have reached it.
    pub fn consensus_miner_min_power(&self) -> StoragePower {
        let bytes: i128 = match self {
            RegisteredSealProof::StackedDrg2KiBV1_1 => 0,
            RegisteredSealProof::StackedDrg512MiBV1_1 => 16 << 20,
            RegisteredSealProof::StackedDrg32GiBV1_1 => 10 << 40,
            RegisteredSealProof::StackedDrg64GiBV1_1 => 20 << 40,
        };
        StoragePower::new(bytes)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RegisteredSealProof::StackedDrg2KiBV1_1 => "2KiB",
            RegisteredSealProof::StackedDrg512MiBV1_1 => "512MiB",
            RegisteredSealProof::StackedDrg32GiBV1_1 => "32GiB",
            RegisteredSealProof::StackedDrg64GiBV1_1 => "64GiB",
        }
    }
}

impl std::str::FromStr for RegisteredSealProof {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "2kib" => Ok(RegisteredSealProof::StackedDrg2KiBV1_1),
            "512mib" => Ok(RegisteredSealProof::StackedDrg512MiBV1_1),
            "32gib" => Ok(RegisteredSealProof::StackedDrg32GiBV1_1),
            "64gib" => Ok(RegisteredSealProof::StackedDrg64GiBV1_1),
            _ => Err(format!("Unknown seal proof: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_arithmetic() {
        let a = TokenAmount::new(1000);
        let b = TokenAmount::new(250);
        assert_eq!(a - b, TokenAmount::new(750));
        assert_eq!((a + b).div_floor(5), TokenAmount::new(250));
        assert_eq!(a.scale(3), TokenAmount::new(3000));
        assert!((b - a).is_negative());
        assert_eq!(a.div_floor(0), TokenAmount::zero());
    }

    #[test]
    fn test_cid_is_content_derived() {
        let a = Cid::of(b"hello");
        let b = Cid::of(b"hello");
        let c = Cid::of(b"world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string().parse::<Cid>().unwrap(), a);
    }

    #[test]
    fn test_sector_sizes() {
        assert_eq!(RegisteredSealProof::StackedDrg2KiBV1_1.sector_size().value(), 2048);
        assert_eq!(
            RegisteredSealProof::StackedDrg32GiBV1_1.sector_size().value(),
            34_359_738_368
        );
        assert!(RegisteredSealProof::StackedDrg2KiBV1_1
            .consensus_miner_min_power()
            .is_zero());
    }
}
