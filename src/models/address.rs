//! Address and 32-byte identifier types

use crate::validation::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Scheme prefix accepted in front of an address path.
pub const ADDRESS_SCHEME: &str = "atto://";

/// Signature algorithm of an account key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    V1,
}

impl Algorithm {
    pub fn code(self) -> u8 {
        match self {
            Algorithm::V1 => 0,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Algorithm::V1),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::V1 => "V1",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "V1" | "v1" => Ok(Algorithm::V1),
            _ => Err(ValidationError::InvalidParameter(format!("unknown algorithm {}", s))),
        }
    }
}

macro_rules! hex_bytes {
    ($name:ident, $label:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode_upper(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(s.trim(), &mut bytes)
                    .map_err(|_| ValidationError::InvalidHex($label, s.to_string()))?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_bytes!(PublicKey, "public key");
hex_bytes!(Hash, "hash");

/// A ledger account: algorithm plus public key.
///
/// The canonical text form (the "path") is the base58 encoding of the
/// algorithm code followed by the 32 key bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    pub algorithm: Algorithm,
    pub public_key: PublicKey,
}

impl Address {
    pub fn new(algorithm: Algorithm, public_key: PublicKey) -> Self {
        Self { algorithm, public_key }
    }

    pub fn path(&self) -> String {
        let mut raw = Vec::with_capacity(33);
        raw.push(self.algorithm.code());
        raw.extend_from_slice(self.public_key.as_bytes());
        bs58::encode(raw).into_string()
    }

    pub fn parse_path(path: &str) -> Result<Self, ValidationError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ValidationError::MissingParameter("address".to_string()));
        }
        let path = path.strip_prefix(ADDRESS_SCHEME).unwrap_or(path);

        let decoded = bs58::decode(path)
            .into_vec()
            .map_err(|_| ValidationError::InvalidAddress(path.to_string()))?;
        if decoded.len() != 33 {
            return Err(ValidationError::InvalidAddress(path.to_string()));
        }

        let algorithm = Algorithm::from_code(decoded[0])
            .ok_or_else(|| ValidationError::InvalidAddress(path.to_string()))?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&decoded[1..]);

        Ok(Self::new(algorithm, PublicKey(key)))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.path())
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_path(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_path(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_accepts_scheme_prefix() {
        let address = Address::new(Algorithm::V1, PublicKey([7u8; 32]));
        let with_scheme = format!("{}{}", ADDRESS_SCHEME, address.path());

        assert_eq!(Address::parse_path(&with_scheme).unwrap(), address);
        assert_eq!(address.path().parse::<Address>().unwrap(), address);
    }

    #[test]
    fn rejects_wrong_length_and_garbage() {
        let short = bs58::encode([0u8; 10]).into_string();
        assert!(matches!(Address::parse_path(&short), Err(ValidationError::InvalidAddress(_))));
        assert!(matches!(Address::parse_path("0OIl"), Err(ValidationError::InvalidAddress(_))));
        assert!(matches!(Address::parse_path("  "), Err(ValidationError::MissingParameter(_))));
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let mut raw = vec![9u8];
        raw.extend_from_slice(&[1u8; 32]);
        let path = bs58::encode(raw).into_string();
        assert!(Address::parse_path(&path).is_err());
    }

    #[test]
    fn hash_parses_hex_in_either_case() {
        let hash: Hash = "ab".repeat(32).parse().unwrap();
        assert_eq!(hash.to_hex(), "AB".repeat(32));
        assert!("abc".parse::<Hash>().is_err());
    }
}
