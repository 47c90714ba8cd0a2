use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::utils::crypto::CryptoUtils;
use crate::utils::errors::ParseError;

pub const ID_LEN: usize = 32;
pub const NODE_ID_LEN: usize = 20;
pub const NODE_ID_PREFIX: &str = "NodeID-";

/// A 32-byte identifier rendered as CB58: subnet IDs, blockchain IDs and P-Chain transaction IDs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Id(pub [u8; ID_LEN]);

impl Id {
    pub const ZERO: Id = Id([0u8; ID_LEN]);

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        let array: [u8; ID_LEN] = bytes.try_into().map_err(|_| ParseError::InvalidLength {
            field: "id",
            expected: ID_LEN,
            actual: bytes.len(),
        })?;
        Ok(Id(array))
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }
}

impl FromStr for Id {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&CryptoUtils::cb58_decode(s)?)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&CryptoUtils::cb58_encode(&self.0))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The join key across all three registration phases: the SHA-256 of the
/// `RegisterL1ValidatorMessage` payload that created the registration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ValidationId(pub [u8; ID_LEN]);

impl ValidationId {
    /// The value the validator manager returns for unknown nodes.
    pub const ZERO: ValidationId = ValidationId([0u8; ID_LEN]);

    /// Derives the ID from the raw payload bytes.
    pub fn of_payload(payload: &[u8]) -> Self {
        ValidationId(CryptoUtils::content_hash(payload))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        Id::from_slice(bytes).map(|id| ValidationId(id.0))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }
}

/// Accepts `0x`-prefixed or bare hex, in either case.
impl FromStr for ValidationId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(stripped).map_err(|e| ParseError::InvalidEncoding(format!("hex: {}", e)))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for ValidationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ValidationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidationId({})", self)
    }
}

impl Serialize for ValidationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ValidationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A validator's node identity. Parsed from the `NodeID-<cb58>` form, with the checksum
/// stripped.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub [u8; NODE_ID_LEN]);

impl NodeId {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        let array: [u8; NODE_ID_LEN] =
            bytes.try_into().map_err(|_| ParseError::InvalidLength {
                field: "node id",
                expected: NODE_ID_LEN,
                actual: bytes.len(),
            })?;
        Ok(NodeId(array))
    }

    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }

    /// `0x`-prefixed hex, the form the validator manager contract takes.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// The `NodeID-` prefix is optional.
impl FromStr for NodeId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s.strip_prefix(NODE_ID_PREFIX).unwrap_or(s);
        Self::from_slice(&CryptoUtils::cb58_decode(encoded)?)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NODE_ID_PREFIX, CryptoUtils::cb58_encode(&self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_id_strips_checksum() {
        let node_id: NodeId = "NodeID-MFrZFVCXPv5iCn6M9K6XduxGTYp891xXZ".parse().unwrap();
        assert_eq!(
            node_id.to_hex(),
            "0xde31b4d8b22991d51aa6aa1fc733f23a851a8c94"
        );
        assert_eq!(node_id.to_string(), "NodeID-MFrZFVCXPv5iCn6M9K6XduxGTYp891xXZ");
    }

    #[test]
    fn test_parse_subnet_id() {
        let subnet: Id = "2W9boARgCWL25z6pMFNtkCfNA5v28VGg9PmBgUJfuKndEdhrvw"
            .parse()
            .unwrap();
        assert_eq!(
            hex::encode(subnet.as_bytes()),
            "c5e17d557e60fe8002dee4b7943d8a85c9171a32f5f082765d430b8ab5f98441"
        );
    }

    #[test]
    fn test_validation_id_hex_is_case_insensitive() {
        let lower: ValidationId =
            "0x00000000000000000000000000000000000000000000000000000000000000ab"
                .parse()
                .unwrap();
        let upper: ValidationId =
            "0x00000000000000000000000000000000000000000000000000000000000000AB"
                .parse()
                .unwrap();
        assert_eq!(lower, upper);
        assert!(!lower.is_zero());
        assert!(ValidationId::ZERO.is_zero());
    }
}
