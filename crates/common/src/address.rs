use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A developer's wallet address, the sole identity key across the system.
/// Stored as the raw 20 bytes; rendered as a 0x-prefixed hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeveloperAddress(pub [u8; 20]);

impl DeveloperAddress {
    /// Create an address from a 20-byte array
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the inner bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to a 0x-prefixed lowercase hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from a hex string, with or without the 0x prefix
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| Error::InvalidAddress(s.to_string()))?;
        if bytes.len() != 20 {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for DeveloperAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for DeveloperAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for DeveloperAddress {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<DeveloperAddress> for String {
    fn from(addr: DeveloperAddress) -> Self {
        addr.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = DeveloperAddress::new([0xabu8; 20]);
        let hex = addr.to_hex();
        let decoded = DeveloperAddress::from_hex(&hex).unwrap();
        assert_eq!(addr, decoded);
    }

    #[test]
    fn test_address_accepts_unprefixed_hex() {
        let addr = DeveloperAddress::from_hex("ababababababababababababababababababab99").unwrap();
        assert_eq!(addr.as_bytes()[19], 0x99);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!(DeveloperAddress::from_hex("0xabcd").is_err());
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = DeveloperAddress::new([1u8; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: DeveloperAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}
