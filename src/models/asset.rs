use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A 20-byte EVM address, stored lowercase with its `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| Error::Internal(format!("address {} is missing 0x prefix", s)))?;
        let bytes = hex::decode(body)
            .map_err(|e| Error::Internal(format!("invalid address hex {}: {}", s, e)))?;
        if bytes.len() != 20 {
            return Err(Error::Internal(format!(
                "address must be 20 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(format!("0x{}", hex::encode(bytes))))
    }

    /// The all-zero address, used by contracts to signal "not found".
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for step descriptions, e.g. `0x1234…abcd`.
    pub fn short(&self) -> String {
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Address::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> String {
        a.0
    }
}

/// An ERC-20 token, or the chain's native gas token when `native` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub native: bool,
}

impl Token {
    pub fn new(address: Address, symbol: &str, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            decimals,
            native: false,
        }
    }

    /// The native gas token. Its address is the wrapped-native contract so
    /// routes and pairs can refer to it.
    pub fn native(wrapped: Address, symbol: &str) -> Self {
        Self {
            address: wrapped,
            symbol: symbol.to_string(),
            decimals: 18,
            native: true,
        }
    }

    pub fn is_native(&self) -> bool {
        self.native
    }

    /// Native tokens are never approved.
    pub fn needs_approval(&self) -> bool {
        !self.native
    }
}

pub fn token_name(token: &Token) -> &str {
    &token.symbol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalizes_case() {
        let a = Address::parse("0xABCDEFabcdef0123456789ABCDEFabcdef012345").unwrap();
        assert_eq!(a.as_str(), "0xabcdefabcdef0123456789abcdefabcdef012345");
        assert_eq!(a.short(), "0xabcd…2345");
    }

    #[test]
    fn test_address_rejects_bad_input() {
        assert!(Address::parse("abcdefabcdef0123456789abcdefabcdef012345").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzzcdefabcdef0123456789abcdefabcdef012345").is_err());
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::zero().is_zero());
        assert!(!Address::parse("0x0000000000000000000000000000000000000001")
            .unwrap()
            .is_zero());
    }

    #[test]
    fn test_address_serde_roundtrip_validates() {
        let json = "\"0x00000000000000000000000000000000000000aa\"";
        let a: Address = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), json);
        assert!(serde_json::from_str::<Address>("\"0x12\"").is_err());
    }
}
