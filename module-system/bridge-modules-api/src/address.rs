use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use derive_more::Into;

/// A 32 byte account identity. Used for externally owned accounts, modules and
/// the endpoints of the cross-domain delivery infrastructure alike.
#[derive(
    PartialEq, Clone, Copy, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize, Into,
)]
pub struct Address {
    addr: [u8; 32],
}

impl Address {
    /// The zero identity. Never a valid owner.
    pub const ZERO: Address = Address::new([0; 32]);

    /// Creates a new address containing the given bytes
    pub const fn new(addr: [u8; 32]) -> Self {
        Self { addr }
    }

    /// Returns `true` for the zero identity.
    pub fn is_zero(&self) -> bool {
        self.addr == [0; 32]
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.addr
    }
}

impl<'a> TryFrom<&'a [u8]> for Address {
    type Error = anyhow::Error;

    fn try_from(addr: &'a [u8]) -> Result<Self, Self::Error> {
        if addr.len() != 32 {
            anyhow::bail!("Address must be 32 bytes long");
        }
        let mut addr_bytes = [0u8; 32];
        addr_bytes.copy_from_slice(addr);
        Ok(Self { addr: addr_bytes })
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        Self::try_from(&bytes[..])
    }
}

impl From<[u8; 32]> for Address {
    fn from(addr: [u8; 32]) -> Self {
        Self { addr }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.addr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_from_string() {
        let address = Address::from([7; 32]);
        let parsed = Address::from_str(&address.to_string()).unwrap();
        assert_eq!(parsed, address);

        let without_prefix = hex::encode([7u8; 32]);
        assert_eq!(Address::from_str(&without_prefix).unwrap(), address);
    }

    #[test]
    fn test_address_json_is_hex_string() {
        let address = Address::from([9; 32]);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"0x{}\"", hex::encode([9u8; 32])));

        let parsed: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, address);
        assert!(serde_json::from_str::<Address>("\"0x0102\"").is_err());
    }

    #[test]
    fn test_bad_address_length() {
        let err = Address::from_str("0x0102").unwrap_err();
        assert_eq!(err.to_string(), "Address must be 32 bytes long");
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from([1; 32]).is_zero());
    }
}
