use std::io::{Read, Write};

use borsh::{BorshDeserialize, BorshSerialize};
use derive_more::Display;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Root of the identity accumulator. Equality is exact; roots carry no ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[display(fmt = "{:#x}", _0)]
#[serde(transparent)]
pub struct Root(U256);

impl Root {
    /// Wraps a field element.
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// The field element behind the root.
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Big endian bytes of the root.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.0.to_big_endian(&mut bytes);
        bytes
    }
}

impl From<U256> for Root {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for Root {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl BorshSerialize for Root {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl BorshDeserialize for Root {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut bytes = [0u8; 32];
        reader.read_exact(&mut bytes)?;
        Ok(Self(U256::from_big_endian(&bytes)))
    }
}

/// A root together with the time it was first seen by a mirror.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct RootRecord {
    /// The root.
    pub root: Root,
    /// When the root was first recorded.
    pub seen_at: Timestamp,
}
