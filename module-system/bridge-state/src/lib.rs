//! Storage and state management interfaces for state bridge modules.

#![deny(missing_docs)]

pub mod codec;
pub mod containers;
mod event;
mod scratchpad;
/// Trait and type definitions related to the [`Storage`] trait.
pub mod storage;


use std::fmt::Display;
use std::str;

pub use containers::{StateMap, StateMapError, StateValue, StateValueError};
pub use event::{Event, EventKey, EventValue};
pub use scratchpad::{StateCheckpoint, WorkingSet};
pub use storage::{MemoryStorage, Storage, StorageKey, StorageValue};

// separator == "/"
const DOMAIN_SEPARATOR: [u8; 1] = [47];

/// A prefix prepended to each key before insertion and retrieval from the storage.
///
/// Every module on a chain shares the same working set, so each state container is
/// namespaced by the module that owns it and the name of the container.
#[derive(
    borsh::BorshDeserialize,
    borsh::BorshSerialize,
    Debug,
    PartialEq,
    Eq,
    Clone,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Prefix {
    prefix: Vec<u8>,
}

impl Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match str::from_utf8(&self.prefix) {
            Ok(s) => write!(f, "{:?}", s),
            Err(_) => write!(f, "0x{}", hex::encode(&self.prefix)),
        }
    }
}

impl Prefix {
    /// Creates a new prefix from a byte vector.
    pub fn new(prefix: Vec<u8>) -> Self {
        Self { prefix }
    }

    /// Creates the prefix of a named state container inside a module.
    pub fn new_storage(module_name: &str, storage_name: &str) -> Self {
        let mut prefix = Vec::with_capacity(
            module_name.len() + storage_name.len() + 2 * DOMAIN_SEPARATOR.len(),
        );
        prefix.extend(module_name.as_bytes());
        prefix.extend(DOMAIN_SEPARATOR);
        prefix.extend(storage_name.as_bytes());
        prefix.extend(DOMAIN_SEPARATOR);
        Self { prefix }
    }

    /// Returns the raw bytes of the prefix.
    pub fn as_bytes(&self) -> &[u8] {
        &self.prefix
    }

    /// Returns the length in bytes of the prefix.
    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    /// Returns `true` if the prefix is empty, `false` otherwise.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Returns a new prefix allocated on the fly, by extending the current
    /// prefix with the given bytes.
    pub fn extended(&self, bytes: &[u8]) -> Self {
        let mut prefix = self.clone();
        prefix.prefix.extend_from_slice(bytes);
        prefix
    }
}
