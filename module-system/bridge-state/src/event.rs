use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// An event emitted by a module during a call. Events are collected by the
/// [`WorkingSet`](crate::WorkingSet) and dropped if the call reverts.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Event {
    key: EventKey,
    value: EventValue,
}

impl Event {
    /// Creates an event from a key and a string value.
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: EventKey(key.as_bytes().to_vec()),
            value: EventValue(value.as_bytes().to_vec()),
        }
    }

    /// Creates an event whose value is the borsh encoding of `value`.
    pub fn encoded<T: BorshSerialize>(key: &str, value: &T) -> Self {
        Self {
            key: EventKey(key.as_bytes().to_vec()),
            value: EventValue(value.try_to_vec().expect("Failed to serialize event")),
        }
    }

    /// The event key.
    pub fn key(&self) -> &EventKey {
        &self.key
    }

    /// The event value.
    pub fn value(&self) -> &EventValue {
        &self.value
    }

    /// Decodes a borsh encoded event value.
    pub fn decode<T: BorshDeserialize>(&self) -> std::io::Result<T> {
        T::try_from_slice(&self.value.0)
    }
}

/// Key of an [`Event`].
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct EventKey(Vec<u8>);

impl EventKey {
    /// Raw bytes of the key.
    pub fn inner(&self) -> &Vec<u8> {
        &self.0
    }

    /// Returns `true` if the key equals the given name.
    pub fn is(&self, name: &str) -> bool {
        self.0 == name.as_bytes()
    }
}

/// Value of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EventValue(Vec<u8>);

impl EventValue {
    /// Raw bytes of the value.
    pub fn inner(&self) -> &Vec<u8> {
        &self.0
    }
}
