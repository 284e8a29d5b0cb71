use std::collections::BTreeMap;
use std::fmt::Debug;

use borsh::BorshSerialize;

use crate::codec::{StateKeyCodec, StateValueCodec};
use crate::storage::{StorageKey, StorageValue};
use crate::{Event, Prefix, Storage};

/// Committed chain state between transactions.
///
/// Obtained from a [`WorkingSet`] with either [`WorkingSet::checkpoint`], which writes the
/// transaction's changes into the underlying storage, or [`WorkingSet::revert`], which
/// discards them.
pub struct StateCheckpoint<S: Storage> {
    storage: S,
}

impl<S: Storage> StateCheckpoint<S> {
    /// Wraps the given storage.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Opens a new transaction on top of the committed state.
    pub fn to_revertable(self) -> WorkingSet<S> {
        WorkingSet {
            storage: self.storage,
            writes: Default::default(),
            events: Default::default(),
        }
    }

    /// Returns the committed storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Consumes the checkpoint and returns the committed storage.
    pub fn into_inner(self) -> S {
        self.storage
    }
}

impl<S: Storage + Default> Default for StateCheckpoint<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Storage> Debug for StateCheckpoint<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCheckpoint").finish()
    }
}

/// This structure contains the writes and the events collected during the execution of a
/// transaction. Reads first check the pending writes and then fall back to the committed
/// storage.
///
/// There are two ways to convert it into a [`StateCheckpoint`]:
/// 1. [`WorkingSet::checkpoint`], where all the changes are written to the storage.
/// 2. [`WorkingSet::revert`], where the changes and the events are dropped.
pub struct WorkingSet<S: Storage> {
    storage: S,
    writes: BTreeMap<StorageKey, Option<StorageValue>>,
    events: Vec<Event>,
}

impl<S: Storage> Debug for WorkingSet<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkingSet")
            .field("pending_writes", &self.writes.len())
            .field("events", &self.events)
            .finish()
    }
}

impl<S: Storage> WorkingSet<S> {
    /// Opens a transaction directly on top of the given storage.
    pub fn new(storage: S) -> Self {
        StateCheckpoint::new(storage).to_revertable()
    }

    /// Writes the pending changes into the storage.
    pub fn checkpoint(self) -> StateCheckpoint<S> {
        let mut storage = self.storage;
        storage.commit(self.writes);
        StateCheckpoint { storage }
    }

    /// Drops the pending changes and the collected events.
    pub fn revert(self) -> StateCheckpoint<S> {
        StateCheckpoint {
            storage: self.storage,
        }
    }

    /// Adds an event with a plain string value.
    pub fn add_event(&mut self, key: &str, value: &str) {
        self.events.push(Event::new(key, value));
    }

    /// Adds an event whose value is the borsh encoding of `value`.
    pub fn emit<T: BorshSerialize>(&mut self, key: &str, value: &T) {
        self.events.push(Event::encoded(key, value));
    }

    /// Removes and returns the events collected so far.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Events collected so far.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Returns `true` if the working set has uncommitted writes.
    pub fn has_pending_writes(&self) -> bool {
        !self.writes.is_empty()
    }

    /// The committed storage underneath the pending writes.
    pub fn backing(&self) -> &S {
        &self.storage
    }

    fn get(&self, key: &StorageKey) -> Option<StorageValue> {
        if let Some(value) = self.writes.get(key) {
            return value.clone();
        }
        self.storage.get(key)
    }

    fn set(&mut self, key: StorageKey, value: StorageValue) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: StorageKey) {
        self.writes.insert(key, None);
    }

    fn get_decoded<V, VC>(&self, storage_key: &StorageKey, codec: &VC) -> Option<V>
    where
        VC: StateValueCodec<V>,
    {
        let storage_value = self.get(storage_key)?;

        // It is ok to panic here. Deserialization problem means that something is terribly wrong.
        Some(
            codec
                .try_decode_value(storage_value.value())
                .unwrap_or_else(|e| panic!("Unable to deserialize storage value {e:?}")),
        )
    }
}

impl<S: Storage> WorkingSet<S> {
    pub(crate) fn set_value<K, V, C>(&mut self, prefix: &Prefix, key: &K, value: &V, codec: &C)
    where
        C: StateKeyCodec<K> + StateValueCodec<V>,
    {
        let storage_key = StorageKey::new(prefix, key, codec);
        let storage_value = StorageValue::new(value, codec);
        self.set(storage_key, storage_value);
    }

    pub(crate) fn get_value<K, V, C>(&mut self, prefix: &Prefix, key: &K, codec: &C) -> Option<V>
    where
        C: StateKeyCodec<K> + StateValueCodec<V>,
    {
        let storage_key = StorageKey::new(prefix, key, codec);
        self.get_decoded(&storage_key, codec)
    }

    pub(crate) fn remove_value<K, V, C>(
        &mut self,
        prefix: &Prefix,
        key: &K,
        codec: &C,
    ) -> Option<V>
    where
        C: StateKeyCodec<K> + StateValueCodec<V>,
    {
        let storage_key = StorageKey::new(prefix, key, codec);
        let storage_value = self.get_decoded(&storage_key, codec)?;
        self.delete(storage_key);
        Some(storage_value)
    }

    pub(crate) fn set_singleton<V, C>(&mut self, prefix: &Prefix, value: &V, codec: &C)
    where
        C: StateValueCodec<V>,
    {
        let storage_key = StorageKey::singleton(prefix);
        let storage_value = StorageValue::new(value, codec);
        self.set(storage_key, storage_value);
    }

    pub(crate) fn get_singleton<V, C>(&mut self, prefix: &Prefix, codec: &C) -> Option<V>
    where
        C: StateValueCodec<V>,
    {
        let storage_key = StorageKey::singleton(prefix);
        self.get_decoded(&storage_key, codec)
    }

    pub(crate) fn delete_singleton(&mut self, prefix: &Prefix) {
        let storage_key = StorageKey::singleton(prefix);
        self.delete(storage_key);
    }
}
