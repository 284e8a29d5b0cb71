//! The interface every state bridge module implements: addresses, roots, call contexts,
//! the [`Module`] trait and its error and event types.

#![deny(missing_docs)]

mod address;
pub mod config;
mod context;
pub mod gas;
mod root;

use core::fmt::Debug;

pub use address::Address;
use borsh::{BorshDeserialize, BorshSerialize};
pub use bridge_state::{
    Event, MemoryStorage, Prefix, StateCheckpoint, StateMap, StateValue, Storage, WorkingSet,
};
pub use context::{Context, DefaultContext, Spec};
pub use ethereum_types::U256;
pub use root::{Root, RootRecord, Timestamp};

/// General error type in the module system.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// Custom error thrown by a module.
    #[error(transparent)]
    ModuleError(#[from] anyhow::Error),
}

impl ModuleError {
    /// Returns the module's own error type if that is what caused the failure.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + Debug + Send + Sync + 'static,
    {
        match self {
            ModuleError::ModuleError(err) => err.downcast_ref::<E>(),
        }
    }
}

/// Response type for the `Module::call` method.
#[derive(Default, Debug)]
pub struct CallResponse {}

/// An event type emitted by a module. The key names the variant so observers can filter
/// events without decoding them.
pub trait ModuleEvent: Debug + BorshSerialize + BorshDeserialize {
    /// The event key.
    fn key(&self) -> &'static str;

    /// Adds the event to the working set.
    fn emit<S: Storage>(&self, working_set: &mut WorkingSet<S>) {
        working_set.emit(self.key(), self);
    }
}

/// Decodes every event of type `E` with the given key.
pub fn decode_events<E: ModuleEvent>(events: &[Event], key: &str) -> Vec<E> {
    events
        .iter()
        .filter(|event| event.key().is(key))
        .filter_map(|event| event.decode::<E>().ok())
        .collect()
}

/// Every module has to implement this trait.
pub trait ModuleInfo {
    /// Returns address of the module.
    fn address(&self) -> &Address;

    /// Name used to build the prefixes of the module's state.
    fn name(&self) -> &'static str;
}

/// The core trait implemented by all modules. This trait defines how a module is initialized at genesis,
/// and how it handles user transactions (if applicable).
pub trait Module {
    /// Execution context.
    type Context: Context;

    /// Configuration for the genesis method.
    type Config;

    /// Module defined argument to the call method.
    type CallMessage: Debug + BorshSerialize + BorshDeserialize;

    /// Module defined event resulting from a call method.
    type Event: ModuleEvent;

    /// Genesis is called when a chain is deployed and can be used to set initial state values in the module.
    fn genesis(
        &self,
        _config: &Self::Config,
        _working_set: &mut WorkingSet<<Self::Context as Spec>::Storage>,
    ) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Call allows interaction with the module and invokes state changes.
    /// It takes a module defined type and a context as parameters.
    fn call(
        &self,
        message: Self::CallMessage,
        context: &Self::Context,
        working_set: &mut WorkingSet<<Self::Context as Spec>::Storage>,
    ) -> Result<CallResponse, ModuleError>;
}
