use std::fmt::Debug;

use bridge_state::{MemoryStorage, Storage};
use serde::{Deserialize, Serialize};

use crate::{Address, Timestamp};

/// Types shared by every module running on a chain.
pub trait Spec {
    /// Storage backing the chain state.
    type Storage: Storage;
}

/// Everything a module knows about the transaction calling it.
pub trait Context: Spec + Clone + Debug + Send + Sync {
    /// The immediate caller.
    fn sender(&self) -> &Address;

    /// Timestamp of the block the transaction is included in.
    fn timestamp(&self) -> Timestamp;

    /// The sender on the origin chain when the call was delivered by a cross-domain
    /// messenger or a state sync receiver. `None` for local calls.
    fn cross_domain_sender(&self) -> Option<&Address>;

    /// Constructor for a local call.
    fn new(sender: Address, timestamp: Timestamp) -> Self;

    /// Constructor for a call relayed from another chain.
    fn relayed(sender: Address, cross_domain_sender: Address, timestamp: Timestamp) -> Self;
}

/// Context used by every chain in this workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultContext {
    /// Immediate caller.
    pub sender: Address,
    /// Block timestamp.
    pub timestamp: Timestamp,
    /// Origin chain sender for relayed calls.
    pub cross_domain_sender: Option<Address>,
}

impl Spec for DefaultContext {
    type Storage = MemoryStorage;
}

impl Context for DefaultContext {
    fn sender(&self) -> &Address {
        &self.sender
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn cross_domain_sender(&self) -> Option<&Address> {
        self.cross_domain_sender.as_ref()
    }

    fn new(sender: Address, timestamp: Timestamp) -> Self {
        Self {
            sender,
            timestamp,
            cross_domain_sender: None,
        }
    }

    fn relayed(sender: Address, cross_domain_sender: Address, timestamp: Timestamp) -> Self {
        Self {
            sender,
            timestamp,
            cross_domain_sender: Some(cross_domain_sender),
        }
    }
}
