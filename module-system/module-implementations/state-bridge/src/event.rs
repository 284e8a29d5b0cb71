use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::{Address, ModuleEvent, Root, Timestamp};

use crate::{DestinationId, GasOperation};

/// Events emitted by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum StateBridgeEvent {
    /// A root was handed to every destination.
    RootPropagated {
        /// The root.
        root: Root,
        /// Root chain block time of the propagation.
        timestamp: Timestamp,
    },
    /// A new expiry window was pushed to every destination.
    RootHistoryExpirySet {
        /// The window in seconds.
        expiry: u64,
    },
    /// One gas budget of one destination changed.
    GasLimitSet {
        /// The destination.
        destination: DestinationId,
        /// The operation whose budget changed.
        operation: GasOperation,
        /// The new budget.
        limit: u64,
    },
    /// Ownership of one mirror was handed over.
    RemoteOwnershipTransferred {
        /// The destination.
        destination: DestinationId,
        /// The new mirror owner.
        new_owner: Address,
        /// `true` if the new owner calls the mirror directly.
        is_local: bool,
    },
    /// A new owner was proposed.
    OwnershipTransferStarted {
        /// The current owner.
        previous_owner: Address,
        /// The proposed owner.
        new_owner: Address,
    },
    /// The proposed owner accepted.
    OwnershipTransferred {
        /// The former owner.
        previous_owner: Address,
        /// The owner from now on.
        new_owner: Address,
    },
    /// The child tunnel of a checkpoint destination was bound.
    ChildTunnelBound {
        /// The destination.
        destination: DestinationId,
        /// The mirror acting as child tunnel.
        tunnel: Address,
    },
}

impl ModuleEvent for StateBridgeEvent {
    fn key(&self) -> &'static str {
        match self {
            StateBridgeEvent::RootPropagated { .. } => "RootPropagated",
            StateBridgeEvent::RootHistoryExpirySet { .. } => "RootHistoryExpirySet",
            StateBridgeEvent::GasLimitSet { .. } => "GasLimitSet",
            StateBridgeEvent::RemoteOwnershipTransferred { .. } => "RemoteOwnershipTransferred",
            StateBridgeEvent::OwnershipTransferStarted { .. } => "OwnershipTransferStarted",
            StateBridgeEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            StateBridgeEvent::ChildTunnelBound { .. } => "ChildTunnelBound",
        }
    }
}
