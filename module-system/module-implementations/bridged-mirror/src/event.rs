use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::{Address, ModuleEvent};

/// Events emitted by the mirror itself. Root updates are reported by the root history
/// (`RootAdded`, `RootHistoryExpirySet`).
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum MirrorEvent {
    /// The mirror changed hands.
    OwnershipTransferred {
        /// The previous owner.
        previous_owner: Address,
        /// The new owner.
        new_owner: Address,
        /// `true` if the new owner calls the mirror directly on this chain.
        is_local: bool,
    },
    /// A checkpoint mirror bound its root tunnel.
    RootTunnelBound {
        /// The root chain tunnel.
        tunnel: Address,
    },
}

impl ModuleEvent for MirrorEvent {
    fn key(&self) -> &'static str {
        match self {
            MirrorEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            MirrorEvent::RootTunnelBound { .. } => "RootTunnelBound",
        }
    }
}
