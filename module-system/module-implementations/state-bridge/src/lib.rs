//! The state bridge coordinator. Lives on the root chain next to the identity registry
//! and propagates every new accumulator root to the mirrors on the destination chains.
#![deny(missing_docs)]

pub mod call;
pub mod config;
mod event;
mod genesis;
mod owner;
mod query;
mod transport;

#[cfg(test)]
mod tests;

use bridge_modules_api::{
    Address, CallResponse, Context, Module, ModuleError, ModuleInfo, Prefix, RootRecord,
    StateMap, StateValue, WorkingSet,
};
pub use call::CallMessage;
pub use event::StateBridgeEvent;
pub use genesis::StateBridgeConfig;
use bridge_messenger::{Outbox, OutboxError};
use thiserror::Error;
pub use transport::{
    DestinationConfig, DestinationId, GasLimits, GasOperation, TransportKind, DEFAULT_GAS_LIMIT,
};

const MODULE_NAME: &str = "StateBridge";

/// Coarse classification of [`StateBridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller lacks the role the call needs.
    Authorization,
    /// The call conflicts with the bridge configuration.
    Configuration,
    /// The operation is never allowed.
    UnsupportedOperation,
    /// The delivery infrastructure refused a message.
    TransportRejected,
}

/// Errors returned by the coordinator. Every one of them aborts the whole call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateBridgeError {
    /// Only the identity registry may propagate roots.
    #[error("{0} is not the identity registry")]
    NotRegistry(Address),
    /// Only the owner may administer the bridge.
    #[error("{0} is not the owner")]
    NotOwner(Address),
    /// Only the pending owner may accept ownership.
    #[error("{0} is not the pending owner")]
    NotPendingOwner(Address),
    /// Ownership cannot be renounced.
    #[error("Renouncing ownership is not supported")]
    RenounceUnsupported,
    /// The zero identity can never own the bridge or a mirror.
    #[error("The zero address cannot be an owner")]
    ZeroOwner,
    /// No destination has this id.
    #[error("Unknown destination {0}")]
    UnknownDestination(DestinationId),
    /// The destination is not fed through a checkpoint tunnel.
    #[error("Destination {0} does not use a checkpoint tunnel")]
    NotCheckpointDestination(DestinationId),
    /// The child tunnel of a destination is bound once and never rebound.
    #[error("Child tunnel of {destination} is already bound to {tunnel}")]
    ChildTunnelAlreadyBound {
        /// The destination.
        destination: DestinationId,
        /// The tunnel bound first.
        tunnel: Address,
    },
    /// The zero identity can never act as a child tunnel.
    #[error("The zero address cannot be the child tunnel of {0}")]
    ZeroTunnel(DestinationId),
    /// Messages cannot be sent before the child tunnel is bound.
    #[error("Child tunnel of {0} is not bound")]
    ChildTunnelUnbound(DestinationId),
    /// The genesis configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The delivery primitive of a destination refused the message.
    #[error("Delivery to {destination} rejected: {source}")]
    TransportRejected {
        /// The destination.
        destination: DestinationId,
        /// Why the outbox refused it.
        #[source]
        source: OutboxError,
    },
}

impl StateBridgeError {
    /// Which class of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StateBridgeError::NotRegistry(_)
            | StateBridgeError::NotOwner(_)
            | StateBridgeError::NotPendingOwner(_) => ErrorKind::Authorization,
            StateBridgeError::RenounceUnsupported => ErrorKind::UnsupportedOperation,
            StateBridgeError::TransportRejected { .. } => ErrorKind::TransportRejected,
            StateBridgeError::ZeroOwner
            | StateBridgeError::UnknownDestination(_)
            | StateBridgeError::NotCheckpointDestination(_)
            | StateBridgeError::ChildTunnelAlreadyBound { .. }
            | StateBridgeError::ZeroTunnel(_)
            | StateBridgeError::ChildTunnelUnbound(_)
            | StateBridgeError::InvalidConfig(_) => ErrorKind::Configuration,
        }
    }
}

/// The coordinator module.
///
/// Holds the ordered destination list and sends every root, expiry update and remote
/// ownership change through the root chain [`Outbox`]. A call either reaches every
/// destination it addresses or none of them.
#[derive(Debug, Clone)]
pub struct StateBridge<C: Context> {
    /// Address of the module. Mirrors see it as the cross-domain sender.
    pub(crate) address: Address,

    /// The identity registry, the only caller of `PropagateRoot`.
    pub(crate) registry: StateValue<Address>,

    /// Administrator of the bridge.
    pub(crate) owner: StateValue<Address>,

    /// Proposed owner waiting to accept.
    pub(crate) pending_owner: StateValue<Address>,

    /// Destinations in fan-out order.
    pub(crate) destination_ids: StateValue<Vec<DestinationId>>,

    /// Configuration of each destination.
    pub(crate) destinations: StateMap<DestinationId, DestinationConfig>,

    /// Expiry window last pushed to the mirrors.
    pub(crate) root_history_expiry: StateValue<u64>,

    /// The root most recently propagated and when.
    pub(crate) last_propagated: StateValue<RootRecord>,

    /// Reference to the root chain delivery primitive.
    pub(crate) outbox: Outbox<C>,
}

impl<C: Context> StateBridge<C> {
    /// Creates the module at `address`, submitting through `outbox`.
    pub fn new(address: Address, outbox: Outbox<C>) -> Self {
        Self {
            address,
            registry: StateValue::new(Prefix::new_storage(MODULE_NAME, "registry")),
            owner: StateValue::new(Prefix::new_storage(MODULE_NAME, "owner")),
            pending_owner: StateValue::new(Prefix::new_storage(MODULE_NAME, "pending_owner")),
            destination_ids: StateValue::new(Prefix::new_storage(MODULE_NAME, "destination_ids")),
            destinations: StateMap::new(Prefix::new_storage(MODULE_NAME, "destinations")),
            root_history_expiry: StateValue::new(Prefix::new_storage(
                MODULE_NAME,
                "root_history_expiry",
            )),
            last_propagated: StateValue::new(Prefix::new_storage(MODULE_NAME, "last_propagated")),
            outbox,
        }
    }
}

impl<C: Context> ModuleInfo for StateBridge<C> {
    fn address(&self) -> &Address {
        &self.address
    }

    fn name(&self) -> &'static str {
        MODULE_NAME
    }
}

impl<C: Context> Module for StateBridge<C> {
    type Context = C;

    type Config = StateBridgeConfig;

    type CallMessage = CallMessage;

    type Event = StateBridgeEvent;

    fn genesis(
        &self,
        config: &Self::Config,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<(), ModuleError> {
        Ok(self.init_module(config, working_set)?)
    }

    fn call(
        &self,
        msg: Self::CallMessage,
        context: &Self::Context,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse, ModuleError> {
        match msg {
            CallMessage::PropagateRoot { root } => {
                Ok(self.propagate_root(root, context, working_set)?)
            }
            CallMessage::SetRootHistoryExpiry { expiry } => {
                Ok(self.set_root_history_expiry(expiry, context, working_set)?)
            }
            CallMessage::SetGasLimit {
                destination,
                operation,
                limit,
            } => Ok(self.set_gas_limit(destination, operation, limit, context, working_set)?),
            CallMessage::TransferRemoteOwnership {
                destination,
                new_owner,
                is_local,
            } => Ok(self.transfer_remote_ownership(
                destination,
                new_owner,
                is_local,
                context,
                working_set,
            )?),
            CallMessage::BindChildTunnel {
                destination,
                tunnel,
            } => Ok(self.bind_child_tunnel(destination, tunnel, context, working_set)?),
            CallMessage::TransferOwnership { new_owner } => {
                Ok(self.transfer_ownership(new_owner, context, working_set)?)
            }
            CallMessage::AcceptOwnership => Ok(self.accept_ownership(context, working_set)?),
            CallMessage::RenounceOwnership => Ok(self.renounce_ownership(context)?),
        }
    }
}
