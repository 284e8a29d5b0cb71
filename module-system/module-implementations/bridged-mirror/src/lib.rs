//! Destination chain module that receives roots from the state bridge and answers root
//! validity queries.
#![deny(missing_docs)]

pub mod call;
mod event;
mod genesis;
mod query;


use bridge_modules_api::{
    Address, CallResponse, Context, Module, ModuleError, ModuleInfo, Prefix, StateValue,
    WorkingSet,
};
pub use call::CallMessage;
pub use event::MirrorEvent;
pub use genesis::{BridgedMirrorConfig, MirrorSource};
use root_history::RootHistory;
pub use root_history::{RootHistoryConfig, RootHistoryError, DEFAULT_ROOT_HISTORY_EXPIRY};
use thiserror::Error;

const MODULE_NAME: &str = "BridgedMirror";

/// Errors returned by the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    /// The call did not come from the authenticated source.
    #[error("Unauthorized call from {sender} (cross-domain sender: {cross_domain_sender:?})")]
    Unauthorized {
        /// Immediate sender.
        sender: Address,
        /// Origin chain sender, if the call was relayed.
        cross_domain_sender: Option<Address>,
    },
    /// The root tunnel is bound once and never rebound.
    #[error("Root tunnel is already bound to {0}")]
    RootTunnelAlreadyBound(Address),
    /// The zero identity can never act as the root tunnel.
    #[error("The zero address cannot be the root tunnel")]
    ZeroRootTunnel,
    /// Only checkpoint mirrors have a root tunnel.
    #[error("Mirror is not fed through a checkpoint tunnel")]
    NotCheckpointMirror,
    /// The zero identity can never own the mirror.
    #[error("The zero address cannot own the mirror")]
    ZeroOwner,
}

/// A copy of the root chain's root history on a destination chain.
///
/// Writes are accepted only from the configured source: the owner for direct mirrors,
/// the bound root tunnel for checkpoint mirrors. Reads are unrestricted.
#[derive(Debug, Clone)]
pub struct BridgedMirror<C: Context> {
    pub(crate) address: Address,

    /// Owner of the mirror.
    pub(crate) owner: StateValue<Address>,

    /// `true` if the owner calls the mirror directly on this chain.
    pub(crate) owner_is_local: StateValue<bool>,

    /// Who delivers cross-domain calls to the mirror.
    pub(crate) source: StateValue<MirrorSource>,

    /// Root chain tunnel trusted by a checkpoint mirror. Bound at most once.
    pub(crate) root_tunnel: StateValue<Address>,

    pub(crate) root_history: RootHistory,

    phantom: std::marker::PhantomData<C>,
}

impl<C: Context> BridgedMirror<C> {
    /// Creates the module at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            owner: StateValue::new(Prefix::new_storage(MODULE_NAME, "owner")),
            owner_is_local: StateValue::new(Prefix::new_storage(MODULE_NAME, "owner_is_local")),
            source: StateValue::new(Prefix::new_storage(MODULE_NAME, "source")),
            root_tunnel: StateValue::new(Prefix::new_storage(MODULE_NAME, "root_tunnel")),
            root_history: RootHistory::new(MODULE_NAME),
            phantom: std::marker::PhantomData,
        }
    }
}

impl<C: Context> ModuleInfo for BridgedMirror<C> {
    fn address(&self) -> &Address {
        &self.address
    }

    fn name(&self) -> &'static str {
        MODULE_NAME
    }
}

impl<C: Context> Module for BridgedMirror<C> {
    type Context = C;

    type Config = BridgedMirrorConfig;

    type CallMessage = CallMessage;

    type Event = MirrorEvent;

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
            CallMessage::ReceiveRoot { root, timestamp } => {
                Ok(self.receive_root(root, timestamp, context, working_set)?)
            }
            CallMessage::SetRootHistoryExpiry { expiry } => {
                Ok(self.set_root_history_expiry(expiry, context, working_set)?)
            }
            CallMessage::TransferOwnership {
                new_owner,
                is_local,
            } => Ok(self.transfer_ownership(new_owner, is_local, context, working_set)?),
            CallMessage::BindRootTunnel { tunnel } => {
                Ok(self.bind_root_tunnel(tunnel, context, working_set)?)
            }
        }
    }
}
