//! The per-destination transport adapter.
//!
//! Every destination pairs a delivery style with its gas budgets. The adapter turns a
//! mirror operation into a borsh encoded [`bridged_mirror::CallMessage`] and submits it to
//! the root chain [`Outbox`]. Submission is fire-and-forget: success only means the outbox
//! accepted the envelope.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::{Address, Context, Root, Timestamp, WorkingSet};
use bridged_mirror::CallMessage as MirrorCallMessage;
use bridge_messenger::Outbox;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::StateBridgeError;

/// Gas attached to every message unless configured otherwise.
pub const DEFAULT_GAS_LIMIT: u64 = 100_000;

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

/// Name of a destination, e.g. `"optimism"`.
pub type DestinationId = String;

/// How messages reach the mirror of a destination.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum TransportKind {
    /// Authenticated call through a cross-domain messenger.
    DirectMessenger {
        /// Root chain messenger endpoint.
        messenger: Address,
        /// The mirror on the destination chain.
        mirror: Address,
    },
    /// Message committed into a root chain checkpoint and relayed with a proof.
    CheckpointTunnel {
        /// Root chain state sender endpoint.
        state_sender: Address,
        /// The mirror acting as child tunnel. Bound once after deployment.
        #[serde(default)]
        child_tunnel: Option<Address>,
    },
}

impl TransportKind {
    /// Outbox endpoint and destination module of the route.
    fn route(&self, destination: &DestinationId) -> Result<(Address, Address), StateBridgeError> {
        match self {
            TransportKind::DirectMessenger { messenger, mirror } => Ok((*messenger, *mirror)),
            TransportKind::CheckpointTunnel {
                state_sender,
                child_tunnel,
            } => child_tunnel
                .map(|tunnel| (*state_sender, tunnel))
                .ok_or_else(|| StateBridgeError::ChildTunnelUnbound(destination.clone())),
        }
    }
}

/// Mirror operations with their own gas budget.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GasOperation {
    /// Delivering a new root.
    SendRoot,
    /// Updating the expiry window.
    SetRootHistoryExpiry,
    /// Handing the mirror to a new owner.
    TransferOwnership,
}

impl fmt::Display for GasOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GasOperation::SendRoot => "send_root",
            GasOperation::SetRootHistoryExpiry => "set_root_history_expiry",
            GasOperation::TransferOwnership => "transfer_ownership",
        };
        f.write_str(name)
    }
}

/// Gas budget of each mirror operation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct GasLimits {
    /// Budget of `send_root`.
    #[serde(default = "default_gas_limit")]
    pub send_root: u64,
    /// Budget of `set_root_history_expiry`.
    #[serde(default = "default_gas_limit")]
    pub set_root_history_expiry: u64,
    /// Budget of `transfer_ownership`.
    #[serde(default = "default_gas_limit")]
    pub transfer_ownership: u64,
}

impl Default for GasLimits {
    fn default() -> Self {
        Self {
            send_root: DEFAULT_GAS_LIMIT,
            set_root_history_expiry: DEFAULT_GAS_LIMIT,
            transfer_ownership: DEFAULT_GAS_LIMIT,
        }
    }
}

impl GasLimits {
    /// Budget of `operation`.
    pub fn get(&self, operation: GasOperation) -> u64 {
        match operation {
            GasOperation::SendRoot => self.send_root,
            GasOperation::SetRootHistoryExpiry => self.set_root_history_expiry,
            GasOperation::TransferOwnership => self.transfer_ownership,
        }
    }

    /// Replaces the budget of `operation` and leaves the others untouched.
    pub fn set(&mut self, operation: GasOperation, limit: u64) {
        match operation {
            GasOperation::SendRoot => self.send_root = limit,
            GasOperation::SetRootHistoryExpiry => self.set_root_history_expiry = limit,
            GasOperation::TransferOwnership => self.transfer_ownership = limit,
        }
    }
}

/// One destination chain.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct DestinationConfig {
    /// Unique name of the destination.
    pub id: DestinationId,
    /// Delivery route.
    pub transport: TransportKind,
    /// Gas budgets.
    #[serde(default)]
    pub gas_limits: GasLimits,
}

/// Sends mirror operations to one destination.
pub(crate) struct TransportAdapter<'a, C: Context> {
    pub(crate) outbox: &'a Outbox<C>,
    pub(crate) sender: Address,
    pub(crate) destination: &'a DestinationConfig,
}

impl<'a, C: Context> TransportAdapter<'a, C> {
    pub(crate) fn send_root(
        &self,
        root: Root,
        timestamp: Timestamp,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<u64, StateBridgeError> {
        self.submit(
            MirrorCallMessage::ReceiveRoot { root, timestamp },
            GasOperation::SendRoot,
            working_set,
        )
    }

    pub(crate) fn set_remote_expiry(
        &self,
        expiry: u64,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<u64, StateBridgeError> {
        self.submit(
            MirrorCallMessage::SetRootHistoryExpiry { expiry },
            GasOperation::SetRootHistoryExpiry,
            working_set,
        )
    }

    pub(crate) fn transfer_remote_ownership(
        &self,
        new_owner: Address,
        is_local: bool,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<u64, StateBridgeError> {
        self.submit(
            MirrorCallMessage::TransferOwnership {
                new_owner,
                is_local,
            },
            GasOperation::TransferOwnership,
            working_set,
        )
    }

    fn submit(
        &self,
        message: MirrorCallMessage,
        operation: GasOperation,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<u64, StateBridgeError> {
        let destination = &self.destination.id;
        let (endpoint, target) = self.destination.transport.route(destination)?;
        let payload = message
            .try_to_vec()
            .map_err(|e| StateBridgeError::InvalidConfig(e.to_string()))?;
        let gas_limit = self.destination.gas_limits.get(operation);

        let nonce = self
            .outbox
            .submit(endpoint, self.sender, target, payload, gas_limit, working_set)
            .map_err(|source| StateBridgeError::TransportRejected {
                destination: destination.clone(),
                source,
            })?;

        debug!(%destination, %operation, nonce, gas_limit, "Message submitted");
        Ok(nonce)
    }
}
