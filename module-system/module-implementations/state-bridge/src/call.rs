//! Calls accepted by the coordinator: root propagation and bridge administration.

use anyhow::{bail, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::{
    Address, CallResponse, Context, ModuleEvent, Root, RootRecord, WorkingSet,
};
use tracing::info;

use crate::transport::TransportAdapter;
use crate::{
    DestinationConfig, DestinationId, GasOperation, StateBridge, StateBridgeError,
    StateBridgeEvent, TransportKind,
};

/// Calls accepted by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum CallMessage {
    /// Sends `root` to every destination. Identity registry only.
    PropagateRoot {
        /// The new accumulator root.
        root: Root,
    },
    /// Sets the expiry window of every mirror. Owner only.
    SetRootHistoryExpiry {
        /// Window in seconds.
        expiry: u64,
    },
    /// Changes one gas budget of one destination. Owner only.
    SetGasLimit {
        /// The destination.
        destination: DestinationId,
        /// The operation.
        operation: GasOperation,
        /// The new budget.
        limit: u64,
    },
    /// Hands one mirror to a new owner. Owner only.
    TransferRemoteOwnership {
        /// The destination.
        destination: DestinationId,
        /// The new mirror owner.
        new_owner: Address,
        /// `true` if the new owner will call the mirror directly on its chain.
        is_local: bool,
    },
    /// Binds the child tunnel of a checkpoint destination. Owner only, once.
    BindChildTunnel {
        /// The destination.
        destination: DestinationId,
        /// The mirror acting as child tunnel.
        tunnel: Address,
    },
    /// Proposes a new owner. Owner only.
    TransferOwnership {
        /// The proposed owner.
        new_owner: Address,
    },
    /// Completes a transfer. Pending owner only.
    AcceptOwnership,
    /// Always fails.
    RenounceOwnership,
}

impl<C: Context> StateBridge<C> {
    fn adapter<'a>(&'a self, destination: &'a DestinationConfig) -> TransportAdapter<'a, C> {
        TransportAdapter {
            outbox: &self.outbox,
            sender: self.address,
            destination,
        }
    }

    fn destination_or_err(
        &self,
        destination: &DestinationId,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<DestinationConfig> {
        match self.destinations.get(destination, working_set) {
            Some(config) => Ok(config),
            None => bail!(StateBridgeError::UnknownDestination(destination.clone())),
        }
    }

    pub(crate) fn propagate_root(
        &self,
        root: Root,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        let registry = self.registry.get_or_err(working_set)?;
        if context.sender() != &registry {
            bail!(StateBridgeError::NotRegistry(*context.sender()));
        }

        let timestamp = context.timestamp();
        for destination in self.destinations(working_set) {
            self.adapter(&destination)
                .send_root(root, timestamp, working_set)?;
        }

        self.last_propagated.set(
            &RootRecord {
                root,
                seen_at: timestamp,
            },
            working_set,
        );
        info!(%root, timestamp, "Root propagated");
        StateBridgeEvent::RootPropagated { root, timestamp }.emit(working_set);
        Ok(CallResponse::default())
    }

    pub(crate) fn set_root_history_expiry(
        &self,
        expiry: u64,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        self.ensure_owner(context, working_set)?;

        self.root_history_expiry.set(&expiry, working_set);
        for destination in self.destinations(working_set) {
            self.adapter(&destination)
                .set_remote_expiry(expiry, working_set)?;
        }

        info!(expiry, "Root history expiry set");
        StateBridgeEvent::RootHistoryExpirySet { expiry }.emit(working_set);
        Ok(CallResponse::default())
    }

    pub(crate) fn set_gas_limit(
        &self,
        destination: DestinationId,
        operation: GasOperation,
        limit: u64,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        self.ensure_owner(context, working_set)?;

        let mut config = self.destination_or_err(&destination, working_set)?;
        config.gas_limits.set(operation, limit);
        self.destinations.set(&destination, &config, working_set);

        info!(%destination, %operation, limit, "Gas limit set");
        StateBridgeEvent::GasLimitSet {
            destination,
            operation,
            limit,
        }
        .emit(working_set);
        Ok(CallResponse::default())
    }

    pub(crate) fn transfer_remote_ownership(
        &self,
        destination: DestinationId,
        new_owner: Address,
        is_local: bool,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        self.ensure_owner(context, working_set)?;
        if new_owner.is_zero() {
            bail!(StateBridgeError::ZeroOwner);
        }

        let config = self.destination_or_err(&destination, working_set)?;
        self.adapter(&config)
            .transfer_remote_ownership(new_owner, is_local, working_set)?;

        info!(%destination, %new_owner, is_local, "Remote ownership transferred");
        StateBridgeEvent::RemoteOwnershipTransferred {
            destination,
            new_owner,
            is_local,
        }
        .emit(working_set);
        Ok(CallResponse::default())
    }

    pub(crate) fn bind_child_tunnel(
        &self,
        destination: DestinationId,
        tunnel: Address,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        self.ensure_owner(context, working_set)?;

        let mut config = self.destination_or_err(&destination, working_set)?;
        if tunnel.is_zero() {
            bail!(StateBridgeError::ZeroTunnel(destination));
        }
        match &mut config.transport {
            TransportKind::DirectMessenger { .. } => {
                bail!(StateBridgeError::NotCheckpointDestination(destination))
            }
            TransportKind::CheckpointTunnel {
                child_tunnel: Some(bound),
                ..
            } => bail!(StateBridgeError::ChildTunnelAlreadyBound {
                destination,
                tunnel: *bound,
            }),
            TransportKind::CheckpointTunnel { child_tunnel, .. } => {
                *child_tunnel = Some(tunnel);
            }
        }
        self.destinations.set(&destination, &config, working_set);

        info!(%destination, %tunnel, "Child tunnel bound");
        StateBridgeEvent::ChildTunnelBound {
            destination,
            tunnel,
        }
        .emit(working_set);
        Ok(CallResponse::default())
    }
}
