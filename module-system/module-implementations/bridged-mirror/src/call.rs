//! Calls accepted by the mirror and the authentication of their source.

use anyhow::{bail, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::{
    Address, CallResponse, Context, ModuleEvent, Root, Timestamp, WorkingSet,
};
use tracing::{info, warn};

use crate::{BridgedMirror, MirrorError, MirrorEvent, MirrorSource};

/// Calls accepted by the mirror.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum CallMessage {
    /// Makes `root` the latest root.
    ReceiveRoot {
        /// The root.
        root: Root,
        /// Root chain block time at propagation. Becomes the root's first-seen time.
        timestamp: Timestamp,
    },
    /// Replaces the root history expiry window.
    SetRootHistoryExpiry {
        /// New window in seconds.
        expiry: u64,
    },
    /// Hands the mirror to a new owner.
    TransferOwnership {
        /// The new owner.
        new_owner: Address,
        /// `true` if the new owner will call the mirror directly on this chain.
        is_local: bool,
    },
    /// Sets the root tunnel of a checkpoint mirror. Only the local owner may call it, and
    /// only once.
    BindRootTunnel {
        /// The root chain tunnel.
        tunnel: Address,
    },
}

impl<C: Context> BridgedMirror<C> {
    /// Fails unless the call comes from the source the mirror trusts.
    fn ensure_authorized_source(
        &self,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<()> {
        let sender = context.sender();
        let cross_domain_sender = context.cross_domain_sender();

        let authorized = match self.source.get_or_err(working_set)? {
            MirrorSource::DirectMessenger { messenger } => {
                let owner = self.owner.get_or_err(working_set)?;
                if self.owner_is_local.get(working_set).unwrap_or_default() {
                    sender == &owner
                } else {
                    sender == &messenger && cross_domain_sender == Some(&owner)
                }
            }
            MirrorSource::CheckpointTunnel { state_receiver, .. } => {
                match self.root_tunnel.get(working_set) {
                    Some(tunnel) => {
                        sender == &state_receiver && cross_domain_sender == Some(&tunnel)
                    }
                    None => false,
                }
            }
        };

        if !authorized {
            warn!(
                %sender,
                cross_domain_sender = ?cross_domain_sender,
                "Rejecting call from an unauthorized source"
            );
            bail!(MirrorError::Unauthorized {
                sender: *sender,
                cross_domain_sender: cross_domain_sender.copied(),
            });
        }
        Ok(())
    }

    pub(crate) fn receive_root(
        &self,
        root: Root,
        timestamp: Timestamp,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        self.ensure_authorized_source(context, working_set)?;
        self.root_history.insert(root, timestamp, working_set);
        info!(%root, timestamp, "Received root");
        Ok(CallResponse::default())
    }

    pub(crate) fn set_root_history_expiry(
        &self,
        expiry: u64,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        self.ensure_authorized_source(context, working_set)?;
        self.root_history.set_expiry_window(expiry, working_set);
        info!(expiry, "Root history expiry updated");
        Ok(CallResponse::default())
    }

    pub(crate) fn transfer_ownership(
        &self,
        new_owner: Address,
        is_local: bool,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        self.ensure_authorized_source(context, working_set)?;
        if new_owner.is_zero() {
            bail!(MirrorError::ZeroOwner);
        }

        let previous_owner = self.owner.get_or_err(working_set)?;
        self.owner.set(&new_owner, working_set);
        self.owner_is_local.set(&is_local, working_set);

        info!(%previous_owner, %new_owner, is_local, "Mirror ownership transferred");
        MirrorEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
            is_local,
        }
        .emit(working_set);
        Ok(CallResponse::default())
    }

    pub(crate) fn bind_root_tunnel(
        &self,
        tunnel: Address,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        if !matches!(
            self.source.get_or_err(working_set)?,
            MirrorSource::CheckpointTunnel { .. }
        ) {
            bail!(MirrorError::NotCheckpointMirror);
        }

        let owner = self.owner.get_or_err(working_set)?;
        let owner_is_local = self.owner_is_local.get(working_set).unwrap_or_default();
        if !owner_is_local || context.sender() != &owner {
            bail!(MirrorError::Unauthorized {
                sender: *context.sender(),
                cross_domain_sender: context.cross_domain_sender().copied(),
            });
        }

        if tunnel.is_zero() {
            bail!(MirrorError::ZeroRootTunnel);
        }
        if let Some(bound) = self.root_tunnel.get(working_set) {
            bail!(MirrorError::RootTunnelAlreadyBound(bound));
        }

        self.root_tunnel.set(&tunnel, working_set);
        info!(%tunnel, "Root tunnel bound");
        MirrorEvent::RootTunnelBound { tunnel }.emit(working_set);
        Ok(CallResponse::default())
    }
}
