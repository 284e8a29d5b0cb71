//! Two-step ownership of the coordinator. The current owner proposes, the proposed owner
//! accepts; until then `owner()` is unchanged. The owner can never be cleared.

use anyhow::{bail, Result};
use bridge_modules_api::{Address, CallResponse, Context, ModuleEvent, WorkingSet};
use tracing::{info, warn};

use crate::{StateBridge, StateBridgeError, StateBridgeEvent};

impl<C: Context> StateBridge<C> {
    /// Fails unless `context` is signed by the owner. Returns the owner.
    pub(crate) fn ensure_owner(
        &self,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<Address> {
        let owner = self.owner.get_or_err(working_set)?;
        if context.sender() != &owner {
            warn!(sender = %context.sender(), "Rejecting call from a non-owner");
            bail!(StateBridgeError::NotOwner(*context.sender()));
        }
        Ok(owner)
    }

    pub(crate) fn transfer_ownership(
        &self,
        new_owner: Address,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        let previous_owner = self.ensure_owner(context, working_set)?;
        if new_owner.is_zero() {
            bail!(StateBridgeError::ZeroOwner);
        }

        self.pending_owner.set(&new_owner, working_set);
        info!(%previous_owner, %new_owner, "Ownership transfer started");
        StateBridgeEvent::OwnershipTransferStarted {
            previous_owner,
            new_owner,
        }
        .emit(working_set);
        Ok(CallResponse::default())
    }

    pub(crate) fn accept_ownership(
        &self,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse> {
        let sender = *context.sender();
        if self.pending_owner.get(working_set) != Some(sender) {
            warn!(%sender, "Rejecting ownership acceptance");
            bail!(StateBridgeError::NotPendingOwner(sender));
        }

        let previous_owner = self.owner.get_or_err(working_set)?;
        self.owner.set(&sender, working_set);
        self.pending_owner.delete(working_set);

        info!(%previous_owner, new_owner = %sender, "Ownership transferred");
        StateBridgeEvent::OwnershipTransferred {
            previous_owner,
            new_owner: sender,
        }
        .emit(working_set);
        Ok(CallResponse::default())
    }

    pub(crate) fn renounce_ownership(&self, context: &C) -> Result<CallResponse> {
        warn!(sender = %context.sender(), "Refusing to renounce ownership");
        bail!(StateBridgeError::RenounceUnsupported)
    }
}
