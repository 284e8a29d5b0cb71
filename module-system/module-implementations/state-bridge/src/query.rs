use bridge_modules_api::{Address, Context, RootRecord, WorkingSet};

use crate::{DestinationConfig, DestinationId, GasOperation, StateBridge};

impl<C: Context> StateBridge<C> {
    /// Current owner.
    pub fn owner(&self, working_set: &mut WorkingSet<C::Storage>) -> Option<Address> {
        self.owner.get(working_set)
    }

    /// Owner proposed by the last `TransferOwnership`, until accepted.
    pub fn pending_owner(&self, working_set: &mut WorkingSet<C::Storage>) -> Option<Address> {
        self.pending_owner.get(working_set)
    }

    /// The identity registry.
    pub fn registry(&self, working_set: &mut WorkingSet<C::Storage>) -> Option<Address> {
        self.registry.get(working_set)
    }

    /// Every destination in fan-out order.
    pub fn destinations(&self, working_set: &mut WorkingSet<C::Storage>) -> Vec<DestinationConfig> {
        self.destination_ids
            .get(working_set)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.destinations.get(id, working_set))
            .collect()
    }

    /// Configuration of one destination.
    pub fn destination(
        &self,
        destination: &DestinationId,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Option<DestinationConfig> {
        self.destinations.get(destination, working_set)
    }

    /// Gas budget of `operation` on `destination`.
    pub fn gas_limit(
        &self,
        destination: &DestinationId,
        operation: GasOperation,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Option<u64> {
        self.destination(destination, working_set)
            .map(|config| config.gas_limits.get(operation))
    }

    /// Expiry window last pushed to the mirrors.
    pub fn root_history_expiry(&self, working_set: &mut WorkingSet<C::Storage>) -> Option<u64> {
        self.root_history_expiry.get(working_set)
    }

    /// The root most recently propagated and its propagation time.
    pub fn last_propagated(&self, working_set: &mut WorkingSet<C::Storage>) -> Option<RootRecord> {
        self.last_propagated.get(working_set)
    }
}
