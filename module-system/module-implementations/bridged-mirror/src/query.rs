use bridge_modules_api::{Address, Context, Root, Timestamp, WorkingSet};

use crate::{BridgedMirror, MirrorSource};

impl<C: Context> BridgedMirror<C> {
    /// The most recently received root.
    pub fn latest_root(&self, working_set: &mut WorkingSet<C::Storage>) -> Option<Root> {
        self.root_history.latest_root(working_set)
    }

    /// Returns `true` if `root` is the latest root, or was superseded no longer than the
    /// expiry window before `now`.
    pub fn is_valid_root(
        &self,
        root: &Root,
        now: Timestamp,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> bool {
        self.root_history.is_valid(root, now, working_set)
    }

    /// Like [`Self::is_valid_root`], with the reason a root is rejected.
    pub fn require_valid_root(
        &self,
        root: &Root,
        now: Timestamp,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<(), root_history::RootHistoryError> {
        self.root_history.require_valid_root(root, now, working_set)
    }

    /// First-seen time of `root`.
    pub fn root_timestamp(
        &self,
        root: &Root,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Option<Timestamp> {
        self.root_history.root_timestamp(root, working_set)
    }

    /// Expiry window in seconds.
    pub fn root_history_expiry(&self, working_set: &mut WorkingSet<C::Storage>) -> u64 {
        self.root_history.expiry_window(working_set)
    }

    /// Current owner.
    pub fn owner(&self, working_set: &mut WorkingSet<C::Storage>) -> Option<Address> {
        self.owner.get(working_set)
    }

    /// Whether the owner is local to this chain.
    pub fn owner_is_local(&self, working_set: &mut WorkingSet<C::Storage>) -> bool {
        self.owner_is_local.get(working_set).unwrap_or_default()
    }

    /// Delivery source.
    pub fn source(&self, working_set: &mut WorkingSet<C::Storage>) -> Option<MirrorSource> {
        self.source.get(working_set)
    }

    /// The bound root tunnel of a checkpoint mirror.
    pub fn root_tunnel(&self, working_set: &mut WorkingSet<C::Storage>) -> Option<Address> {
        self.root_tunnel.get(working_set)
    }
}
