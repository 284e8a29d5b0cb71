use bridge_modules_api::{Root, RootRecord, Storage, Timestamp, WorkingSet};

use crate::{RootHistory, RootHistoryError, DEFAULT_ROOT_HISTORY_EXPIRY};

impl RootHistory {
    /// The latest root, if the history was initialized.
    pub fn latest_root<S: Storage>(&self, working_set: &mut WorkingSet<S>) -> Option<Root> {
        self.latest_root.get(working_set)
    }

    /// Seconds a superseded root stays valid.
    pub fn expiry_window<S: Storage>(&self, working_set: &mut WorkingSet<S>) -> u64 {
        self.expiry_window
            .get(working_set)
            .unwrap_or(DEFAULT_ROOT_HISTORY_EXPIRY)
    }

    /// First-seen timestamp of `root`, if it was ever recorded.
    pub fn root_timestamp<S: Storage>(
        &self,
        root: &Root,
        working_set: &mut WorkingSet<S>,
    ) -> Option<Timestamp> {
        self.roots.get(root, working_set)
    }

    /// The record of `root`, if it was ever recorded.
    pub fn root_record<S: Storage>(
        &self,
        root: &Root,
        working_set: &mut WorkingSet<S>,
    ) -> Option<RootRecord> {
        self.root_timestamp(root, working_set)
            .map(|seen_at| RootRecord {
                root: *root,
                seen_at,
            })
    }

    /// Checks that `root` can be used at time `now`.
    ///
    /// The latest root is always valid. Any other root is valid while
    /// `now - seen_at <= expiry_window`.
    pub fn require_valid_root<S: Storage>(
        &self,
        root: &Root,
        now: Timestamp,
        working_set: &mut WorkingSet<S>,
    ) -> Result<(), RootHistoryError> {
        if self.latest_root(working_set).as_ref() == Some(root) {
            return Ok(());
        }

        let seen_at = self
            .roots
            .get(root, working_set)
            .ok_or(RootHistoryError::NonExistentRoot(*root))?;
        let expiry_window = self.expiry_window(working_set);

        if now.saturating_sub(seen_at) > expiry_window {
            return Err(RootHistoryError::ExpiredRoot {
                root: *root,
                seen_at,
                expiry_window,
            });
        }

        Ok(())
    }

    /// Returns `true` if `root` can be used at time `now`.
    pub fn is_valid<S: Storage>(
        &self,
        root: &Root,
        now: Timestamp,
        working_set: &mut WorkingSet<S>,
    ) -> bool {
        self.require_valid_root(root, now, working_set).is_ok()
    }
}
