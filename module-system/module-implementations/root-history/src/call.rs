use bridge_modules_api::{ModuleEvent, Root, Storage, Timestamp, WorkingSet};
use tracing::debug;

use crate::{RootHistory, RootHistoryEvent};

impl RootHistory {
    /// Makes `root` the latest root.
    ///
    /// A root that was already recorded keeps its first-seen timestamp, so re-delivery of
    /// the same root cannot extend its lifetime.
    pub fn insert<S: Storage>(
        &self,
        root: Root,
        timestamp: Timestamp,
        working_set: &mut WorkingSet<S>,
    ) {
        let seen_at = match self.roots.get(&root, working_set) {
            Some(seen_at) => {
                debug!(%root, seen_at, "Root already recorded, keeping first-seen timestamp");
                seen_at
            }
            None => {
                self.roots.set(&root, &timestamp, working_set);
                timestamp
            }
        };

        self.latest_root.set(&root, working_set);
        RootHistoryEvent::RootAdded {
            root,
            timestamp: seen_at,
        }
        .emit(working_set);
    }

    /// Replaces the expiry window. Applies to every later validity check.
    pub fn set_expiry_window<S: Storage>(&self, expiry_window: u64, working_set: &mut WorkingSet<S>) {
        self.expiry_window.set(&expiry_window, working_set);
        RootHistoryEvent::RootHistoryExpirySet { expiry_window }.emit(working_set);
    }
}
