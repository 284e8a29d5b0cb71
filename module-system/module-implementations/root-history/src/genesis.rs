use anyhow::Result;
use bridge_modules_api::{Root, Storage, Timestamp, WorkingSet};
use serde::{Deserialize, Serialize};

use crate::RootHistory;

/// One week.
pub const DEFAULT_ROOT_HISTORY_EXPIRY: u64 = 7 * 24 * 60 * 60;

fn default_expiry_window() -> u64 {
    DEFAULT_ROOT_HISTORY_EXPIRY
}

/// Initial state of a root history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootHistoryConfig {
    /// Root that is latest before anything has been propagated.
    pub genesis_root: Root,
    /// First-seen timestamp recorded for the genesis root.
    #[serde(default)]
    pub genesis_timestamp: Timestamp,
    /// Seconds a superseded root stays valid.
    #[serde(default = "default_expiry_window")]
    pub expiry_window: u64,
}

impl RootHistoryConfig {
    /// Config with the default expiry window.
    pub fn new(genesis_root: Root, genesis_timestamp: Timestamp) -> Self {
        Self {
            genesis_root,
            genesis_timestamp,
            expiry_window: DEFAULT_ROOT_HISTORY_EXPIRY,
        }
    }
}

impl RootHistory {
    /// Records the genesis root as latest and sets the initial expiry window.
    pub fn init<S: Storage>(
        &self,
        config: &RootHistoryConfig,
        working_set: &mut WorkingSet<S>,
    ) -> Result<()> {
        self.roots
            .set(&config.genesis_root, &config.genesis_timestamp, working_set);
        self.latest_root.set(&config.genesis_root, working_set);
        self.expiry_window.set(&config.expiry_window, working_set);
        Ok(())
    }
}
