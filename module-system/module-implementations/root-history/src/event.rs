use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::{ModuleEvent, Root, Timestamp};

/// Notifications emitted by the root history.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum RootHistoryEvent {
    /// A root became the latest root. `timestamp` is the first time it was seen.
    RootAdded {
        /// The new latest root.
        root: Root,
        /// First-seen timestamp of the root.
        timestamp: Timestamp,
    },
    /// The expiry window was replaced.
    RootHistoryExpirySet {
        /// The new window in seconds.
        expiry_window: u64,
    },
}

impl ModuleEvent for RootHistoryEvent {
    fn key(&self) -> &'static str {
        match self {
            RootHistoryEvent::RootAdded { .. } => "RootAdded",
            RootHistoryEvent::RootHistoryExpirySet { .. } => "RootHistoryExpirySet",
        }
    }
}
