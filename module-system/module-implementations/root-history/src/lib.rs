//! Root history kept by a mirror: every root it has ever received, the time it was first
//! seen, the latest root and the window after which a superseded root stops being valid.
#![deny(missing_docs)]

mod call;
mod event;
mod genesis;
mod query;


use bridge_modules_api::{Prefix, Root, StateMap, StateValue, Timestamp};
pub use event::RootHistoryEvent;
pub use genesis::{RootHistoryConfig, DEFAULT_ROOT_HISTORY_EXPIRY};
use thiserror::Error;

/// Errors returned when a root is required to be valid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RootHistoryError {
    /// The root was never received.
    #[error("Root {0} was never recorded")]
    NonExistentRoot(Root),
    /// The root was superseded longer than the expiry window ago.
    #[error("Root {root} seen at {seen_at} expired after {expiry_window}s")]
    ExpiredRoot {
        /// The expired root.
        root: Root,
        /// When it was first recorded.
        seen_at: Timestamp,
        /// The window in effect at the time of the check.
        expiry_window: u64,
    },
}

/// Append-only store of roots. Entries are never deleted, they only expire logically.
///
/// The store does no authorization; the module embedding it decides who may insert.
#[derive(Debug, Clone)]
pub struct RootHistory {
    /// First-seen timestamp of every recorded root.
    pub(crate) roots: StateMap<Root, Timestamp>,

    /// The most recently inserted root. Always valid.
    pub(crate) latest_root: StateValue<Root>,

    /// Seconds a superseded root stays valid.
    pub(crate) expiry_window: StateValue<u64>,
}

impl RootHistory {
    /// Creates the store with its state namespaced under `module_name`.
    pub fn new(module_name: &str) -> Self {
        let namespace = format!("{module_name}/RootHistory");
        Self {
            roots: StateMap::new(Prefix::new_storage(&namespace, "roots")),
            latest_root: StateValue::new(Prefix::new_storage(&namespace, "latest_root")),
            expiry_window: StateValue::new(Prefix::new_storage(&namespace, "expiry_window")),
        }
    }
}
