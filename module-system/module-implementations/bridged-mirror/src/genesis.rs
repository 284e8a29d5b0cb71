use anyhow::{bail, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::{Address, Context, WorkingSet};
use root_history::RootHistoryConfig;
use serde::{Deserialize, Serialize};

use crate::{BridgedMirror, MirrorError};

/// Who delivers cross-domain calls to the mirror.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum MirrorSource {
    /// A cross-domain messenger. Calls are accepted when the messenger relays a message
    /// whose origin sender is the owner.
    DirectMessenger {
        /// The local messenger.
        messenger: Address,
    },
    /// A checkpoint state receiver. Calls are accepted when the receiver relays a message
    /// whose origin sender is the bound root tunnel.
    CheckpointTunnel {
        /// The local state receiver.
        state_receiver: Address,
        /// The root tunnel, if known at genesis.
        #[serde(default)]
        root_tunnel: Option<Address>,
    },
}

/// Initial state of a mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgedMirrorConfig {
    /// Initial owner. Usually the coordinator on the root chain.
    pub owner: Address,
    /// `true` if the owner calls the mirror directly on this chain.
    #[serde(default)]
    pub owner_is_local: bool,
    /// Delivery source of the mirror.
    pub source: MirrorSource,
    /// Genesis root and expiry window.
    pub root_history: RootHistoryConfig,
}

impl<C: Context> BridgedMirror<C> {
    pub(crate) fn init_module(
        &self,
        config: &BridgedMirrorConfig,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<()> {
        if config.owner.is_zero() {
            bail!(MirrorError::ZeroOwner);
        }

        self.owner.set(&config.owner, working_set);
        self.owner_is_local.set(&config.owner_is_local, working_set);
        self.source.set(&config.source, working_set);
        if let MirrorSource::CheckpointTunnel {
            root_tunnel: Some(tunnel),
            ..
        } = &config.source
        {
            if tunnel.is_zero() {
                bail!(MirrorError::ZeroRootTunnel);
            }
            self.root_tunnel.set(tunnel, working_set);
        }

        self.root_history.init(&config.root_history, working_set)
    }
}
