use std::collections::BTreeSet;

use anyhow::{bail, Result};
use bridge_modules_api::{Address, Context, WorkingSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{DestinationConfig, StateBridge, StateBridgeError, TransportKind};

fn default_root_history_expiry() -> u64 {
    bridged_mirror::DEFAULT_ROOT_HISTORY_EXPIRY
}

/// Initial state of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBridgeConfig {
    /// The identity registry allowed to propagate roots.
    pub registry: Address,
    /// Administrator of the bridge.
    pub owner: Address,
    /// Expiry window the mirrors were deployed with.
    #[serde(default = "default_root_history_expiry")]
    pub root_history_expiry: u64,
    /// Destinations in fan-out order.
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

impl<C: Context> StateBridge<C> {
    pub(crate) fn init_module(
        &self,
        config: &StateBridgeConfig,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<()> {
        if config.owner.is_zero() {
            bail!(StateBridgeError::ZeroOwner);
        }
        if config.registry.is_zero() {
            bail!(StateBridgeError::InvalidConfig(
                "The registry cannot be the zero address".to_string()
            ));
        }

        let mut ids = BTreeSet::new();
        for destination in &config.destinations {
            if !ids.insert(destination.id.clone()) {
                bail!(StateBridgeError::InvalidConfig(format!(
                    "Destination {} is listed twice",
                    destination.id
                )));
            }
            if let TransportKind::CheckpointTunnel {
                child_tunnel: Some(tunnel),
                ..
            } = &destination.transport
            {
                if tunnel.is_zero() {
                    bail!(StateBridgeError::ZeroTunnel(destination.id.clone()));
                }
            }
            self.destinations
                .set(&destination.id, destination, working_set);
        }

        let ordered: Vec<_> = config
            .destinations
            .iter()
            .map(|destination| destination.id.clone())
            .collect();
        self.destination_ids.set(&ordered, working_set);
        self.registry.set(&config.registry, working_set);
        self.owner.set(&config.owner, working_set);
        self.root_history_expiry
            .set(&config.root_history_expiry, working_set);

        info!(
            registry = %config.registry,
            owner = %config.owner,
            destinations = ordered.len(),
            "State bridge initialized"
        );
        Ok(())
    }
}
