//! Deployment description of a whole bridge: the root chain modules and one mirror per
//! destination chain, loaded from a TOML file.
//!
//! ```toml
//! [root_chain]
//! genesis_time = 1700000000
//! state_bridge_address = "0x05..."
//! outbox_address = "0x06..."
//!
//! [root_chain.state_bridge]
//! registry = "0x01..."
//! owner = "0x02..."
//!
//! [[root_chain.state_bridge.destinations]]
//! id = "optimism"
//! transport = { style = "direct_messenger", messenger = "0x03...", mirror = "0x04..." }
//!
//! [[mirrors]]
//! destination = "optimism"
//! genesis_time = 1700000000
//! mirror_address = "0x04..."
//! inbox_address = "0x07..."
//! ```

use std::path::Path;

use anyhow::{bail, Result};
use bridge_modules_api::config::from_toml_path;
use bridge_modules_api::{Address, Timestamp};
use bridged_mirror::BridgedMirrorConfig;
use bridge_messenger::{InboxConfig, OutboxConfig};
use serde::{Deserialize, Serialize};

use crate::{DestinationId, StateBridgeConfig, TransportKind};

/// Genesis of the root chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootChainDeployment {
    /// Block time of the first block.
    pub genesis_time: Timestamp,
    /// Module address of the coordinator.
    pub state_bridge_address: Address,
    /// Module address of the outbox.
    pub outbox_address: Address,
    /// The coordinator.
    pub state_bridge: StateBridgeConfig,
    /// Endpoints of the delivery infrastructure.
    #[serde(default)]
    pub outbox: OutboxConfig,
}

/// Genesis of one destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorDeployment {
    /// Id of the coordinator destination this chain serves.
    pub destination: DestinationId,
    /// Block time of the first block.
    pub genesis_time: Timestamp,
    /// Module address of the mirror.
    pub mirror_address: Address,
    /// Module address of the inbox.
    pub inbox_address: Address,
    /// The mirror.
    pub mirror: BridgedMirrorConfig,
    /// Endpoints accepted by the chain.
    pub inbox: InboxConfig,
}

/// A complete bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeDeployment {
    /// The root chain.
    pub root_chain: RootChainDeployment,
    /// Every destination chain.
    #[serde(default)]
    pub mirrors: Vec<MirrorDeployment>,
}

impl BridgeDeployment {
    /// Reads and validates a deployment file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let deployment: Self = from_toml_path(path)?;
        deployment.validate()?;
        Ok(deployment)
    }

    /// Checks that every mirror serves a configured destination at the address the
    /// coordinator sends to, and that every mirror starts from the same genesis root.
    pub fn validate(&self) -> Result<()> {
        let destinations = &self.root_chain.state_bridge.destinations;
        for mirror in &self.mirrors {
            let Some(destination) = destinations.iter().find(|d| d.id == mirror.destination)
            else {
                bail!(
                    "Mirror for {} has no matching destination on the root chain",
                    mirror.destination
                );
            };

            let target = match &destination.transport {
                TransportKind::DirectMessenger { mirror, .. } => Some(*mirror),
                TransportKind::CheckpointTunnel { child_tunnel, .. } => *child_tunnel,
            };
            if let Some(target) = target {
                if target != mirror.mirror_address {
                    bail!(
                        "Destination {} sends to {target} but its mirror is deployed at {}",
                        mirror.destination,
                        mirror.mirror_address
                    );
                }
            }
        }

        let mut genesis_roots = self
            .mirrors
            .iter()
            .map(|mirror| mirror.mirror.root_history.genesis_root);
        if let Some(first) = genesis_roots.next() {
            if let Some(other) = genesis_roots.find(|root| root != &first) {
                bail!("Mirrors disagree on the genesis root: {first} and {other}");
            }
        }
        Ok(())
    }

    /// The deployment of the mirror serving `destination`.
    pub fn mirror(&self, destination: &str) -> Option<&MirrorDeployment> {
        self.mirrors
            .iter()
            .find(|mirror| mirror.destination == destination)
    }
}
