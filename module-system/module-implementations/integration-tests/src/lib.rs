//! A whole bridge network in memory: the root chain with the coordinator and the outbox,
//! and one chain per destination with its inbox, its mirror and a relayer per endpoint.

use anyhow::Result;
use bridge_modules_api::{Address, DefaultContext, ModuleInfo, Root, RootRecord, Timestamp};
use bridged_mirror::{BridgedMirror, BridgedMirrorConfig, MirrorSource, RootHistoryConfig};
use bridge_messenger::{
    DeliveryStyle, EndpointConfig, Inbox, InboxConfig, InboxEndpoint, MockChain, Outbox,
    OutboxConfig, RelayOutcome, Relayer, TransactionReceipt,
};
use state_bridge::config::{BridgeDeployment, MirrorDeployment, RootChainDeployment};
use state_bridge::{
    CallMessage, DestinationConfig, GasLimits, StateBridge, StateBridgeConfig, TransportKind,
};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Context of every chain in the network.
pub type C = DefaultContext;

/// Block time of the first block of every chain.
pub const GENESIS_TIME: Timestamp = 1_700_000_000;
/// Expiry window the network is deployed with.
pub const ROOT_HISTORY_EXPIRY: u64 = 3_600;
/// Root every mirror starts from.
pub const GENESIS_ROOT: u64 = 0x111;

/// The coordinator module.
pub const STATE_BRIDGE: Address = Address::new([0x01; 32]);
/// The root chain outbox module.
pub const OUTBOX: Address = Address::new([0x02; 32]);
/// The inbox module of every destination chain.
pub const INBOX: Address = Address::new([0x03; 32]);
/// The identity registry allowed to propagate roots.
pub const REGISTRY: Address = Address::new([0x04; 32]);
/// Owner of the coordinator and of the checkpoint mirror.
pub const OWNER: Address = Address::new([0x05; 32]);
/// Relayer operator and checkpoint oracle.
pub const OPERATOR: Address = Address::new([0x06; 32]);
/// Root chain endpoint of the checkpoint destination.
pub const STATE_SENDER: Address = Address::new([0x07; 32]);
/// Destination chain state receiver of the checkpoint destination.
pub const STATE_RECEIVER: Address = Address::new([0x08; 32]);

/// Root chain endpoint of the direct destination at `index`.
pub fn messenger(index: u8) -> Address {
    Address::new([0x10 + index; 32])
}

/// Destination chain messenger of the direct destination at `index`.
pub fn receiver(index: u8) -> Address {
    Address::new([0x20 + index; 32])
}

/// Mirror of the destination at `index`.
pub fn mirror_address(index: u8) -> Address {
    Address::new([0x30 + index; 32])
}

/// Installs a fmt subscriber honoring `RUST_LOG`. Safe to call from every test.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_test_writer()
        .try_init();
}

/// Deployment with two direct messenger destinations, `optimism` and `base`, and one
/// checkpoint destination, `polygon`, whose child tunnel is left unbound.
pub fn standard_deployment() -> BridgeDeployment {
    let direct = ["optimism", "base"];
    let mut destinations: Vec<DestinationConfig> = direct
        .iter()
        .zip(0u8..)
        .map(|(id, index)| DestinationConfig {
            id: id.to_string(),
            transport: TransportKind::DirectMessenger {
                messenger: messenger(index),
                mirror: mirror_address(index),
            },
            gas_limits: GasLimits::default(),
        })
        .collect();
    destinations.push(DestinationConfig {
        id: "polygon".to_string(),
        transport: TransportKind::CheckpointTunnel {
            state_sender: STATE_SENDER,
            child_tunnel: None,
        },
        gas_limits: GasLimits::default(),
    });

    let mut endpoints: Vec<EndpointConfig> = (0u8..2)
        .map(|index| EndpointConfig {
            endpoint: messenger(index),
            style: DeliveryStyle::Direct,
            base_gas: 40_000,
            gas_per_byte: 16,
        })
        .collect();
    endpoints.push(EndpointConfig {
        endpoint: STATE_SENDER,
        style: DeliveryStyle::Checkpoint,
        base_gas: 20_000,
        gas_per_byte: 0,
    });

    let root_history = RootHistoryConfig {
        genesis_root: Root::from(GENESIS_ROOT),
        genesis_timestamp: GENESIS_TIME,
        expiry_window: ROOT_HISTORY_EXPIRY,
    };
    let mut mirrors: Vec<MirrorDeployment> = direct
        .iter()
        .zip(0u8..)
        .map(|(id, index)| MirrorDeployment {
            destination: id.to_string(),
            genesis_time: GENESIS_TIME,
            mirror_address: mirror_address(index),
            inbox_address: INBOX,
            mirror: BridgedMirrorConfig {
                owner: STATE_BRIDGE,
                owner_is_local: false,
                source: MirrorSource::DirectMessenger {
                    messenger: receiver(index),
                },
                root_history: root_history.clone(),
            },
            inbox: InboxConfig {
                endpoints: vec![InboxEndpoint {
                    endpoint: messenger(index),
                    receiver: receiver(index),
                    style: DeliveryStyle::Direct,
                }],
                checkpoint_oracle: OPERATOR,
            },
        })
        .collect();
    mirrors.push(MirrorDeployment {
        destination: "polygon".to_string(),
        genesis_time: GENESIS_TIME,
        mirror_address: mirror_address(2),
        inbox_address: INBOX,
        mirror: BridgedMirrorConfig {
            owner: OWNER,
            owner_is_local: true,
            source: MirrorSource::CheckpointTunnel {
                state_receiver: STATE_RECEIVER,
                root_tunnel: Some(STATE_BRIDGE),
            },
            root_history,
        },
        inbox: InboxConfig {
            endpoints: vec![InboxEndpoint {
                endpoint: STATE_SENDER,
                receiver: STATE_RECEIVER,
                style: DeliveryStyle::Checkpoint,
            }],
            checkpoint_oracle: OPERATOR,
        },
    });

    BridgeDeployment {
        root_chain: RootChainDeployment {
            genesis_time: GENESIS_TIME,
            state_bridge_address: STATE_BRIDGE,
            outbox_address: OUTBOX,
            state_bridge: StateBridgeConfig {
                registry: REGISTRY,
                owner: OWNER,
                root_history_expiry: ROOT_HISTORY_EXPIRY,
                destinations,
            },
            outbox: OutboxConfig { endpoints },
        },
        mirrors,
    }
}

/// A destination chain.
pub struct DestinationChain {
    /// Coordinator destination id.
    pub id: String,
    /// The chain.
    pub chain: MockChain,
    /// Its inbox.
    pub inbox: Inbox<C>,
    /// Its mirror.
    pub mirror: BridgedMirror<C>,
    /// One relayer per accepted endpoint.
    pub relayers: Vec<Relayer>,
}

impl DestinationChain {
    /// The mirror's latest root.
    pub fn latest_root(&mut self) -> Option<Root> {
        let mirror = &self.mirror;
        self.chain.query(|working_set| mirror.latest_root(working_set))
    }

    /// Whether `root` is valid at the chain's current time.
    pub fn is_valid_root(&mut self, root: u64) -> bool {
        let mirror = &self.mirror;
        let now = self.chain.time();
        self.chain
            .query(|working_set| mirror.is_valid_root(&Root::from(root), now, working_set))
    }

    /// The mirror's expiry window.
    pub fn root_history_expiry(&mut self) -> u64 {
        let mirror = &self.mirror;
        self.chain
            .query(|working_set| mirror.root_history_expiry(working_set))
    }

    /// The mirror's owner and whether it is local.
    pub fn mirror_owner(&mut self) -> (Option<Address>, bool) {
        let mirror = &self.mirror;
        self.chain.query(|working_set| {
            (
                mirror.owner(working_set),
                mirror.owner_is_local(working_set),
            )
        })
    }
}

/// The root chain and every destination chain.
pub struct BridgeNetwork {
    /// The root chain.
    pub root: MockChain,
    /// The root chain outbox.
    pub outbox: Outbox<C>,
    /// The coordinator.
    pub bridge: StateBridge<C>,
    /// Destinations in deployment order.
    pub destinations: Vec<DestinationChain>,
}

impl BridgeNetwork {
    /// Runs the genesis of every chain in `deployment`.
    pub fn deploy(deployment: &BridgeDeployment) -> Result<Self> {
        deployment.validate()?;
        let root_chain = &deployment.root_chain;

        let mut root = MockChain::new("root", root_chain.genesis_time);
        let outbox = Outbox::new(root_chain.outbox_address);
        let bridge = StateBridge::new(root_chain.state_bridge_address, outbox.clone());
        root.genesis(&outbox, &root_chain.outbox)?;
        root.genesis(&bridge, &root_chain.state_bridge)?;

        let mut destinations = Vec::new();
        for mirror_deployment in &deployment.mirrors {
            let mut chain =
                MockChain::new(&mirror_deployment.destination, mirror_deployment.genesis_time);
            let inbox = Inbox::new(mirror_deployment.inbox_address);
            let mirror = BridgedMirror::new(mirror_deployment.mirror_address);
            chain.genesis(&inbox, &mirror_deployment.inbox)?;
            chain.genesis(&mirror, &mirror_deployment.mirror)?;

            let relayers = mirror_deployment
                .inbox
                .endpoints
                .iter()
                .map(|endpoint| {
                    Relayer::new(
                        endpoint.endpoint,
                        endpoint.style,
                        mirror_deployment.inbox.checkpoint_oracle,
                    )
                })
                .collect();

            destinations.push(DestinationChain {
                id: mirror_deployment.destination.clone(),
                chain,
                inbox,
                mirror,
                relayers,
            });
        }

        info!(destinations = destinations.len(), "Bridge network deployed");
        Ok(Self {
            root,
            outbox,
            bridge,
            destinations,
        })
    }

    /// Deploys [`standard_deployment`].
    pub fn standard() -> Self {
        Self::deploy(&standard_deployment()).expect("Standard deployment is valid")
    }

    /// Sends a coordinator call on the root chain.
    pub fn call_bridge(&mut self, message: CallMessage, sender: Address) -> TransactionReceipt {
        self.root.call(&self.bridge, message, sender)
    }

    /// `PropagateRoot(root)` signed by the registry.
    pub fn propagate_root(&mut self, root: u64) -> TransactionReceipt {
        self.call_bridge(
            CallMessage::PropagateRoot {
                root: Root::from(root),
            },
            REGISTRY,
        )
    }

    /// Binds the child tunnel of `destination` to its mirror.
    pub fn bind_child_tunnel(&mut self, destination: &str) -> TransactionReceipt {
        let tunnel = *self.destination(destination).mirror.address();
        self.call_bridge(
            CallMessage::BindChildTunnel {
                destination: destination.to_string(),
                tunnel,
            },
            OWNER,
        )
    }

    /// Moves every clock forward.
    pub fn advance_time(&mut self, seconds: u64) {
        self.root.advance_time(seconds);
        for destination in &mut self.destinations {
            destination.chain.advance_time(seconds);
        }
    }

    /// The destination with `id`.
    ///
    /// # Panics
    /// If there is no such destination.
    pub fn destination(&mut self, id: &str) -> &mut DestinationChain {
        self.destinations
            .iter_mut()
            .find(|destination| destination.id == id)
            .unwrap_or_else(|| panic!("No destination {id}"))
    }

    /// Latest root of every mirror, in deployment order.
    pub fn latest_roots(&mut self) -> Vec<Option<Root>> {
        self.destinations
            .iter_mut()
            .map(DestinationChain::latest_root)
            .collect()
    }

    /// The coordinator's last propagated root.
    pub fn last_propagated(&mut self) -> Option<RootRecord> {
        let bridge = &self.bridge;
        self.root
            .query(|working_set| bridge.last_propagated(working_set))
    }

    /// Commits pending checkpoints and relays everything ready to every destination.
    /// Reverted deliveries are reported in the outcomes, not as an error.
    pub fn relay_all(&mut self) -> Result<Vec<RelayOutcome>> {
        let mut outcomes = Vec::new();
        for destination in &mut self.destinations {
            for relayer in &mut destination.relayers {
                relayer.propose_checkpoint(&mut self.root, &self.outbox)?;
                outcomes.extend(relayer.relay_pending(
                    &mut self.root,
                    &self.outbox,
                    &mut destination.chain,
                    &destination.inbox,
                    &destination.mirror,
                )?);
            }
        }
        Ok(outcomes)
    }
}
