use bridge_modules_api::{Address, DefaultContext};
use bridge_messenger::{DeliveryStyle, EndpointConfig, MockChain, Outbox, OutboxConfig};
use state_bridge::{DestinationConfig, GasLimits, StateBridge, StateBridgeConfig, TransportKind};

pub type C = DefaultContext;

pub const GENESIS_TIME: u64 = 1_700_000_000;
pub const BRIDGE: Address = Address::new([1; 32]);
pub const OUTBOX: Address = Address::new([2; 32]);
pub const REGISTRY: Address = Address::new([3; 32]);
pub const OWNER: Address = Address::new([4; 32]);
#[allow(dead_code)]
pub const STRANGER: Address = Address::new([5; 32]);

pub const DESTINATIONS: [&str; 3] = ["optimism", "base", "polygon"];

pub fn messenger(index: u8) -> Address {
    Address::new([0x10 + index; 32])
}

pub fn mirror(index: u8) -> Address {
    Address::new([0x20 + index; 32])
}

pub struct RootChain {
    pub chain: MockChain,
    pub outbox: Outbox<C>,
    pub bridge: StateBridge<C>,
}

pub fn destination_configs() -> Vec<DestinationConfig> {
    DESTINATIONS
        .iter()
        .zip(0u8..)
        .map(|(id, index)| DestinationConfig {
            id: id.to_string(),
            transport: TransportKind::DirectMessenger {
                messenger: messenger(index),
                mirror: mirror(index),
            },
            gas_limits: GasLimits::default(),
        })
        .collect()
}

pub fn create_root_chain() -> RootChain {
    let mut chain = MockChain::new("root", GENESIS_TIME);
    let outbox = Outbox::new(OUTBOX);
    let bridge = StateBridge::new(BRIDGE, outbox.clone());

    let endpoints = (0u8..3)
        .map(|index| EndpointConfig {
            endpoint: messenger(index),
            style: DeliveryStyle::Direct,
            base_gas: 40_000,
            gas_per_byte: 16,
        })
        .collect();
    chain
        .genesis(&outbox, &OutboxConfig { endpoints })
        .unwrap();
    chain
        .genesis(
            &bridge,
            &StateBridgeConfig {
                registry: REGISTRY,
                owner: OWNER,
                root_history_expiry: 3_600,
                destinations: destination_configs(),
            },
        )
        .unwrap();

    RootChain {
        chain,
        outbox,
        bridge,
    }
}
