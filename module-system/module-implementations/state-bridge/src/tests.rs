use bridge_modules_api::{
    decode_events, Address, CallResponse, Context, DefaultContext, MemoryStorage, Module,
    ModuleError, Root, WorkingSet,
};
use bridge_messenger::{DeliveryStyle, EndpointConfig, Outbox, OutboxConfig};

use crate::{
    CallMessage, DestinationConfig, ErrorKind, GasLimits, GasOperation, StateBridge,
    StateBridgeConfig, StateBridgeError, StateBridgeEvent, TransportKind, DEFAULT_GAS_LIMIT,
};

const BRIDGE: Address = Address::new([1; 32]);
const OUTBOX: Address = Address::new([2; 32]);
const REGISTRY: Address = Address::new([3; 32]);
const OWNER: Address = Address::new([4; 32]);
const NEW_OWNER: Address = Address::new([5; 32]);
const STRANGER: Address = Address::new([6; 32]);
const MESSENGER: Address = Address::new([7; 32]);
const STATE_SENDER: Address = Address::new([8; 32]);
const MIRROR: Address = Address::new([9; 32]);
const TUNNEL: Address = Address::new([10; 32]);
const NOW: u64 = 1_700_000_000;

type C = DefaultContext;

fn destinations() -> Vec<DestinationConfig> {
    vec![
        DestinationConfig {
            id: "optimism".to_string(),
            transport: TransportKind::DirectMessenger {
                messenger: MESSENGER,
                mirror: MIRROR,
            },
            gas_limits: GasLimits::default(),
        },
        DestinationConfig {
            id: "polygon".to_string(),
            transport: TransportKind::CheckpointTunnel {
                state_sender: STATE_SENDER,
                child_tunnel: None,
            },
            gas_limits: GasLimits::default(),
        },
    ]
}

fn setup_with(
    destinations: Vec<DestinationConfig>,
) -> (StateBridge<C>, WorkingSet<MemoryStorage>) {
    let outbox = Outbox::<C>::new(OUTBOX);
    let bridge = StateBridge::new(BRIDGE, outbox.clone());
    let mut working_set = WorkingSet::new(MemoryStorage::default());

    outbox
        .genesis(
            &OutboxConfig {
                endpoints: vec![
                    EndpointConfig {
                        endpoint: MESSENGER,
                        style: DeliveryStyle::Direct,
                        base_gas: 50_000,
                        gas_per_byte: 16,
                    },
                    EndpointConfig {
                        endpoint: STATE_SENDER,
                        style: DeliveryStyle::Checkpoint,
                        base_gas: 0,
                        gas_per_byte: 0,
                    },
                ],
            },
            &mut working_set,
        )
        .unwrap();
    bridge
        .genesis(
            &StateBridgeConfig {
                registry: REGISTRY,
                owner: OWNER,
                root_history_expiry: 3_600,
                destinations,
            },
            &mut working_set,
        )
        .unwrap();

    (bridge, working_set)
}

fn setup() -> (StateBridge<C>, WorkingSet<MemoryStorage>) {
    setup_with(destinations())
}

fn as_sender(sender: Address) -> C {
    C::new(sender, NOW)
}

fn bridge_error(result: Result<CallResponse, ModuleError>) -> StateBridgeError {
    let err = result.unwrap_err();
    err.downcast_ref::<StateBridgeError>()
        .cloned()
        .unwrap_or_else(|| panic!("Unexpected error: {err}"))
}

fn bind_tunnel(bridge: &StateBridge<C>, working_set: &mut WorkingSet<MemoryStorage>) {
    bridge
        .call(
            CallMessage::BindChildTunnel {
                destination: "polygon".to_string(),
                tunnel: TUNNEL,
            },
            &as_sender(OWNER),
            working_set,
        )
        .unwrap();
}

#[test]
fn test_genesis() {
    let (bridge, mut working_set) = setup();

    assert_eq!(bridge.owner(&mut working_set), Some(OWNER));
    assert_eq!(bridge.registry(&mut working_set), Some(REGISTRY));
    assert_eq!(bridge.pending_owner(&mut working_set), None);
    assert_eq!(bridge.root_history_expiry(&mut working_set), Some(3_600));
    assert_eq!(bridge.destinations(&mut working_set), destinations());
    assert_eq!(
        bridge.gas_limit(&"optimism".to_string(), GasOperation::SendRoot, &mut working_set),
        Some(DEFAULT_GAS_LIMIT)
    );
    assert_eq!(bridge.last_propagated(&mut working_set), None);
}

#[test]
fn test_genesis_rejects_duplicate_destinations() {
    let outbox = Outbox::<C>::new(OUTBOX);
    let bridge = StateBridge::new(BRIDGE, outbox);
    let mut working_set = WorkingSet::new(MemoryStorage::default());
    let mut duplicated = destinations();
    duplicated.push(duplicated[0].clone());

    let err = bridge
        .genesis(
            &StateBridgeConfig {
                registry: REGISTRY,
                owner: OWNER,
                root_history_expiry: 3_600,
                destinations: duplicated,
            },
            &mut working_set,
        )
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StateBridgeError>(),
        Some(StateBridgeError::InvalidConfig(_))
    ));
}

#[test]
fn test_genesis_rejects_zero_child_tunnel() {
    let outbox = Outbox::<C>::new(OUTBOX);
    let bridge = StateBridge::new(BRIDGE, outbox);
    let mut working_set = WorkingSet::new(MemoryStorage::default());
    let mut destinations = destinations();
    destinations[1].transport = TransportKind::CheckpointTunnel {
        state_sender: STATE_SENDER,
        child_tunnel: Some(Address::ZERO),
    };

    let err = bridge
        .genesis(
            &StateBridgeConfig {
                registry: REGISTRY,
                owner: OWNER,
                root_history_expiry: 3_600,
                destinations,
            },
            &mut working_set,
        )
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<StateBridgeError>(),
        Some(&StateBridgeError::ZeroTunnel("polygon".to_string()))
    );
}

#[test]
fn test_config_from_json() {
    let config = serde_json::json!({
        "registry": REGISTRY.to_string(),
        "owner": OWNER.to_string(),
        "destinations": [
            {
                "id": "optimism",
                "transport": {
                    "style": "direct_messenger",
                    "messenger": MESSENGER.to_string(),
                    "mirror": MIRROR.to_string(),
                },
            },
            {
                "id": "polygon",
                "transport": {
                    "style": "checkpoint_tunnel",
                    "state_sender": STATE_SENDER.to_string(),
                },
            },
        ],
    });

    let config: StateBridgeConfig = serde_json::from_value(config).unwrap();
    assert_eq!(config.registry, REGISTRY);
    assert_eq!(config.owner, OWNER);
    assert_eq!(
        config.root_history_expiry,
        bridged_mirror::DEFAULT_ROOT_HISTORY_EXPIRY
    );
    assert_eq!(config.destinations, destinations());
}

#[test]
fn test_propagate_root_submits_to_every_destination() {
    let (bridge, mut working_set) = setup();
    bind_tunnel(&bridge, &mut working_set);
    let root = Root::from(0x222);

    bridge
        .call(
            CallMessage::PropagateRoot { root },
            &as_sender(REGISTRY),
            &mut working_set,
        )
        .unwrap();

    let direct = bridge.outbox.envelope(&MESSENGER, 0, &mut working_set).unwrap();
    assert_eq!(direct.sender, BRIDGE);
    assert_eq!(direct.target, MIRROR);
    assert_eq!(direct.gas_limit, DEFAULT_GAS_LIMIT);
    let tunnel = bridge
        .outbox
        .envelope(&STATE_SENDER, 0, &mut working_set)
        .unwrap();
    assert_eq!(tunnel.target, TUNNEL);
    assert_eq!(direct.payload, tunnel.payload);

    let propagated: Vec<StateBridgeEvent> =
        decode_events(working_set.events(), "RootPropagated");
    assert_eq!(
        propagated,
        vec![StateBridgeEvent::RootPropagated {
            root,
            timestamp: NOW
        }]
    );
    assert_eq!(
        bridge.last_propagated(&mut working_set).map(|r| r.root),
        Some(root)
    );
}

#[test]
fn test_propagate_root_only_from_registry() {
    let (bridge, mut working_set) = setup();
    bind_tunnel(&bridge, &mut working_set);

    for sender in [OWNER, STRANGER] {
        let err = bridge_error(bridge.call(
            CallMessage::PropagateRoot {
                root: Root::from(0x222),
            },
            &as_sender(sender),
            &mut working_set,
        ));
        assert_eq!(err, StateBridgeError::NotRegistry(sender));
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }
    assert_eq!(bridge.outbox.next_nonce(&MESSENGER, &mut working_set), 0);
}

#[test]
fn test_propagate_root_on_unbound_tunnel_fails() {
    let (bridge, mut working_set) = setup();

    let err = bridge_error(bridge.call(
        CallMessage::PropagateRoot {
            root: Root::from(0x222),
        },
        &as_sender(REGISTRY),
        &mut working_set,
    ));
    assert_eq!(err, StateBridgeError::ChildTunnelUnbound("polygon".to_string()));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_zero_gas_limit_is_rejected_by_transport() {
    let (bridge, mut working_set) = setup();
    bridge
        .call(
            CallMessage::SetGasLimit {
                destination: "optimism".to_string(),
                operation: GasOperation::SendRoot,
                limit: 0,
            },
            &as_sender(OWNER),
            &mut working_set,
        )
        .unwrap();

    let err = bridge_error(bridge.call(
        CallMessage::PropagateRoot {
            root: Root::from(0x222),
        },
        &as_sender(REGISTRY),
        &mut working_set,
    ));
    assert_eq!(err.kind(), ErrorKind::TransportRejected);
    assert!(matches!(
        err,
        StateBridgeError::TransportRejected { ref destination, .. } if destination == "optimism"
    ));
}

#[test]
fn test_set_gas_limit_changes_one_field() {
    let (bridge, mut working_set) = setup();
    let optimism = "optimism".to_string();

    bridge
        .call(
            CallMessage::SetGasLimit {
                destination: optimism.clone(),
                operation: GasOperation::SetRootHistoryExpiry,
                limit: 250_000,
            },
            &as_sender(OWNER),
            &mut working_set,
        )
        .unwrap();

    let limits = bridge
        .destination(&optimism, &mut working_set)
        .unwrap()
        .gas_limits;
    assert_eq!(
        limits,
        GasLimits {
            send_root: DEFAULT_GAS_LIMIT,
            set_root_history_expiry: 250_000,
            transfer_ownership: DEFAULT_GAS_LIMIT,
        }
    );
    let events: Vec<StateBridgeEvent> = decode_events(working_set.events(), "GasLimitSet");
    assert_eq!(
        events,
        vec![StateBridgeEvent::GasLimitSet {
            destination: optimism,
            operation: GasOperation::SetRootHistoryExpiry,
            limit: 250_000,
        }]
    );
}

#[test]
fn test_set_gas_limit_validates_caller_and_destination() {
    let (bridge, mut working_set) = setup();
    let message = |destination: &str| CallMessage::SetGasLimit {
        destination: destination.to_string(),
        operation: GasOperation::SendRoot,
        limit: 1,
    };

    assert_eq!(
        bridge_error(bridge.call(message("optimism"), &as_sender(STRANGER), &mut working_set)),
        StateBridgeError::NotOwner(STRANGER)
    );
    assert_eq!(
        bridge_error(bridge.call(message("arbitrum"), &as_sender(OWNER), &mut working_set)),
        StateBridgeError::UnknownDestination("arbitrum".to_string())
    );
}

#[test]
fn test_set_root_history_expiry_fans_out() {
    let (bridge, mut working_set) = setup();
    bind_tunnel(&bridge, &mut working_set);

    bridge
        .call(
            CallMessage::SetRootHistoryExpiry { expiry: 7_200 },
            &as_sender(OWNER),
            &mut working_set,
        )
        .unwrap();

    assert_eq!(bridge.root_history_expiry(&mut working_set), Some(7_200));
    assert_eq!(bridge.outbox.next_nonce(&MESSENGER, &mut working_set), 1);
    assert_eq!(bridge.outbox.next_nonce(&STATE_SENDER, &mut working_set), 1);
    let events: Vec<StateBridgeEvent> =
        decode_events(working_set.events(), "RootHistoryExpirySet");
    assert_eq!(
        events,
        vec![StateBridgeEvent::RootHistoryExpirySet { expiry: 7_200 }]
    );
}

#[test]
fn test_transfer_remote_ownership_targets_one_destination() {
    let (bridge, mut working_set) = setup();

    bridge
        .call(
            CallMessage::TransferRemoteOwnership {
                destination: "optimism".to_string(),
                new_owner: NEW_OWNER,
                is_local: true,
            },
            &as_sender(OWNER),
            &mut working_set,
        )
        .unwrap();

    assert_eq!(bridge.outbox.next_nonce(&MESSENGER, &mut working_set), 1);
    assert_eq!(bridge.outbox.next_nonce(&STATE_SENDER, &mut working_set), 0);
    let events: Vec<StateBridgeEvent> =
        decode_events(working_set.events(), "RemoteOwnershipTransferred");
    assert_eq!(
        events,
        vec![StateBridgeEvent::RemoteOwnershipTransferred {
            destination: "optimism".to_string(),
            new_owner: NEW_OWNER,
            is_local: true,
        }]
    );
}

#[test]
fn test_two_step_ownership() {
    let (bridge, mut working_set) = setup();

    assert_eq!(
        bridge_error(bridge.call(
            CallMessage::TransferOwnership {
                new_owner: NEW_OWNER
            },
            &as_sender(STRANGER),
            &mut working_set,
        )),
        StateBridgeError::NotOwner(STRANGER)
    );

    bridge
        .call(
            CallMessage::TransferOwnership {
                new_owner: NEW_OWNER,
            },
            &as_sender(OWNER),
            &mut working_set,
        )
        .unwrap();
    assert_eq!(bridge.owner(&mut working_set), Some(OWNER));
    assert_eq!(bridge.pending_owner(&mut working_set), Some(NEW_OWNER));

    assert_eq!(
        bridge_error(bridge.call(
            CallMessage::AcceptOwnership,
            &as_sender(STRANGER),
            &mut working_set
        )),
        StateBridgeError::NotPendingOwner(STRANGER)
    );

    bridge
        .call(
            CallMessage::AcceptOwnership,
            &as_sender(NEW_OWNER),
            &mut working_set,
        )
        .unwrap();
    assert_eq!(bridge.owner(&mut working_set), Some(NEW_OWNER));
    assert_eq!(bridge.pending_owner(&mut working_set), None);

    let started: Vec<StateBridgeEvent> =
        decode_events(working_set.events(), "OwnershipTransferStarted");
    let transferred: Vec<StateBridgeEvent> =
        decode_events(working_set.events(), "OwnershipTransferred");
    assert_eq!(
        started,
        vec![StateBridgeEvent::OwnershipTransferStarted {
            previous_owner: OWNER,
            new_owner: NEW_OWNER,
        }]
    );
    assert_eq!(
        transferred,
        vec![StateBridgeEvent::OwnershipTransferred {
            previous_owner: OWNER,
            new_owner: NEW_OWNER,
        }]
    );
}

#[test]
fn test_transfer_ownership_to_zero_fails() {
    let (bridge, mut working_set) = setup();

    assert_eq!(
        bridge_error(bridge.call(
            CallMessage::TransferOwnership {
                new_owner: Address::ZERO
            },
            &as_sender(OWNER),
            &mut working_set,
        )),
        StateBridgeError::ZeroOwner
    );
}

#[test]
fn test_renounce_ownership_always_fails() {
    let (bridge, mut working_set) = setup();

    for sender in [OWNER, STRANGER] {
        let err = bridge_error(bridge.call(
            CallMessage::RenounceOwnership,
            &as_sender(sender),
            &mut working_set,
        ));
        assert_eq!(err, StateBridgeError::RenounceUnsupported);
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert_eq!(bridge.owner(&mut working_set), Some(OWNER));
    }
}

#[test]
fn test_child_tunnel_binds_once() {
    let (bridge, mut working_set) = setup();
    bind_tunnel(&bridge, &mut working_set);

    let err = bridge_error(bridge.call(
        CallMessage::BindChildTunnel {
            destination: "polygon".to_string(),
            tunnel: STRANGER,
        },
        &as_sender(OWNER),
        &mut working_set,
    ));
    assert_eq!(
        err,
        StateBridgeError::ChildTunnelAlreadyBound {
            destination: "polygon".to_string(),
            tunnel: TUNNEL,
        }
    );
    assert_eq!(
        bridge
            .destination(&"polygon".to_string(), &mut working_set)
            .unwrap()
            .transport,
        TransportKind::CheckpointTunnel {
            state_sender: STATE_SENDER,
            child_tunnel: Some(TUNNEL),
        }
    );
}

#[test]
fn test_child_tunnel_only_on_checkpoint_destinations() {
    let (bridge, mut working_set) = setup();

    assert_eq!(
        bridge_error(bridge.call(
            CallMessage::BindChildTunnel {
                destination: "optimism".to_string(),
                tunnel: TUNNEL,
            },
            &as_sender(OWNER),
            &mut working_set,
        )),
        StateBridgeError::NotCheckpointDestination("optimism".to_string())
    );
    assert_eq!(
        bridge_error(bridge.call(
            CallMessage::BindChildTunnel {
                destination: "polygon".to_string(),
                tunnel: TUNNEL,
            },
            &as_sender(STRANGER),
            &mut working_set,
        )),
        StateBridgeError::NotOwner(STRANGER)
    );
}

#[test]
fn test_zero_child_tunnel_is_rejected() {
    let (bridge, mut working_set) = setup();

    let err = bridge_error(bridge.call(
        CallMessage::BindChildTunnel {
            destination: "polygon".to_string(),
            tunnel: Address::ZERO,
        },
        &as_sender(OWNER),
        &mut working_set,
    ));
    assert_eq!(err, StateBridgeError::ZeroTunnel("polygon".to_string()));
    assert_eq!(err.kind(), ErrorKind::Configuration);

    // The one-time binding is still available.
    bind_tunnel(&bridge, &mut working_set);
    assert_eq!(
        bridge
            .destination(&"polygon".to_string(), &mut working_set)
            .unwrap()
            .transport,
        TransportKind::CheckpointTunnel {
            state_sender: STATE_SENDER,
            child_tunnel: Some(TUNNEL),
        }
    );
}
