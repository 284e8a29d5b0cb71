use bridge_modules_api::{decode_events, Root};
use integration_tests::*;
use bridge_messenger::OutboxError;
use state_bridge::{CallMessage, GasOperation, StateBridgeError, StateBridgeEvent};

fn deploy_with_bound_tunnel() -> BridgeNetwork {
    init_logging();
    let mut network = BridgeNetwork::standard();
    assert!(network.bind_child_tunnel("polygon").is_successful());
    network
}

#[test]
fn test_genesis_root_is_valid_everywhere() {
    let mut network = deploy_with_bound_tunnel();

    assert_eq!(
        network.latest_roots(),
        vec![Some(Root::from(GENESIS_ROOT)); 3]
    );
    network.advance_time(10 * ROOT_HISTORY_EXPIRY);
    for destination in &mut network.destinations {
        assert!(destination.is_valid_root(GENESIS_ROOT));
    }
}

#[test]
fn test_propagated_root_reaches_every_mirror() {
    let mut network = deploy_with_bound_tunnel();
    network.advance_time(10);
    let propagated_at = GENESIS_TIME + 10;

    let receipt = network.propagate_root(0x222);
    assert!(receipt.is_successful());
    let events: Vec<StateBridgeEvent> = decode_events(&receipt.events, "RootPropagated");
    assert_eq!(
        events,
        vec![StateBridgeEvent::RootPropagated {
            root: Root::from(0x222),
            timestamp: propagated_at,
        }]
    );

    // Nothing changes on the mirrors until the envelopes are relayed.
    assert_eq!(
        network.latest_roots(),
        vec![Some(Root::from(GENESIS_ROOT)); 3]
    );

    let outcomes = network.relay_all().unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|outcome| outcome.receipt.is_successful()));
    assert_eq!(network.latest_roots(), vec![Some(Root::from(0x222)); 3]);

    let last = network.last_propagated().unwrap();
    assert_eq!(last.root, Root::from(0x222));
    assert_eq!(last.seen_at, propagated_at);

    // The genesis root is superseded and expires one window after it was first seen.
    let elapsed = GENESIS_TIME + ROOT_HISTORY_EXPIRY - network.root.time();
    network.advance_time(elapsed);
    for destination in &mut network.destinations {
        assert!(destination.is_valid_root(GENESIS_ROOT));
        assert!(destination.is_valid_root(0x222));
    }

    network.advance_time(1);
    for destination in &mut network.destinations {
        assert!(!destination.is_valid_root(GENESIS_ROOT));
        assert!(destination.is_valid_root(0x222));
    }
}

#[test]
fn test_fan_out_is_all_or_nothing() {
    init_logging();
    let mut deployment = standard_deployment();
    for mirror in &mut deployment.mirrors {
        mirror.mirror.root_history.genesis_root = Root::from(0);
    }
    let mut network = BridgeNetwork::deploy(&deployment).unwrap();
    assert!(network.bind_child_tunnel("polygon").is_successful());

    let receipt = network.call_bridge(
        CallMessage::SetGasLimit {
            destination: "base".to_string(),
            operation: GasOperation::SendRoot,
            limit: 0,
        },
        OWNER,
    );
    assert!(receipt.is_successful());

    let receipt = network.propagate_root(0x111);
    assert!(matches!(
        receipt.downcast_error::<StateBridgeError>(),
        Some(StateBridgeError::TransportRejected {
            source: OutboxError::InsufficientGas { .. },
            ..
        })
    ));
    assert!(receipt.events.is_empty());
    assert!(network.relay_all().unwrap().is_empty());
    assert_eq!(network.latest_roots(), vec![Some(Root::from(0)); 3]);
    assert_eq!(network.last_propagated(), None);

    let receipt = network.call_bridge(
        CallMessage::SetGasLimit {
            destination: "base".to_string(),
            operation: GasOperation::SendRoot,
            limit: 100_000,
        },
        OWNER,
    );
    assert!(receipt.is_successful());

    assert!(network.propagate_root(0x111).is_successful());
    network.relay_all().unwrap();
    assert_eq!(network.latest_roots(), vec![Some(Root::from(0x111)); 3]);
}

#[test]
fn test_redelivered_root_keeps_first_seen_time() {
    let mut network = deploy_with_bound_tunnel();
    let first_seen = network.root.time();

    assert!(network.propagate_root(0x222).is_successful());
    network.advance_time(100);
    assert!(network.propagate_root(0x333).is_successful());
    network.advance_time(100);
    assert!(network.propagate_root(0x222).is_successful());
    let outcomes = network.relay_all().unwrap();
    assert!(outcomes.iter().all(|outcome| outcome.receipt.is_successful()));

    for destination in &mut network.destinations {
        assert_eq!(destination.latest_root(), Some(Root::from(0x222)));
        let mirror = &destination.mirror;
        let seen_at = destination
            .chain
            .query(|working_set| mirror.root_timestamp(&Root::from(0x222), working_set));
        assert_eq!(seen_at, Some(first_seen));
    }
}

#[test]
fn test_expiry_update_reaches_every_mirror() {
    let mut network = deploy_with_bound_tunnel();

    let receipt = network.call_bridge(
        CallMessage::SetRootHistoryExpiry { expiry: 60 },
        OWNER,
    );
    assert!(receipt.is_successful());
    network.relay_all().unwrap();

    for destination in &mut network.destinations {
        assert_eq!(destination.root_history_expiry(), 60);
    }

    assert!(network.propagate_root(0x222).is_successful());
    network.relay_all().unwrap();
    network.advance_time(61);
    for destination in &mut network.destinations {
        assert!(!destination.is_valid_root(GENESIS_ROOT));
    }
}
