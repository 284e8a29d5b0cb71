use anyhow::anyhow;
use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::{
    decode_events, Address, CallResponse, Context, DefaultContext, Module, ModuleError,
    ModuleEvent, ModuleInfo, Prefix, StateValue, WorkingSet,
};

use crate::merkle::MerkleProof;
use crate::{
    CheckpointProof, DeliveryStyle, EndpointConfig, Inbox, InboxConfig, InboxEndpoint,
    MockChain, Outbox, OutboxCallMessage, OutboxConfig, OutboxError, OutboxEvent, RelayError,
    Relayer,
};

const MESSENGER: Address = Address::new([1; 32]);
const STATE_SENDER: Address = Address::new([2; 32]);
const RECEIVER: Address = Address::new([3; 32]);
const SUBMITTER: Address = Address::new([4; 32]);
const RECORDER: Address = Address::new([5; 32]);
const OPERATOR: Address = Address::new([6; 32]);

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
enum RecorderMessage {
    Record(u64),
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
struct Recorded {
    value: u64,
    sender: Address,
    cross_domain_sender: Option<Address>,
}

impl ModuleEvent for Recorded {
    fn key(&self) -> &'static str {
        "Recorded"
    }
}

/// Stores the last value it received together with who delivered it.
struct Recorder {
    last: StateValue<Recorded>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            last: StateValue::new(Prefix::new_storage("Recorder", "last")),
        }
    }
}

impl ModuleInfo for Recorder {
    fn address(&self) -> &Address {
        &RECORDER
    }

    fn name(&self) -> &'static str {
        "Recorder"
    }
}

impl Module for Recorder {
    type Context = DefaultContext;
    type Config = ();
    type CallMessage = RecorderMessage;
    type Event = Recorded;

    fn call(
        &self,
        message: Self::CallMessage,
        context: &Self::Context,
        working_set: &mut WorkingSet<bridge_modules_api::MemoryStorage>,
    ) -> Result<CallResponse, ModuleError> {
        match message {
            RecorderMessage::Record(value) => {
                let recorded = Recorded {
                    value,
                    sender: *context.sender(),
                    cross_domain_sender: context.cross_domain_sender().copied(),
                };
                self.last.set(&recorded, working_set);
                recorded.emit(working_set);
                Ok(CallResponse::default())
            }
            RecorderMessage::Fail => Err(anyhow!("Recorder refused the message").into()),
        }
    }
}

struct TestNetwork {
    root: MockChain,
    outbox: Outbox<DefaultContext>,
    destination: MockChain,
    inbox: Inbox<DefaultContext>,
    recorder: Recorder,
}

fn setup() -> TestNetwork {
    let mut root = MockChain::new("root", 1_000);
    let outbox = Outbox::new(Address::new([10; 32]));
    root.genesis(
        &outbox,
        &OutboxConfig {
            endpoints: vec![
                EndpointConfig {
                    endpoint: MESSENGER,
                    style: DeliveryStyle::Direct,
                    base_gas: 1_000,
                    gas_per_byte: 10,
                },
                EndpointConfig {
                    endpoint: STATE_SENDER,
                    style: DeliveryStyle::Checkpoint,
                    base_gas: 0,
                    gas_per_byte: 0,
                },
            ],
        },
    )
    .unwrap();

    let mut destination = MockChain::new("destination", 5_000);
    let inbox = Inbox::new(Address::new([11; 32]));
    destination
        .genesis(
            &inbox,
            &InboxConfig {
                endpoints: vec![
                    InboxEndpoint {
                        endpoint: MESSENGER,
                        receiver: RECEIVER,
                        style: DeliveryStyle::Direct,
                    },
                    InboxEndpoint {
                        endpoint: STATE_SENDER,
                        receiver: RECEIVER,
                        style: DeliveryStyle::Checkpoint,
                    },
                ],
                checkpoint_oracle: OPERATOR,
            },
        )
        .unwrap();

    TestNetwork {
        root,
        outbox,
        destination,
        inbox,
        recorder: Recorder::new(),
    }
}

fn submit(
    network: &mut TestNetwork,
    endpoint: Address,
    message: &RecorderMessage,
    gas_limit: u64,
) -> Result<u64, OutboxError> {
    let payload = message.try_to_vec().unwrap();
    let outbox = &network.outbox;
    let mut result = None;
    network.root.apply(|working_set, _| {
        let submitted = outbox.submit(endpoint, SUBMITTER, RECORDER, payload, gas_limit, working_set);
        let failed = submitted.is_err();
        result = Some(submitted.clone());
        if failed {
            return Err(anyhow!("submission rejected").into());
        }
        Ok(())
    });
    result.unwrap()
}

fn last_recorded(network: &mut TestNetwork) -> Option<Recorded> {
    let recorder = &network.recorder;
    network.destination.query(|working_set| recorder.last.get(working_set))
}

#[test]
fn test_submit_assigns_sequential_nonces() {
    let mut network = setup();
    let message = RecorderMessage::Record(7);

    assert_eq!(submit(&mut network, MESSENGER, &message, 100_000), Ok(0));
    assert_eq!(submit(&mut network, MESSENGER, &message, 100_000), Ok(1));

    let outbox = &network.outbox;
    let envelopes = network
        .root
        .query(|working_set| outbox.envelopes_from(&MESSENGER, 0, working_set));
    assert_eq!(envelopes.len(), 2);
    assert_eq!(envelopes[1].nonce, 1);
    assert_eq!(envelopes[1].sender, SUBMITTER);
}

#[test]
fn test_submit_rejects_insufficient_gas() {
    let mut network = setup();
    let message = RecorderMessage::Record(7);
    let payload_len = message.try_to_vec().unwrap().len() as u64;
    let required = 1_000 + 10 * payload_len;

    assert_eq!(
        submit(&mut network, MESSENGER, &message, required - 1),
        Err(OutboxError::InsufficientGas {
            endpoint: MESSENGER,
            required,
            provided: required - 1,
        })
    );
    assert!(submit(&mut network, MESSENGER, &message, 0).is_err());
    assert_eq!(submit(&mut network, MESSENGER, &message, required), Ok(0));
}

#[test]
fn test_submit_rejects_unknown_endpoint() {
    let mut network = setup();
    let unknown = Address::new([99; 32]);

    assert_eq!(
        submit(&mut network, unknown, &RecorderMessage::Record(1), 100_000),
        Err(OutboxError::UnknownEndpoint(unknown))
    );
}

#[test]
fn test_direct_relay_sets_receiver_and_cross_domain_sender() {
    let mut network = setup();
    submit(&mut network, MESSENGER, &RecorderMessage::Record(42), 100_000).unwrap();

    let mut relayer = Relayer::new(MESSENGER, DeliveryStyle::Direct, OPERATOR);
    let outcomes = relayer
        .relay_pending(
            &mut network.root,
            &network.outbox,
            &mut network.destination,
            &network.inbox,
            &network.recorder,
        )
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].receipt.is_successful());
    let recorded: Vec<Recorded> = decode_events(&outcomes[0].receipt.events, "Recorded");
    assert_eq!(recorded.len(), 1);
    assert_eq!(
        last_recorded(&mut network),
        Some(Recorded {
            value: 42,
            sender: RECEIVER,
            cross_domain_sender: Some(SUBMITTER),
        })
    );

    // Nothing new to relay.
    let outcomes = relayer
        .relay_pending(
            &mut network.root,
            &network.outbox,
            &mut network.destination,
            &network.inbox,
            &network.recorder,
        )
        .unwrap();
    assert!(outcomes.is_empty());
}

#[test]
fn test_replayed_envelope_is_refused() {
    let mut network = setup();
    submit(&mut network, MESSENGER, &RecorderMessage::Record(1), 100_000).unwrap();

    let outbox = &network.outbox;
    let envelope = network
        .root
        .query(|working_set| outbox.envelope(&MESSENGER, 0, working_set))
        .unwrap();

    let inbox = &network.inbox;
    let recorder = &network.recorder;
    let first = network.destination.apply(|working_set, now| {
        inbox.relay(recorder, &envelope, None, now, working_set).map(|_| ())
    });
    assert!(first.is_successful());

    let second = network.destination.apply(|working_set, now| {
        inbox.relay(recorder, &envelope, None, now, working_set).map(|_| ())
    });
    assert_eq!(
        second.downcast_error::<RelayError>(),
        Some(&RelayError::AlreadyRelayed {
            endpoint: MESSENGER,
            nonce: 0
        })
    );
}

#[test]
fn test_failed_delivery_can_be_retried() {
    let mut network = setup();
    submit(&mut network, MESSENGER, &RecorderMessage::Fail, 100_000).unwrap();

    let mut relayer = Relayer::new(MESSENGER, DeliveryStyle::Direct, OPERATOR);
    let outcomes = relayer
        .relay_pending(
            &mut network.root,
            &network.outbox,
            &mut network.destination,
            &network.inbox,
            &network.recorder,
        )
        .unwrap();

    assert!(!outcomes[0].receipt.is_successful());
    assert!(outcomes[0].receipt.events.is_empty());

    let outbox = &network.outbox;
    let envelope = network
        .root
        .query(|working_set| outbox.envelope(&MESSENGER, 0, working_set))
        .unwrap();
    let inbox = &network.inbox;
    assert!(!network
        .destination
        .query(|working_set| inbox.is_relayed(&envelope, working_set)));
}

#[test]
fn test_checkpoint_relay_requires_committed_checkpoint() {
    let mut network = setup();
    submit(&mut network, STATE_SENDER, &RecorderMessage::Record(1), 0).unwrap();
    submit(&mut network, STATE_SENDER, &RecorderMessage::Record(2), 0).unwrap();
    submit(&mut network, STATE_SENDER, &RecorderMessage::Record(3), 0).unwrap();

    let mut relayer = Relayer::new(STATE_SENDER, DeliveryStyle::Checkpoint, OPERATOR);
    let outcomes = relayer
        .relay_pending(
            &mut network.root,
            &network.outbox,
            &mut network.destination,
            &network.inbox,
            &network.recorder,
        )
        .unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(last_recorded(&mut network), None);

    assert!(relayer
        .propose_checkpoint(&mut network.root, &network.outbox)
        .unwrap());
    assert!(!relayer
        .propose_checkpoint(&mut network.root, &network.outbox)
        .unwrap());

    let outcomes = relayer
        .relay_pending(
            &mut network.root,
            &network.outbox,
            &mut network.destination,
            &network.inbox,
            &network.recorder,
        )
        .unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|outcome| outcome.receipt.is_successful()));
    assert_eq!(last_recorded(&mut network).map(|r| r.value), Some(3));
}

#[test]
fn test_checkpoint_envelope_without_valid_proof_is_refused() {
    let mut network = setup();
    submit(&mut network, STATE_SENDER, &RecorderMessage::Record(1), 0).unwrap();
    submit(&mut network, STATE_SENDER, &RecorderMessage::Record(2), 0).unwrap();

    let receipt = network.root.call(
        &network.outbox,
        OutboxCallMessage::CommitCheckpoint {
            endpoint: STATE_SENDER,
        },
        OPERATOR,
    );
    let committed: Vec<OutboxEvent> = decode_events(&receipt.events, "CheckpointCommitted");
    let root = match &committed[..] {
        [OutboxEvent::CheckpointCommitted { root, .. }] => *root,
        other => panic!("Unexpected events: {other:?}"),
    };

    let inbox = &network.inbox;
    let recorder = &network.recorder;
    let outbox = &network.outbox;
    let envelope = network
        .root
        .query(|working_set| outbox.envelope(&STATE_SENDER, 0, working_set))
        .unwrap();

    let missing = network.destination.apply(|working_set, now| {
        inbox.relay(recorder, &envelope, None, now, working_set).map(|_| ())
    });
    assert_eq!(
        missing.downcast_error::<RelayError>(),
        Some(&RelayError::MissingProof {
            endpoint: STATE_SENDER,
            nonce: 0
        })
    );

    let proof = CheckpointProof {
        checkpoint_id: 0,
        proof: MerkleProof {
            index: 1,
            siblings: vec![[0; 32]],
        },
    };
    let unsynced = network.destination.apply(|working_set, now| {
        inbox.relay(recorder, &envelope, Some(&proof), now, working_set).map(|_| ())
    });
    assert_eq!(
        unsynced.downcast_error::<RelayError>(),
        Some(&RelayError::UnknownCheckpoint {
            endpoint: STATE_SENDER,
            checkpoint_id: 0
        })
    );

    let sync = network.destination.call(
        inbox,
        crate::InboxCallMessage::SyncCheckpoint {
            endpoint: STATE_SENDER,
            checkpoint_id: 0,
            root,
        },
        OPERATOR,
    );
    assert!(sync.is_successful());

    let forged = network.destination.apply(|working_set, now| {
        inbox.relay(recorder, &envelope, Some(&proof), now, working_set).map(|_| ())
    });
    assert_eq!(
        forged.downcast_error::<RelayError>(),
        Some(&RelayError::InvalidProof {
            endpoint: STATE_SENDER,
            nonce: 0
        })
    );
}

#[test]
fn test_only_oracle_syncs_checkpoints() {
    let mut network = setup();
    let receipt = network.destination.call(
        &network.inbox,
        crate::InboxCallMessage::SyncCheckpoint {
            endpoint: STATE_SENDER,
            checkpoint_id: 0,
            root: [7; 32],
        },
        SUBMITTER,
    );

    assert_eq!(
        receipt.downcast_error::<RelayError>(),
        Some(&RelayError::Unauthorized(SUBMITTER))
    );
}

#[test]
fn test_direct_endpoint_does_not_checkpoint() {
    let mut network = setup();
    submit(&mut network, MESSENGER, &RecorderMessage::Record(1), 100_000).unwrap();

    let receipt = network.root.call(
        &network.outbox,
        OutboxCallMessage::CommitCheckpoint {
            endpoint: MESSENGER,
        },
        OPERATOR,
    );
    assert_eq!(
        receipt.downcast_error::<OutboxError>(),
        Some(&OutboxError::NotCheckpointed(MESSENGER))
    );
}
