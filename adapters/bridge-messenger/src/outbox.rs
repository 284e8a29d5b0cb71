use std::marker::PhantomData;

use anyhow::Result;
use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::gas::{GasMeter, GasUnit, TupleGasUnit};
use bridge_modules_api::{
    Address, CallResponse, Context, Module, ModuleError, ModuleEvent, ModuleInfo, Prefix,
    StateMap, Storage, WorkingSet,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::envelope::{DeliveryStyle, Envelope};
use crate::merkle::{merkle_root, Hash, MerkleProof};

const MODULE_NAME: &str = "Outbox";

/// A delivery endpoint registered at genesis, together with its gas policy.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct EndpointConfig {
    /// Identity modules submit to: a cross-domain messenger or a state sender.
    pub endpoint: Address,
    /// How envelopes reach the destination.
    pub style: DeliveryStyle,
    /// Gas every envelope costs regardless of its size.
    pub base_gas: u64,
    /// Gas per payload byte.
    pub gas_per_byte: u64,
}

impl EndpointConfig {
    fn price(&self) -> TupleGasUnit<2> {
        [1, self.gas_per_byte]
    }

    /// Minimum gas limit accepted for a payload of `payload_len` bytes.
    pub fn required_gas(&self, payload_len: usize) -> u64 {
        let cost: TupleGasUnit<2> = [self.base_gas, payload_len as u64];
        cost.value(&self.price())
    }
}

/// Genesis configuration of the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Every endpoint the chain offers.
    pub endpoints: Vec<EndpointConfig>,
}

/// A batch of envelopes `first_nonce..end_nonce` committed under one Merkle root.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Checkpoint {
    /// Sequence number of the checkpoint on its endpoint.
    pub id: u64,
    /// Merkle root over the envelope hashes.
    pub root: Hash,
    /// Nonce of the first envelope in the batch.
    pub first_nonce: u64,
    /// Nonce after the last envelope in the batch.
    pub end_nonce: u64,
}

/// Submission and checkpointing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutboxError {
    /// Nothing is registered under the endpoint.
    #[error("Endpoint {0} is not registered")]
    UnknownEndpoint(Address),
    /// The gas limit does not cover the endpoint's price for the payload.
    #[error("Gas limit {provided} is below the {required} required by endpoint {endpoint}")]
    InsufficientGas {
        /// The endpoint.
        endpoint: Address,
        /// What the payload costs.
        required: u64,
        /// What the sender attached.
        provided: u64,
    },
    /// The endpoint relays envelopes directly.
    #[error("Endpoint {0} does not commit checkpoints")]
    NotCheckpointed(Address),
    /// Every envelope on the endpoint is already in a checkpoint.
    #[error("No messages to checkpoint on endpoint {0}")]
    NothingToCheckpoint(Address),
    /// The genesis configuration lists the endpoint more than once.
    #[error("Endpoint {0} is registered twice")]
    DuplicateEndpoint(Address),
}

/// Calls accepted by the outbox.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum CallMessage {
    /// Commits every envelope not yet in a checkpoint into a new one.
    CommitCheckpoint {
        /// A checkpoint endpoint.
        endpoint: Address,
    },
}

/// Events emitted by the outbox.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum OutboxEvent {
    /// An envelope was accepted for delivery.
    MessageSubmitted {
        /// The endpoint.
        endpoint: Address,
        /// Nonce assigned to the envelope.
        nonce: u64,
        /// Submitting module.
        sender: Address,
        /// Destination module.
        target: Address,
        /// Attached gas.
        gas_limit: u64,
    },
    /// A checkpoint was committed.
    CheckpointCommitted {
        /// The endpoint.
        endpoint: Address,
        /// Sequence number of the checkpoint.
        checkpoint_id: u64,
        /// Merkle root over the batch.
        root: Hash,
        /// First nonce in the batch.
        first_nonce: u64,
        /// Nonce after the batch.
        end_nonce: u64,
    },
}

impl ModuleEvent for OutboxEvent {
    fn key(&self) -> &'static str {
        match self {
            OutboxEvent::MessageSubmitted { .. } => "MessageSubmitted",
            OutboxEvent::CheckpointCommitted { .. } => "CheckpointCommitted",
        }
    }
}

/// Root chain side of the delivery infrastructure.
#[derive(Debug, Clone)]
pub struct Outbox<C: Context> {
    address: Address,
    endpoints: StateMap<Address, EndpointConfig>,
    next_nonce: StateMap<Address, u64>,
    envelopes: StateMap<(Address, u64), Envelope>,
    checkpointed_until: StateMap<Address, u64>,
    checkpoint_count: StateMap<Address, u64>,
    checkpoints: StateMap<(Address, u64), Checkpoint>,
    phantom: PhantomData<C>,
}

impl<C: Context> Outbox<C> {
    /// Creates the module at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            endpoints: StateMap::new(Prefix::new_storage(MODULE_NAME, "endpoints")),
            next_nonce: StateMap::new(Prefix::new_storage(MODULE_NAME, "next_nonce")),
            envelopes: StateMap::new(Prefix::new_storage(MODULE_NAME, "envelopes")),
            checkpointed_until: StateMap::new(Prefix::new_storage(
                MODULE_NAME,
                "checkpointed_until",
            )),
            checkpoint_count: StateMap::new(Prefix::new_storage(MODULE_NAME, "checkpoint_count")),
            checkpoints: StateMap::new(Prefix::new_storage(MODULE_NAME, "checkpoints")),
            phantom: PhantomData,
        }
    }

    pub(crate) fn init_module<S: Storage>(
        &self,
        config: &OutboxConfig,
        working_set: &mut WorkingSet<S>,
    ) -> Result<()> {
        for endpoint in &config.endpoints {
            if self.endpoints.get(&endpoint.endpoint, working_set).is_some() {
                return Err(OutboxError::DuplicateEndpoint(endpoint.endpoint).into());
            }
            self.endpoints
                .set(&endpoint.endpoint, endpoint, working_set);
        }
        Ok(())
    }

    /// Accepts an envelope for delivery and returns its nonce.
    ///
    /// Fails synchronously if the endpoint is unknown or `gas_limit` does not cover the
    /// endpoint's price for the payload. Nothing is stored on failure.
    pub fn submit<S: Storage>(
        &self,
        endpoint: Address,
        sender: Address,
        target: Address,
        payload: Vec<u8>,
        gas_limit: u64,
        working_set: &mut WorkingSet<S>,
    ) -> Result<u64, OutboxError> {
        let config = self
            .endpoints
            .get(&endpoint, working_set)
            .ok_or(OutboxError::UnknownEndpoint(endpoint))?;

        let mut meter = GasMeter::new(gas_limit, config.price());
        if meter
            .charge_gas(&[config.base_gas, payload.len() as u64])
            .is_err()
        {
            let required = config.required_gas(payload.len());
            warn!(%endpoint, required, gas_limit, "Rejecting envelope with insufficient gas");
            return Err(OutboxError::InsufficientGas {
                endpoint,
                required,
                provided: gas_limit,
            });
        }

        let nonce = self.next_nonce.get(&endpoint, working_set).unwrap_or_default();
        let envelope = Envelope {
            endpoint,
            nonce,
            sender,
            target,
            payload,
            gas_limit,
        };
        self.envelopes.set(&(endpoint, nonce), &envelope, working_set);
        self.next_nonce.set(&endpoint, &(nonce + 1), working_set);

        debug!(%endpoint, nonce, %sender, %target, "Envelope accepted");
        OutboxEvent::MessageSubmitted {
            endpoint,
            nonce,
            sender,
            target,
            gas_limit,
        }
        .emit(working_set);

        Ok(nonce)
    }

    /// Commits every envelope submitted since the last checkpoint.
    pub fn commit_checkpoint<S: Storage>(
        &self,
        endpoint: Address,
        working_set: &mut WorkingSet<S>,
    ) -> Result<Checkpoint, OutboxError> {
        let config = self
            .endpoints
            .get(&endpoint, working_set)
            .ok_or(OutboxError::UnknownEndpoint(endpoint))?;
        if config.style != DeliveryStyle::Checkpoint {
            return Err(OutboxError::NotCheckpointed(endpoint));
        }

        let first_nonce = self
            .checkpointed_until
            .get(&endpoint, working_set)
            .unwrap_or_default();
        let end_nonce = self.next_nonce(&endpoint, working_set);
        if first_nonce == end_nonce {
            return Err(OutboxError::NothingToCheckpoint(endpoint));
        }

        let leaves = self.leaves(&endpoint, first_nonce, end_nonce, working_set);
        let id = self.checkpoint_count(&endpoint, working_set);
        let checkpoint = Checkpoint {
            id,
            root: merkle_root(&leaves),
            first_nonce,
            end_nonce,
        };

        self.checkpoints.set(&(endpoint, id), &checkpoint, working_set);
        self.checkpoint_count.set(&endpoint, &(id + 1), working_set);
        self.checkpointed_until.set(&endpoint, &end_nonce, working_set);

        info!(
            %endpoint,
            checkpoint_id = id,
            first_nonce,
            end_nonce,
            root = hex::encode(checkpoint.root),
            "Checkpoint committed"
        );
        OutboxEvent::CheckpointCommitted {
            endpoint,
            checkpoint_id: id,
            root: checkpoint.root,
            first_nonce,
            end_nonce,
        }
        .emit(working_set);

        Ok(checkpoint)
    }

    fn leaves<S: Storage>(
        &self,
        endpoint: &Address,
        first_nonce: u64,
        end_nonce: u64,
        working_set: &mut WorkingSet<S>,
    ) -> Vec<Hash> {
        (first_nonce..end_nonce)
            .filter_map(|nonce| self.envelopes.get(&(*endpoint, nonce), working_set))
            .map(|envelope| envelope.hash())
            .collect()
    }

    /// Gas policy of `endpoint`.
    pub fn endpoint<S: Storage>(
        &self,
        endpoint: &Address,
        working_set: &mut WorkingSet<S>,
    ) -> Option<EndpointConfig> {
        self.endpoints.get(endpoint, working_set)
    }

    /// Nonce the next envelope on `endpoint` will get.
    pub fn next_nonce<S: Storage>(&self, endpoint: &Address, working_set: &mut WorkingSet<S>) -> u64 {
        self.next_nonce.get(endpoint, working_set).unwrap_or_default()
    }

    /// The envelope with `nonce` on `endpoint`.
    pub fn envelope<S: Storage>(
        &self,
        endpoint: &Address,
        nonce: u64,
        working_set: &mut WorkingSet<S>,
    ) -> Option<Envelope> {
        self.envelopes.get(&(*endpoint, nonce), working_set)
    }

    /// Every envelope on `endpoint` starting at `from_nonce`.
    pub fn envelopes_from<S: Storage>(
        &self,
        endpoint: &Address,
        from_nonce: u64,
        working_set: &mut WorkingSet<S>,
    ) -> Vec<Envelope> {
        let end_nonce = self.next_nonce(endpoint, working_set);
        (from_nonce..end_nonce)
            .filter_map(|nonce| self.envelope(endpoint, nonce, working_set))
            .collect()
    }

    /// Number of checkpoints committed on `endpoint`.
    pub fn checkpoint_count<S: Storage>(
        &self,
        endpoint: &Address,
        working_set: &mut WorkingSet<S>,
    ) -> u64 {
        self.checkpoint_count
            .get(endpoint, working_set)
            .unwrap_or_default()
    }

    /// The checkpoint `checkpoint_id` of `endpoint`.
    pub fn checkpoint<S: Storage>(
        &self,
        endpoint: &Address,
        checkpoint_id: u64,
        working_set: &mut WorkingSet<S>,
    ) -> Option<Checkpoint> {
        self.checkpoints.get(&(*endpoint, checkpoint_id), working_set)
    }

    /// Inclusion proof of the envelope `nonce` in checkpoint `checkpoint_id`.
    pub fn inclusion_proof<S: Storage>(
        &self,
        endpoint: &Address,
        checkpoint_id: u64,
        nonce: u64,
        working_set: &mut WorkingSet<S>,
    ) -> Option<MerkleProof> {
        let checkpoint = self.checkpoint(endpoint, checkpoint_id, working_set)?;
        if !(checkpoint.first_nonce..checkpoint.end_nonce).contains(&nonce) {
            return None;
        }
        let leaves = self.leaves(
            endpoint,
            checkpoint.first_nonce,
            checkpoint.end_nonce,
            working_set,
        );
        MerkleProof::generate(&leaves, (nonce - checkpoint.first_nonce) as usize)
    }
}

impl<C: Context> ModuleInfo for Outbox<C> {
    fn address(&self) -> &Address {
        &self.address
    }

    fn name(&self) -> &'static str {
        MODULE_NAME
    }
}

impl<C: Context> Module for Outbox<C> {
    type Context = C;

    type Config = OutboxConfig;

    type CallMessage = CallMessage;

    type Event = OutboxEvent;

    fn genesis(
        &self,
        config: &Self::Config,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<(), ModuleError> {
        Ok(self.init_module(config, working_set)?)
    }

    fn call(
        &self,
        msg: Self::CallMessage,
        _context: &Self::Context,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse, ModuleError> {
        match msg {
            CallMessage::CommitCheckpoint { endpoint } => {
                self.commit_checkpoint(endpoint, working_set)
                    .map_err(anyhow::Error::from)?;
                Ok(CallResponse::default())
            }
        }
    }
}
