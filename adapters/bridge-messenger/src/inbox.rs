use std::marker::PhantomData;

use anyhow::{bail, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::{
    Address, CallResponse, Context, Module, ModuleError, ModuleEvent, ModuleInfo, Prefix,
    StateMap, StateValue, Storage, Timestamp, WorkingSet,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::envelope::{DeliveryStyle, Envelope};
use crate::merkle::{Hash, MerkleProof};

const MODULE_NAME: &str = "Inbox";

/// How the destination chain sees one endpoint of the root chain.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct InboxEndpoint {
    /// The endpoint on the root chain.
    pub endpoint: Address,
    /// Immediate sender of every call delivered from the endpoint: the local messenger or
    /// state receiver.
    pub receiver: Address,
    /// Delivery style of the endpoint.
    pub style: DeliveryStyle,
}

/// Genesis configuration of the inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxConfig {
    /// Endpoints whose envelopes this chain accepts.
    pub endpoints: Vec<InboxEndpoint>,
    /// The only identity allowed to sync checkpoint roots.
    pub checkpoint_oracle: Address,
}

/// Location of an envelope inside a synced checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CheckpointProof {
    /// The checkpoint holding the envelope.
    pub checkpoint_id: u64,
    /// Inclusion proof against the checkpoint root.
    pub proof: MerkleProof,
}

/// Reasons the inbox refuses to execute an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The endpoint is not configured on this chain.
    #[error("Endpoint {0} is not accepted by this chain")]
    UnknownEndpoint(Address),
    /// The envelope was already executed.
    #[error("Envelope {nonce} of endpoint {endpoint} was already relayed")]
    AlreadyRelayed {
        /// The endpoint.
        endpoint: Address,
        /// The envelope nonce.
        nonce: u64,
    },
    /// A checkpoint endpoint envelope came without an inclusion proof.
    #[error("Envelope {nonce} of endpoint {endpoint} needs an inclusion proof")]
    MissingProof {
        /// The endpoint.
        endpoint: Address,
        /// The envelope nonce.
        nonce: u64,
    },
    /// The checkpoint root was never synced.
    #[error("Checkpoint {checkpoint_id} of endpoint {endpoint} is unknown")]
    UnknownCheckpoint {
        /// The endpoint.
        endpoint: Address,
        /// The checkpoint.
        checkpoint_id: u64,
    },
    /// The proof does not lead to the checkpoint root.
    #[error("Inclusion proof of envelope {nonce} of endpoint {endpoint} is invalid")]
    InvalidProof {
        /// The endpoint.
        endpoint: Address,
        /// The envelope nonce.
        nonce: u64,
    },
    /// The envelope is addressed to another module.
    #[error("Envelope targets {actual}, not {expected}")]
    WrongTarget {
        /// The module asked to execute the envelope.
        expected: Address,
        /// The envelope target.
        actual: Address,
    },
    /// The payload is not a call message of the target.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    /// Someone other than the oracle tried to sync a checkpoint.
    #[error("{0} is not the checkpoint oracle")]
    Unauthorized(Address),
    /// A checkpoint root can only be synced once.
    #[error("Checkpoint {checkpoint_id} of endpoint {endpoint} is already synced")]
    CheckpointAlreadySynced {
        /// The endpoint.
        endpoint: Address,
        /// The checkpoint.
        checkpoint_id: u64,
    },
}

/// Calls accepted by the inbox.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum CallMessage {
    /// Makes a root chain checkpoint available for inclusion proofs.
    SyncCheckpoint {
        /// A checkpoint endpoint.
        endpoint: Address,
        /// The checkpoint.
        checkpoint_id: u64,
        /// Its Merkle root.
        root: Hash,
    },
}

/// Events emitted by the inbox.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum InboxEvent {
    /// A checkpoint root was synced.
    CheckpointSynced {
        /// The endpoint.
        endpoint: Address,
        /// The checkpoint.
        checkpoint_id: u64,
        /// Its Merkle root.
        root: Hash,
    },
    /// An envelope was executed.
    MessageRelayed {
        /// The endpoint.
        endpoint: Address,
        /// The envelope nonce.
        nonce: u64,
        /// The module that executed it.
        target: Address,
    },
}

impl ModuleEvent for InboxEvent {
    fn key(&self) -> &'static str {
        match self {
            InboxEvent::CheckpointSynced { .. } => "CheckpointSynced",
            InboxEvent::MessageRelayed { .. } => "MessageRelayed",
        }
    }
}

/// Destination chain side of the delivery infrastructure.
#[derive(Debug, Clone)]
pub struct Inbox<C: Context> {
    address: Address,
    endpoints: StateMap<Address, InboxEndpoint>,
    checkpoint_oracle: StateValue<Address>,
    checkpoint_roots: StateMap<(Address, u64), Hash>,
    /// Hash of every executed envelope, with the time it was executed.
    relayed: StateMap<Hash, Timestamp>,
    phantom: PhantomData<C>,
}

impl<C: Context> Inbox<C> {
    /// Creates the module at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            endpoints: StateMap::new(Prefix::new_storage(MODULE_NAME, "endpoints")),
            checkpoint_oracle: StateValue::new(Prefix::new_storage(
                MODULE_NAME,
                "checkpoint_oracle",
            )),
            checkpoint_roots: StateMap::new(Prefix::new_storage(MODULE_NAME, "checkpoint_roots")),
            relayed: StateMap::new(Prefix::new_storage(MODULE_NAME, "relayed")),
            phantom: PhantomData,
        }
    }

    fn sync_checkpoint(
        &self,
        endpoint: Address,
        checkpoint_id: u64,
        root: Hash,
        context: &C,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<()> {
        let oracle = self.checkpoint_oracle.get_or_err(working_set)?;
        if context.sender() != &oracle {
            warn!(sender = %context.sender(), "Checkpoint sync from a non-oracle sender");
            bail!(RelayError::Unauthorized(*context.sender()));
        }

        let config = self
            .endpoints
            .get(&endpoint, working_set)
            .ok_or(RelayError::UnknownEndpoint(endpoint))?;
        if config.style != DeliveryStyle::Checkpoint {
            bail!(RelayError::UnknownEndpoint(endpoint));
        }
        if self
            .checkpoint_roots
            .get(&(endpoint, checkpoint_id), working_set)
            .is_some()
        {
            bail!(RelayError::CheckpointAlreadySynced {
                endpoint,
                checkpoint_id
            });
        }

        self.checkpoint_roots
            .set(&(endpoint, checkpoint_id), &root, working_set);
        debug!(%endpoint, checkpoint_id, "Checkpoint synced");
        InboxEvent::CheckpointSynced {
            endpoint,
            checkpoint_id,
            root,
        }
        .emit(working_set);
        Ok(())
    }

    /// Executes `envelope` against `target`.
    ///
    /// The target sees the endpoint's receiver as immediate sender and the envelope sender
    /// as cross-domain sender. Envelopes from checkpoint endpoints must come with a proof
    /// against a synced checkpoint. Every envelope executes at most once; a failing
    /// target call leaves the envelope unrelayed.
    pub fn relay<M>(
        &self,
        target: &M,
        envelope: &Envelope,
        proof: Option<&CheckpointProof>,
        now: Timestamp,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse, ModuleError>
    where
        M: Module<Context = C> + ModuleInfo,
    {
        let endpoint = envelope.endpoint;
        let nonce = envelope.nonce;
        let config = self
            .endpoints
            .get(&endpoint, working_set)
            .ok_or(RelayError::UnknownEndpoint(endpoint))
            .map_err(anyhow::Error::from)?;

        let hash = envelope.hash();
        if self.relayed.get(&hash, working_set).is_some() {
            warn!(%endpoint, nonce, "Refusing to replay envelope");
            return Err(anyhow::Error::from(RelayError::AlreadyRelayed { endpoint, nonce }).into());
        }

        if config.style == DeliveryStyle::Checkpoint {
            self.verify_inclusion(envelope, &hash, proof, working_set)
                .map_err(anyhow::Error::from)?;
        }

        if &envelope.target != target.address() {
            return Err(anyhow::Error::from(RelayError::WrongTarget {
                expected: *target.address(),
                actual: envelope.target,
            })
            .into());
        }

        let message = M::CallMessage::try_from_slice(&envelope.payload)
            .map_err(|e| anyhow::Error::from(RelayError::MalformedPayload(e.to_string())))?;
        let context = C::relayed(config.receiver, envelope.sender, now);
        let response = target.call(message, &context, working_set)?;

        self.relayed.set(&hash, &now, working_set);
        info!(%endpoint, nonce, target = %envelope.target, "Envelope relayed");
        InboxEvent::MessageRelayed {
            endpoint,
            nonce,
            target: envelope.target,
        }
        .emit(working_set);

        Ok(response)
    }

    fn verify_inclusion(
        &self,
        envelope: &Envelope,
        hash: &Hash,
        proof: Option<&CheckpointProof>,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<(), RelayError> {
        let endpoint = envelope.endpoint;
        let nonce = envelope.nonce;
        let proof = proof.ok_or(RelayError::MissingProof { endpoint, nonce })?;
        let root = self
            .checkpoint_roots
            .get(&(endpoint, proof.checkpoint_id), working_set)
            .ok_or(RelayError::UnknownCheckpoint {
                endpoint,
                checkpoint_id: proof.checkpoint_id,
            })?;

        if !proof.proof.verify(hash, &root) {
            warn!(%endpoint, nonce, "Inclusion proof rejected");
            return Err(RelayError::InvalidProof { endpoint, nonce });
        }
        Ok(())
    }

    /// Returns `true` if `envelope` was already executed.
    pub fn is_relayed<S: Storage>(&self, envelope: &Envelope, working_set: &mut WorkingSet<S>) -> bool {
        self.relayed.get(&envelope.hash(), working_set).is_some()
    }

    /// Root of a synced checkpoint.
    pub fn checkpoint_root<S: Storage>(
        &self,
        endpoint: &Address,
        checkpoint_id: u64,
        working_set: &mut WorkingSet<S>,
    ) -> Option<Hash> {
        self.checkpoint_roots
            .get(&(*endpoint, checkpoint_id), working_set)
    }
}

impl<C: Context> ModuleInfo for Inbox<C> {
    fn address(&self) -> &Address {
        &self.address
    }

    fn name(&self) -> &'static str {
        MODULE_NAME
    }
}

impl<C: Context> Module for Inbox<C> {
    type Context = C;

    type Config = InboxConfig;

    type CallMessage = CallMessage;

    type Event = InboxEvent;

    fn genesis(
        &self,
        config: &Self::Config,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<(), ModuleError> {
        for endpoint in &config.endpoints {
            self.endpoints
                .set(&endpoint.endpoint, endpoint, working_set);
        }
        self.checkpoint_oracle
            .set(&config.checkpoint_oracle, working_set);
        Ok(())
    }

    fn call(
        &self,
        msg: Self::CallMessage,
        context: &Self::Context,
        working_set: &mut WorkingSet<C::Storage>,
    ) -> Result<CallResponse, ModuleError> {
        match msg {
            CallMessage::SyncCheckpoint {
                endpoint,
                checkpoint_id,
                root,
            } => {
                self.sync_checkpoint(endpoint, checkpoint_id, root, context, working_set)?;
                Ok(CallResponse::default())
            }
        }
    }
}
