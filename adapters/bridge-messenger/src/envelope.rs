use borsh::{BorshDeserialize, BorshSerialize};
use bridge_modules_api::Address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::merkle::Hash;

/// How an endpoint gets its envelopes to the destination chain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStyle {
    /// Each envelope is relayed on its own and trusted as soon as it is submitted.
    Direct,
    /// Envelopes are committed into a checkpoint on the root chain and relayed with an
    /// inclusion proof against it.
    Checkpoint,
}

/// A message accepted by the outbox.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Envelope {
    /// Endpoint the envelope was submitted to.
    pub endpoint: Address,
    /// Position of the envelope in the endpoint's queue.
    pub nonce: u64,
    /// Module that submitted the envelope. Becomes the cross-domain sender on delivery.
    pub sender: Address,
    /// Module that executes the payload on the destination chain.
    pub target: Address,
    /// Borsh encoded call message of the target module.
    pub payload: Vec<u8>,
    /// Gas budget the sender attached.
    pub gas_limit: u64,
}

impl Envelope {
    /// Digest identifying the envelope. Used as the Merkle leaf and as the replay key.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.endpoint.as_ref());
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(self.sender.as_ref());
        hasher.update(self.target.as_ref());
        hasher.update((self.payload.len() as u64).to_be_bytes());
        hasher.update(&self.payload);
        hasher.update(self.gas_limit.to_be_bytes());
        hasher.finalize().into()
    }
}
