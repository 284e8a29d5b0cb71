//! In-memory chains and the cross-domain delivery infrastructure connecting them.
//!
//! The root chain runs an [`Outbox`] that accepts envelopes from modules and, for
//! checkpoint endpoints, commits batches of them into Merkle checkpoints. Each destination
//! chain runs an [`Inbox`] that executes relayed envelopes against a target module with
//! the endpoint's receiver as immediate sender and the envelope sender as cross-domain
//! sender. The [`Relayer`] moves envelopes between the two.

#![deny(missing_docs)]

mod chain;
mod envelope;
mod inbox;
pub mod merkle;
mod outbox;
mod relayer;

#[cfg(test)]
mod tests;

pub use chain::{MockChain, TransactionReceipt, TxEffect};
pub use envelope::{DeliveryStyle, Envelope};
pub use inbox::{
    CallMessage as InboxCallMessage, CheckpointProof, Inbox, InboxConfig, InboxEndpoint,
    InboxEvent, RelayError,
};
pub use outbox::{
    CallMessage as OutboxCallMessage, Checkpoint, EndpointConfig, Outbox, OutboxConfig,
    OutboxError, OutboxEvent,
};
pub use relayer::{RelayOutcome, Relayer};
