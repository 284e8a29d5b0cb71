use anyhow::{anyhow, Result};
use bridge_modules_api::{Address, DefaultContext, Module, ModuleInfo};
use tracing::{info, warn};

use crate::chain::{MockChain, TransactionReceipt};
use crate::envelope::DeliveryStyle;
use crate::inbox::{CallMessage as InboxCallMessage, CheckpointProof, Inbox};
use crate::outbox::{CallMessage as OutboxCallMessage, Outbox};

/// Result of executing one envelope on the destination chain.
#[derive(Debug)]
pub struct RelayOutcome {
    /// Nonce of the envelope.
    pub nonce: u64,
    /// The destination transaction.
    pub receipt: TransactionReceipt,
}

/// Off-chain agent moving the envelopes of one endpoint from the root chain to a
/// destination chain.
///
/// Every envelope is attempted exactly once; a reverted delivery is reported in its
/// [`RelayOutcome`] and can be retried by hand through [`Inbox::relay`].
#[derive(Debug, Clone)]
pub struct Relayer {
    endpoint: Address,
    style: DeliveryStyle,
    operator: Address,
    next_nonce: u64,
    next_checkpoint: u64,
}

impl Relayer {
    /// Creates a relayer for `endpoint`. `operator` signs checkpoint proposals on the root
    /// chain and checkpoint syncs on the destination.
    pub fn new(endpoint: Address, style: DeliveryStyle, operator: Address) -> Self {
        Self {
            endpoint,
            style,
            operator,
            next_nonce: 0,
            next_checkpoint: 0,
        }
    }

    /// Commits the envelopes submitted since the last checkpoint. Returns `false` if there
    /// was nothing to commit or the endpoint delivers directly.
    pub fn propose_checkpoint(
        &self,
        source: &mut MockChain,
        outbox: &Outbox<DefaultContext>,
    ) -> Result<bool> {
        if self.style != DeliveryStyle::Checkpoint {
            return Ok(false);
        }

        let endpoint = self.endpoint;
        let pending = source.query(|working_set| {
            let end = outbox.next_nonce(&endpoint, working_set);
            let committed = outbox.checkpoint_count(&endpoint, working_set);
            let start = committed
                .checked_sub(1)
                .and_then(|last| outbox.checkpoint(&endpoint, last, working_set))
                .map(|checkpoint| checkpoint.end_nonce)
                .unwrap_or_default();
            end > start
        });
        if !pending {
            return Ok(false);
        }

        let receipt = source.call(
            outbox,
            OutboxCallMessage::CommitCheckpoint { endpoint },
            self.operator,
        );
        match receipt.error() {
            None => Ok(true),
            Some(err) => Err(anyhow!("Checkpoint proposal on {endpoint} failed: {err}")),
        }
    }

    /// Executes on `destination` every envelope of the endpoint that is ready.
    ///
    /// Direct endpoints deliver everything submitted so far. Checkpoint endpoints deliver
    /// the envelopes of committed checkpoints, syncing each checkpoint root first.
    pub fn relay_pending<M>(
        &mut self,
        source: &mut MockChain,
        outbox: &Outbox<DefaultContext>,
        destination: &mut MockChain,
        inbox: &Inbox<DefaultContext>,
        target: &M,
    ) -> Result<Vec<RelayOutcome>>
    where
        M: Module<Context = DefaultContext> + ModuleInfo,
    {
        let outcomes = match self.style {
            DeliveryStyle::Direct => self.relay_direct(source, outbox, destination, inbox, target),
            DeliveryStyle::Checkpoint => {
                self.relay_checkpoints(source, outbox, destination, inbox, target)?
            }
        };

        for outcome in &outcomes {
            if let Some(err) = outcome.receipt.error() {
                warn!(
                    endpoint = %self.endpoint,
                    destination = destination.name(),
                    nonce = outcome.nonce,
                    error = %err,
                    "Delivery reverted"
                );
            }
        }
        info!(
            endpoint = %self.endpoint,
            destination = destination.name(),
            count = outcomes.len(),
            "Relayed envelopes"
        );
        Ok(outcomes)
    }

    fn relay_direct<M>(
        &mut self,
        source: &mut MockChain,
        outbox: &Outbox<DefaultContext>,
        destination: &mut MockChain,
        inbox: &Inbox<DefaultContext>,
        target: &M,
    ) -> Vec<RelayOutcome>
    where
        M: Module<Context = DefaultContext> + ModuleInfo,
    {
        let endpoint = self.endpoint;
        let from = self.next_nonce;
        let envelopes =
            source.query(|working_set| outbox.envelopes_from(&endpoint, from, working_set));

        envelopes
            .into_iter()
            .map(|envelope| {
                self.next_nonce = envelope.nonce + 1;
                let receipt = destination.apply(|working_set, now| {
                    inbox
                        .relay(target, &envelope, None, now, working_set)
                        .map(|_| ())
                });
                RelayOutcome {
                    nonce: envelope.nonce,
                    receipt,
                }
            })
            .collect()
    }

    fn relay_checkpoints<M>(
        &mut self,
        source: &mut MockChain,
        outbox: &Outbox<DefaultContext>,
        destination: &mut MockChain,
        inbox: &Inbox<DefaultContext>,
        target: &M,
    ) -> Result<Vec<RelayOutcome>>
    where
        M: Module<Context = DefaultContext> + ModuleInfo,
    {
        let endpoint = self.endpoint;
        let committed =
            source.query(|working_set| outbox.checkpoint_count(&endpoint, working_set));

        let mut outcomes = Vec::new();
        while self.next_checkpoint < committed {
            let checkpoint_id = self.next_checkpoint;
            let checkpoint = source
                .query(|working_set| outbox.checkpoint(&endpoint, checkpoint_id, working_set))
                .ok_or_else(|| anyhow!("Checkpoint {checkpoint_id} of {endpoint} is missing"))?;

            let sync = destination.call(
                inbox,
                InboxCallMessage::SyncCheckpoint {
                    endpoint,
                    checkpoint_id,
                    root: checkpoint.root,
                },
                self.operator,
            );
            if let Some(err) = sync.error() {
                return Err(anyhow!(
                    "Syncing checkpoint {checkpoint_id} of {endpoint} failed: {err}"
                ));
            }
            self.next_checkpoint += 1;

            for nonce in checkpoint.first_nonce..checkpoint.end_nonce {
                let (envelope, proof) = source.query(|working_set| {
                    (
                        outbox.envelope(&endpoint, nonce, working_set),
                        outbox.inclusion_proof(&endpoint, checkpoint_id, nonce, working_set),
                    )
                });
                let envelope =
                    envelope.ok_or_else(|| anyhow!("Envelope {nonce} of {endpoint} is missing"))?;
                let proof = CheckpointProof {
                    checkpoint_id,
                    proof: proof.ok_or_else(|| anyhow!("No proof for envelope {nonce}"))?,
                };

                let receipt = destination.apply(|working_set, now| {
                    inbox
                        .relay(target, &envelope, Some(&proof), now, working_set)
                        .map(|_| ())
                });
                self.next_nonce = nonce + 1;
                outcomes.push(RelayOutcome { nonce, receipt });
            }
        }

        Ok(outcomes)
    }
}
