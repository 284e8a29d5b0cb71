use bridge_modules_api::{
    Address, Context, DefaultContext, Event, MemoryStorage, Module, ModuleError,
    StateCheckpoint, Timestamp, WorkingSet,
};
use tracing::debug;

/// Outcome of a transaction.
#[derive(Debug)]
pub enum TxEffect {
    /// The writes and events of the transaction were committed.
    Successful,
    /// The transaction failed and left no trace in the state.
    Reverted(ModuleError),
}

/// What a transaction left behind.
#[derive(Debug)]
pub struct TransactionReceipt {
    /// Whether the transaction was committed.
    pub effect: TxEffect,
    /// Events of a committed transaction. Empty for reverted ones.
    pub events: Vec<Event>,
}

impl TransactionReceipt {
    /// Returns `true` if the transaction was committed.
    pub fn is_successful(&self) -> bool {
        matches!(self.effect, TxEffect::Successful)
    }

    /// The error that reverted the transaction.
    pub fn error(&self) -> Option<&ModuleError> {
        match &self.effect {
            TxEffect::Successful => None,
            TxEffect::Reverted(err) => Some(err),
        }
    }

    /// The module error type that reverted the transaction, if it was `E`.
    pub fn downcast_error<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        self.error().and_then(|err| err.downcast_ref::<E>())
    }
}

/// A chain executing one transaction at a time against in-memory storage.
///
/// Every transaction runs in its own working set: a successful one is checkpointed into
/// the chain state, a failing one is reverted together with its events.
#[derive(Debug)]
pub struct MockChain {
    name: String,
    state: StateCheckpoint<MemoryStorage>,
    time: Timestamp,
}

impl MockChain {
    /// Creates an empty chain whose clock starts at `genesis_time`.
    pub fn new(name: &str, genesis_time: Timestamp) -> Self {
        Self {
            name: name.to_string(),
            state: StateCheckpoint::default(),
            time: genesis_time,
        }
    }

    /// Name of the chain, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Timestamp of the current block.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// Moves the clock forward.
    pub fn advance_time(&mut self, seconds: u64) {
        self.time = self.time.saturating_add(seconds);
    }

    /// Runs `module`'s genesis.
    pub fn genesis<M>(&mut self, module: &M, config: &M::Config) -> Result<(), ModuleError>
    where
        M: Module<Context = DefaultContext>,
    {
        let receipt = self.apply(|working_set, _| module.genesis(config, working_set));
        match receipt.effect {
            TxEffect::Successful => Ok(()),
            TxEffect::Reverted(err) => Err(err),
        }
    }

    /// Executes `f` as one transaction at the current block time.
    pub fn apply<F>(&mut self, f: F) -> TransactionReceipt
    where
        F: FnOnce(&mut WorkingSet<MemoryStorage>, Timestamp) -> Result<(), ModuleError>,
    {
        let mut working_set = std::mem::take(&mut self.state).to_revertable();
        let result = f(&mut working_set, self.time);
        let events = working_set.take_events();

        match result {
            Ok(()) => {
                self.state = working_set.checkpoint();
                TransactionReceipt {
                    effect: TxEffect::Successful,
                    events,
                }
            }
            Err(err) => {
                debug!(chain = %self.name, error = %err, "Transaction reverted");
                self.state = working_set.revert();
                TransactionReceipt {
                    effect: TxEffect::Reverted(err),
                    events: Vec::new(),
                }
            }
        }
    }

    /// Executes a call message sent by `sender`.
    pub fn call<M>(&mut self, module: &M, message: M::CallMessage, sender: Address) -> TransactionReceipt
    where
        M: Module<Context = DefaultContext>,
    {
        self.apply(|working_set, time| {
            let context = DefaultContext::new(sender, time);
            module.call(message, &context, working_set).map(|_| ())
        })
    }

    /// Reads the state. Anything `f` writes is discarded.
    pub fn query<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut WorkingSet<MemoryStorage>) -> T,
    {
        let mut working_set = std::mem::take(&mut self.state).to_revertable();
        let output = f(&mut working_set);
        self.state = working_set.revert();
        output
    }
}
