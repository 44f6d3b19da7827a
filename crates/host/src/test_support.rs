//! In-memory host implementation for tests.
//!
//! `TestHost` implements every capability trait against plain in-memory
//! state: a configurable shard map, a gas meter, a set of built-in names,
//! scripted execution outcomes keyed by function name, and recording
//! output/storage sinks. Deterministic by construction, so scenario tests
//! can assert exact gas figures and call orderings.

use crate::error::{StorageError, TransferError};
use crate::traits::{
    BuiltinRegistry, CallDataParser, ContextStorage, Metering, OutputSink, Runtime, ShardOracle,
    SyncExecutor,
};
use shardvm_calldata::{CallDataError, ParsedCallData};
use shardvm_types::{
    Address, ContractCallInput, GasSchedule, Hash, OutputTransfer, ReturnCode, ShardId, VmOutput,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Scripted result for one function name.
#[derive(Debug, Clone)]
pub struct ScriptedOutcome {
    /// Return code of the execution.
    pub return_code: ReturnCode,
    /// Return values.
    pub return_data: Vec<Vec<u8>>,
    /// Return message.
    pub return_message: String,
    /// Gas debited from the shared meter when the call runs.
    pub gas_used: u64,
    /// Error reported alongside the output, if any.
    pub error: Option<String>,
}

impl ScriptedOutcome {
    /// An outcome with the given return code and nothing else.
    pub fn new(return_code: ReturnCode) -> Self {
        Self {
            return_code,
            return_data: Vec::new(),
            return_message: String::new(),
            gas_used: 0,
            error: None,
        }
    }

    /// A successful outcome.
    pub fn ok() -> Self {
        Self::new(ReturnCode::Ok)
    }

    /// Set the return values.
    pub fn with_return_data(mut self, return_data: Vec<Vec<u8>>) -> Self {
        self.return_data = return_data;
        self
    }

    /// Set the return message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.return_message = message.into();
        self
    }

    /// Set the gas debited when the call runs.
    pub fn with_gas_used(mut self, gas_used: u64) -> Self {
        self.gas_used = gas_used;
        self
    }

    /// Report an error alongside the output.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

impl Default for ScriptedOutcome {
    fn default() -> Self {
        Self::ok()
    }
}

/// In-memory host for driving the executor in tests.
pub struct TestHost {
    address: Address,
    current_tx_hash: Hash,
    original_tx_hash: Hash,
    prev_tx_hash: Hash,
    gas_price: u64,
    gas_left: u64,
    schedule: GasSchedule,
    shards: HashMap<Address, ShardId>,
    builtins: HashSet<String>,
    outcomes: HashMap<String, ScriptedOutcome>,
    reject_transfers: bool,
    reject_storage: bool,

    /// Every call descriptor handed to the executor seam, in order.
    pub executed_calls: Vec<ContractCallInput>,
    /// Every outbound transfer record appended to the output.
    pub transfers: Vec<OutputTransfer>,
    /// Finish frames appended to the output stream.
    pub finish_frames: Vec<Vec<u8>>,
    /// Current return message.
    pub return_message: String,
    /// Persisted key/value pairs.
    pub storage: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Message passed to `fail_execution`, if it was called.
    pub execution_failed: Option<String>,
    /// Whether `clear_gas_provided` was called.
    pub gas_provided_cleared: bool,
}

impl TestHost {
    /// A host in shard 0 with a 1M gas balance and small test fees.
    pub fn new() -> Self {
        Self {
            address: Address::new([0x99; 32]),
            current_tx_hash: Hash::from_bytes(b"current-tx"),
            original_tx_hash: Hash::from_bytes(b"original-tx"),
            prev_tx_hash: Hash::from_bytes(b"prev-tx"),
            gas_price: 1,
            gas_left: 1_000_000,
            schedule: GasSchedule {
                async_call_step: 1_000,
                data_copy_per_byte: 1,
            },
            shards: HashMap::new(),
            builtins: HashSet::new(),
            outcomes: HashMap::new(),
            reject_transfers: false,
            reject_storage: false,
            executed_calls: Vec::new(),
            transfers: Vec::new(),
            finish_frames: Vec::new(),
            return_message: String::new(),
            storage: BTreeMap::new(),
            execution_failed: None,
            gas_provided_cleared: false,
        }
    }

    /// Set the metering balance.
    pub fn with_gas_left(mut self, gas_left: u64) -> Self {
        self.gas_left = gas_left;
        self
    }

    /// Assign an address to a shard. Unmapped addresses live in shard 0.
    pub fn with_shard(mut self, address: Address, shard: ShardId) -> Self {
        self.shards.insert(address, shard);
        self
    }

    /// Register a built-in function name.
    pub fn with_builtin(mut self, function: impl Into<String>) -> Self {
        self.builtins.insert(function.into());
        self
    }

    /// Script the outcome of calls to the given function. Unscripted
    /// functions succeed with no output and no gas use.
    pub fn with_outcome(mut self, function: impl Into<String>, outcome: ScriptedOutcome) -> Self {
        self.outcomes.insert(function.into(), outcome);
        self
    }

    /// Reject every outbound transfer with `InsufficientFunds`.
    pub fn with_rejected_transfers(mut self) -> Self {
        self.reject_transfers = true;
        self
    }

    /// Reject every storage write.
    pub fn with_rejected_storage(mut self) -> Self {
        self.reject_storage = true;
        self
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for TestHost {
    fn contract_address(&self) -> &Address {
        &self.address
    }

    fn current_tx_hash(&self) -> &Hash {
        &self.current_tx_hash
    }

    fn original_tx_hash(&self) -> &Hash {
        &self.original_tx_hash
    }

    fn prev_tx_hash(&self) -> &Hash {
        &self.prev_tx_hash
    }

    fn gas_price(&self) -> u64 {
        self.gas_price
    }

    fn fail_execution(&mut self, message: &str) {
        self.execution_failed = Some(message.to_owned());
    }

    fn clear_gas_provided(&mut self) {
        self.gas_provided_cleared = true;
    }
}

impl ShardOracle for TestHost {
    fn shard_of(&self, address: &Address) -> ShardId {
        self.shards.get(address).copied().unwrap_or(ShardId(0))
    }
}

impl Metering for TestHost {
    fn gas_left(&self) -> u64 {
        self.gas_left
    }

    fn use_gas(&mut self, gas: u64) {
        self.gas_left = self.gas_left.saturating_sub(gas);
    }

    fn gas_schedule(&self) -> &GasSchedule {
        &self.schedule
    }
}

impl CallDataParser for TestHost {
    fn parse_call_data(&self, data: &[u8]) -> Result<ParsedCallData, CallDataError> {
        shardvm_calldata::parse_call_data(data)
    }
}

impl BuiltinRegistry for TestHost {
    fn is_builtin_function(&self, function: &str) -> bool {
        self.builtins.contains(function)
    }
}

impl SyncExecutor for TestHost {
    fn execute_on_dest_context(&mut self, input: ContractCallInput) -> (VmOutput, Option<String>) {
        let outcome = self
            .outcomes
            .get(&input.function)
            .cloned()
            .unwrap_or_default();

        // The nested execution debits the shared meter as it runs.
        self.use_gas(outcome.gas_used);
        let gas_remaining = input.gas_provided.saturating_sub(outcome.gas_used);
        self.executed_calls.push(input);

        let output = VmOutput {
            return_code: outcome.return_code,
            return_data: outcome.return_data,
            return_message: outcome.return_message,
            gas_remaining,
        };
        (output, outcome.error)
    }
}

impl OutputSink for TestHost {
    fn transfer(&mut self, transfer: OutputTransfer) -> Result<(), TransferError> {
        if self.reject_transfers {
            return Err(TransferError::InsufficientFunds);
        }
        self.transfers.push(transfer);
        Ok(())
    }

    fn set_return_message(&mut self, message: &str) {
        self.return_message = message.to_owned();
    }

    fn finish(&mut self, data: Vec<u8>) {
        self.finish_frames.push(data);
    }

    fn vm_output_on_error(&self, message: &str) -> VmOutput {
        VmOutput {
            return_code: ReturnCode::ExecutionFailed,
            return_data: Vec::new(),
            return_message: message.to_owned(),
            gas_remaining: 0,
        }
    }
}

impl ContextStorage for TestHost {
    fn set_storage(&mut self, key: &[u8], value: &[u8]) -> Result<isize, StorageError> {
        if self.reject_storage {
            return Err(StorageError::WriteRejected("storage unavailable".to_owned()));
        }
        let previous = self.storage.insert(key.to_vec(), value.to_vec());
        let delta = value.len() as isize - previous.map_or(0, |v| v.len() as isize);
        Ok(delta)
    }
}
