//! Host capability traits.
//!
//! The execution core consumes its collaborators through small capability
//! traits, one per concern. A concrete host implements all of them and gains
//! the blanket [`Host`] supertrait, which is what the executor borrows.
//!
//! All capabilities are synchronous: suspension in this design is structural
//! (persist and return), never runtime-level.

use crate::error::{StorageError, TransferError};
use shardvm_calldata::{CallDataError, ParsedCallData};
use shardvm_types::{Address, ContractCallInput, GasSchedule, Hash, OutputTransfer, ShardId, VmOutput};

/// Ambient state of the current contract invocation.
pub trait Runtime {
    /// Address of the contract currently executing.
    fn contract_address(&self) -> &Address;

    /// Hash of the transaction currently executing.
    fn current_tx_hash(&self) -> &Hash;

    /// Hash of the transaction that originated the call chain.
    fn original_tx_hash(&self) -> &Hash;

    /// Hash of the previous transaction in the call chain. Also the suffix
    /// of the async context's storage key.
    fn prev_tx_hash(&self) -> &Hash;

    /// Gas price of the enclosing transaction.
    fn gas_price(&self) -> u64;

    /// Mark the whole invocation as failed.
    fn fail_execution(&mut self, message: &str);

    /// Zero the gas provided to the enclosing invocation. Called when a
    /// callback fails unrecoverably.
    fn clear_gas_provided(&mut self);
}

/// Static assignment of addresses to shards.
pub trait ShardOracle {
    /// Shard of the given address.
    fn shard_of(&self, address: &Address) -> ShardId;
}

/// Gas accounting for the current invocation.
///
/// The allocator reads the balance before each sweep and the executor mutates
/// it during the sweep; nothing else touches it while a sweep runs.
pub trait Metering {
    /// Gas still available to the current invocation.
    fn gas_left(&self) -> u64;

    /// Consume gas from the current invocation.
    fn use_gas(&mut self, gas: u64);

    /// Cost schedule for the async call machinery.
    fn gas_schedule(&self) -> &GasSchedule;
}

/// Decoder for the data field of async calls.
pub trait CallDataParser {
    /// Decode a data field into its function name and raw arguments.
    fn parse_call_data(&self, data: &[u8]) -> Result<ParsedCallData, CallDataError>;
}

/// Registry of protocol built-in functions.
pub trait BuiltinRegistry {
    /// Whether the function is implemented by the host rather than by
    /// contract bytecode.
    fn is_builtin_function(&self, function: &str) -> bool;
}

/// Synchronous execution of a call descriptor in the destination's context.
///
/// Re-entrant by design: the nested execution may register its own async
/// context and run a full nested instance of the driver, debiting the shared
/// metering balance as it goes.
pub trait SyncExecutor {
    /// Run the call and return its output together with an optional error
    /// message. The output is always well-formed, even on failure — callback
    /// synthesis needs its return code and message either way.
    fn execute_on_dest_context(&mut self, input: ContractCallInput) -> (VmOutput, Option<String>);
}

/// The output accumulator of the current invocation.
pub trait OutputSink {
    /// Append an outbound cross-shard transfer record.
    fn transfer(&mut self, transfer: OutputTransfer) -> Result<(), TransferError>;

    /// Set the invocation's return message.
    fn set_return_message(&mut self, message: &str);

    /// Append a finish frame to the output stream.
    fn finish(&mut self, data: Vec<u8>);

    /// Synthesize a well-formed output from an error message.
    fn vm_output_on_error(&self, message: &str) -> VmOutput;
}

/// Keyed byte-map persistence for residual async contexts.
pub trait ContextStorage {
    /// Write a value under a key, returning the storage size delta.
    fn set_storage(&mut self, key: &[u8], value: &[u8]) -> Result<isize, StorageError>;
}

/// Everything the async call executor needs from its host.
pub trait Host:
    Runtime
    + ShardOracle
    + Metering
    + CallDataParser
    + BuiltinRegistry
    + SyncExecutor
    + OutputSink
    + ContextStorage
{
}

impl<T> Host for T where
    T: Runtime
        + ShardOracle
        + Metering
        + CallDataParser
        + BuiltinRegistry
        + SyncExecutor
        + OutputSink
        + ContextStorage
{
}
