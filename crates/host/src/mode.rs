//! Execution-mode classification.

use crate::error::AsyncExecutionError;
use crate::traits::Host;
use shardvm_types::{Address, ExecutionMode};

/// Classify how a call to `destination` carrying `data` will be executed.
///
/// The data field is parsed first: a call whose data cannot be decoded is
/// neither a contract call nor a built-in invocation, and the failure aborts
/// the current sweep. Otherwise the caller's and the destination's shards
/// decide:
///
/// - same shard → [`ExecutionMode::SyncExecution`]
/// - different shard, built-in function → [`ExecutionMode::AsyncBuiltinFunc`]
/// - different shard otherwise → [`ExecutionMode::AsyncUnknown`]
///
/// Classification is pure: no side effects, and within one block the same
/// `(destination, data)` pair always yields the same mode.
pub fn determine_execution_mode<H: Host>(
    host: &H,
    destination: &Address,
    data: &[u8],
) -> Result<ExecutionMode, AsyncExecutionError> {
    let parsed = host.parse_call_data(data)?;

    let shard_of_caller = host.shard_of(host.contract_address());
    let shard_of_destination = host.shard_of(destination);
    if shard_of_caller == shard_of_destination {
        return Ok(ExecutionMode::SyncExecution);
    }

    if host.is_builtin_function(&parsed.function) {
        return Ok(ExecutionMode::AsyncBuiltinFunc);
    }

    Ok(ExecutionMode::AsyncUnknown)
}
