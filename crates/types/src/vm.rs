//! VM execution surface types.
//!
//! These types cross the boundary between the async execution core and its
//! collaborators: the bytecode executor consumes `ContractCallInput` and
//! produces `VmOutput`; the outbound transfer queue consumes `OutputTransfer`.

use crate::{Address, Hash};
use num_bigint::BigUint;
use sbor::prelude::*;
use std::fmt;

/// Result code of a contract or built-in execution.
///
/// The variant order is part of the protocol: a code's integer value is its
/// position here, and callbacks receive that value as their first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BasicSbor)]
pub enum ReturnCode {
    /// Execution succeeded.
    Ok,
    /// The called function does not exist on the target contract.
    FunctionNotFound,
    /// The called function exists but its signature did not match.
    FunctionWrongSignature,
    /// No contract is deployed at the destination address.
    ContractNotFound,
    /// The contract signalled a user-level error.
    UserError,
    /// Execution ran out of gas.
    OutOfGas,
    /// Deployment collided with an existing account.
    AccountCollision,
    /// The caller's balance cannot cover the transferred value.
    OutOfFunds,
    /// The synchronous call stack exceeded its depth limit.
    CallStackOverflow,
    /// The contract bytecode is invalid.
    ContractInvalid,
    /// Execution failed for a reason not covered above.
    ExecutionFailed,
}

impl ReturnCode {
    /// Integer value of the code.
    pub fn as_u64(self) -> u64 {
        self as u64
    }

    /// Minimal big-endian byte encoding of the code's integer value.
    ///
    /// `Ok` encodes as the empty byte string: the minimal representation of
    /// zero has no digits. Callback argument lists depend on this.
    pub fn to_bytes(self) -> Vec<u8> {
        let value = self.as_u64();
        let bytes = value.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        bytes[first..].to_vec()
    }

    /// Human-readable message, used for finish frames.
    pub fn message(self) -> &'static str {
        match self {
            ReturnCode::Ok => "ok",
            ReturnCode::FunctionNotFound => "function not found",
            ReturnCode::FunctionWrongSignature => "wrong signature for function",
            ReturnCode::ContractNotFound => "contract not found",
            ReturnCode::UserError => "user error",
            ReturnCode::OutOfGas => "out of gas",
            ReturnCode::AccountCollision => "account collision",
            ReturnCode::OutOfFunds => "out of funds",
            ReturnCode::CallStackOverflow => "call stack overflow",
            ReturnCode::ContractInvalid => "contract invalid",
            ReturnCode::ExecutionFailed => "execution failed",
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// How a call entered the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BasicSbor)]
pub enum CallType {
    /// A direct user transaction.
    DirectCall,
    /// A child call dispatched asynchronously (possibly cross-shard).
    AsynchronousCall,
    /// The callback of a previously dispatched asynchronous call.
    AsynchronousCallback,
}

/// Output of one contract or built-in execution.
///
/// Produced by the bytecode executor; never null by contract, even when the
/// execution failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmOutput {
    /// Result code of the execution.
    pub return_code: ReturnCode,
    /// Ordered return values.
    pub return_data: Vec<Vec<u8>>,
    /// Human-readable message, populated on failure.
    pub return_message: String,
    /// Gas left over after the execution.
    pub gas_remaining: u64,
}

impl VmOutput {
    /// A successful output with no return values.
    pub fn ok(gas_remaining: u64) -> Self {
        Self {
            return_code: ReturnCode::Ok,
            return_data: Vec::new(),
            return_message: String::new(),
            gas_remaining,
        }
    }

    /// Check whether the execution succeeded.
    pub fn is_ok(&self) -> bool {
        self.return_code == ReturnCode::Ok
    }
}

/// Descriptor for one synchronous contract execution.
///
/// Built by the input builders for forward async calls and for their
/// callbacks, then handed to the execute-on-dest-context capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCallInput {
    /// Account initiating the call.
    pub caller: Address,
    /// Account being called.
    pub recipient: Address,
    /// Function to invoke on the recipient.
    pub function: String,
    /// Decoded call arguments.
    pub arguments: Vec<Vec<u8>>,
    /// Value transferred with the call.
    pub call_value: BigUint,
    /// How the call entered the VM.
    pub call_type: CallType,
    /// Gas price of the enclosing transaction.
    pub gas_price: u64,
    /// Gas made available to the callee.
    pub gas_provided: u64,
    /// Hash of the transaction currently executing.
    pub current_tx_hash: Hash,
    /// Hash of the transaction that originated the call chain.
    pub original_tx_hash: Hash,
    /// Hash of the previous transaction in the call chain.
    pub prev_tx_hash: Hash,
}

/// An outbound cross-shard transfer record.
///
/// Appended to the current output for every async call that must be
/// transported to a remote shard by the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTransfer {
    /// Receiving account on the remote shard.
    pub destination: Address,
    /// Sending contract.
    pub sender: Address,
    /// Gas carried for the remote execution.
    pub gas_limit: u64,
    /// Gas reserved for the eventual callback.
    pub gas_locked: u64,
    /// Value transferred.
    pub value: BigUint,
    /// Raw call data.
    pub data: Vec<u8>,
    /// How the remote execution will enter the VM.
    pub call_type: CallType,
}

/// Gas costs consumed by the async call machinery.
///
/// All tuning of the execution core flows from this schedule; there is no
/// other configuration surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasSchedule {
    /// Flat fee charged for each async call dispatch and each callback.
    pub async_call_step: u64,
    /// Per-byte fee for copying callback data.
    pub data_copy_per_byte: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            async_call_step: 100_000,
            data_copy_per_byte: 50,
        }
    }
}

/// How one async call will be executed.
///
/// Derived from topology and target kind; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Destination is in the caller's shard: execute in place.
    SyncExecution,
    /// Destination is remote but the function is a protocol built-in:
    /// execute locally, letting the built-in emit its own cross-shard output.
    AsyncBuiltinFunc,
    /// Destination is remote and unknown: forward across shards.
    AsyncUnknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_code_minimal_bytes() {
        // Zero has no digits in the minimal big-endian form.
        assert!(ReturnCode::Ok.to_bytes().is_empty());
        assert_eq!(ReturnCode::UserError.to_bytes(), vec![4]);
        assert_eq!(ReturnCode::ExecutionFailed.to_bytes(), vec![10]);
    }

    #[test]
    fn test_return_code_messages() {
        assert_eq!(ReturnCode::Ok.to_string(), "ok");
        assert_eq!(ReturnCode::OutOfGas.to_string(), "out of gas");
    }

    #[test]
    fn test_vm_output_ok() {
        let output = VmOutput::ok(500);
        assert!(output.is_ok());
        assert_eq!(output.gas_remaining, 500);
        assert!(output.return_data.is_empty());
    }
}
