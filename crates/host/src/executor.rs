//! The async call executor.
//!
//! Entered once per contract invocation, after the contract has registered
//! its child calls. The driver sweeps the context twice:
//!
//! 1. **Sync-only sweep**: every call that resolves in the caller's shard is
//!    executed in place, callback included, and pruned. Groups that empty out
//!    are deleted.
//! 2. **Dispatch sweep**: surviving calls either emit an outbound cross-shard
//!    transfer record (unknown remote targets) or execute locally while
//!    emitting cross-shard output themselves (remote built-ins).
//!
//! Whatever is still pending afterwards is persisted under a key derived from
//! the previous transaction hash, so a later block can resume the right
//! callback.
//!
//! The driver is mutually recursive with the host's synchronous execution
//! seam: a same-shard call may register its own async context inside the
//! nested contract, which runs a full nested instance of this driver. The gas
//! allocator always reads the live metering balance, which the nested
//! execution has already debited, so no extra coordination is needed.

use crate::error::AsyncExecutionError;
use crate::mode::determine_execution_mode;
use crate::traits::Host;
use crate::{gas, inputs, persist};
use num_bigint::BigUint;
use shardvm_types::{
    AsyncCall, AsyncCallGroup, AsyncCallHandle, AsyncContext, CallType, ExecutionMode,
    OutputTransfer, VmOutput, LEGACY_ASYNC_CALL_GROUP_ID,
};
use tracing::{debug, instrument, trace};

/// An unrecoverable callback failure, downgraded to a transaction outcome by
/// [`AsyncCallExecutor::finish_sync_execution`].
struct CallbackFailure {
    /// Output of the failed callback, when one was produced.
    output: Option<VmOutput>,
    /// Failure message.
    message: String,
}

/// Drives one async context through both sweeps.
pub struct AsyncCallExecutor<'h, H: Host> {
    host: &'h mut H,
}

impl<'h, H: Host> AsyncCallExecutor<'h, H> {
    /// Create an executor borrowing the host for the duration of one run.
    pub fn new(host: &'h mut H) -> Self {
        Self { host }
    }

    /// Execute the context: both sweeps, legacy-group cleanup, persistence.
    ///
    /// On success either every group resolved synchronously or the residue
    /// has been written to storage. On error the remainder of the current
    /// sweep is abandoned and the invocation unwinds.
    #[instrument(skip(self, context), fields(
        caller = ?context.caller,
        groups = context.groups.len(),
        calls = context.call_count()
    ))]
    pub fn execute_context(
        &mut self,
        context: &mut AsyncContext,
    ) -> Result<(), AsyncExecutionError> {
        if context.is_completed() {
            return Ok(());
        }

        gas::assign_gas_limits(self.host, context)?;

        // Sync-only sweep: resolve in place whatever the local shard can.
        let mut index = 0;
        while index < context.groups.len() {
            self.execute_group(&mut context.groups[index], true)?;
            if context.groups[index].is_completed() {
                context.groups.remove(index);
            } else {
                index += 1;
            }
        }

        // Gas freed by completed calls is re-apportioned before dispatch.
        gas::assign_gas_limits(self.host, context)?;

        // Dispatch sweep: cross-shard emission and remote built-ins.
        for group in context.groups.iter_mut() {
            self.execute_group(group, false)?;
        }

        // Single-call-API groups have no group callback and must not leave a
        // resumable entry behind; their calls are already either resolved or
        // turned into outbound transfer records.
        context.delete_group(LEGACY_ASYNC_CALL_GROUP_ID);

        self.save_context(context)
    }

    /// Execute every call of one group in order, then prune resolved calls.
    ///
    /// The group callback hook fires only when the group completes during
    /// the sync-only sweep; cross-shard survivors resolve in a later block.
    fn execute_group(
        &mut self,
        group: &mut AsyncCallGroup,
        sync_only: bool,
    ) -> Result<(), AsyncExecutionError> {
        for call in group.calls.iter_mut() {
            self.execute_call(call, sync_only)?;
        }

        group.delete_completed_calls();

        if sync_only && group.is_completed() {
            return self.execute_group_callback(group);
        }

        Ok(())
    }

    /// Drive one call through its state machine.
    fn execute_call(
        &mut self,
        call: &mut AsyncCall,
        sync_only: bool,
    ) -> Result<(), AsyncExecutionError> {
        let mode = determine_execution_mode(self.host, &call.destination, &call.data)?;

        match mode {
            ExecutionMode::SyncExecution => {
                let (output, error) = self.execute_sync_call(&*call)?;
                call.update_status(output.return_code);

                let callback_result =
                    self.execute_sync_callback(call, &output, error.as_deref());
                self.finish_sync_execution(callback_result);
                Ok(())
            }

            // Cross-shard modes wait for the dispatch sweep.
            _ if sync_only => Ok(()),

            ExecutionMode::AsyncBuiltinFunc => {
                // The built-in executes locally and emits its own cross-shard
                // output entries; no transfer record is appended here. On
                // success the status stays Pending, to be resolved when the
                // cross-shard leg returns in a later block.
                let (output, error) = self.execute_sync_call(&*call)?;
                if !output.is_ok() {
                    call.update_status(output.return_code);
                    let callback_result =
                        self.execute_sync_callback(call, &output, error.as_deref());
                    self.finish_sync_execution(callback_result);
                }
                Ok(())
            }

            ExecutionMode::AsyncUnknown => self.send_cross_shard(&*call),
        }
    }

    /// Execute the forward leg of a call in the destination's context.
    fn execute_sync_call(
        &mut self,
        call: &dyn AsyncCallHandle,
    ) -> Result<(VmOutput, Option<String>), AsyncExecutionError> {
        let input = inputs::forward_call_input(self.host, call)?;
        Ok(self.host.execute_on_dest_context(input))
    }

    /// Execute the callback of a resolved forward call.
    fn execute_sync_callback(
        &mut self,
        call: &AsyncCall,
        forward_output: &VmOutput,
        forward_error: Option<&str>,
    ) -> Result<VmOutput, CallbackFailure> {
        let input = match inputs::callback_input(self.host, call, forward_output, forward_error)
        {
            Ok(input) => input,
            Err(_) => {
                // The forward result is already applied; the unpayable
                // callback becomes a transaction outcome instead.
                return Err(CallbackFailure {
                    output: None,
                    message: AsyncExecutionError::CallbackSynthesisFailed.to_string(),
                });
            }
        };

        let (output, error) = self.host.execute_on_dest_context(input);
        match error {
            None => Ok(output),
            Some(message) => Err(CallbackFailure {
                output: Some(output),
                message,
            }),
        }
    }

    /// Convert an unrecoverable callback failure into a well-formed
    /// transaction outcome: zero the provided gas, publish the return
    /// message, and append exactly two finish frames — the stringified
    /// return code and the current transaction hash. A successful callback
    /// needs nothing here.
    fn finish_sync_execution(&mut self, result: Result<VmOutput, CallbackFailure>) {
        let failure = match result {
            Ok(_) => return,
            Err(failure) => failure,
        };

        debug!(message = %failure.message, "callback failed; publishing failure outcome");

        self.host.clear_gas_provided();

        let output = match failure.output {
            Some(output) => output,
            None => self.host.vm_output_on_error(&failure.message),
        };

        self.host.set_return_message(&output.return_message);
        self.host
            .finish(output.return_code.to_string().into_bytes());
        let current_tx_hash = self.host.current_tx_hash().as_bytes().to_vec();
        self.host.finish(current_tx_hash);
    }

    /// Append the outbound transfer record for an unknown remote target.
    ///
    /// A rejected transfer is terminal for the invocation: all remaining gas
    /// burns and the runtime is marked failed before the error surfaces.
    fn send_cross_shard(
        &mut self,
        call: &dyn AsyncCallHandle,
    ) -> Result<(), AsyncExecutionError> {
        let transfer = OutputTransfer {
            destination: *call.destination(),
            sender: *self.host.contract_address(),
            gas_limit: call.gas_limit(),
            gas_locked: call.gas_locked(),
            value: BigUint::from_bytes_be(call.value_bytes()),
            data: call.data().to_vec(),
            call_type: CallType::AsynchronousCall,
        };

        trace!(destination = ?transfer.destination, gas = transfer.gas_limit, "emitting cross-shard call");

        if let Err(error) = self.host.transfer(transfer) {
            let gas_left = self.host.gas_left();
            self.host.use_gas(gas_left);
            self.host.fail_execution(&error.to_string());
            return Err(AsyncExecutionError::TransferFailed(error));
        }

        Ok(())
    }

    /// Reserved hook for the group-level callback.
    ///
    /// Neither its gas budget nor its argument contract is defined yet, so
    /// the hook performs no work and reports success.
    fn execute_group_callback(
        &mut self,
        group: &AsyncCallGroup,
    ) -> Result<(), AsyncExecutionError> {
        trace!(group = %group.identifier, "group completed; group callback is reserved");
        Ok(())
    }

    /// Persist the residual context, if any groups remain.
    fn save_context(&mut self, context: &AsyncContext) -> Result<(), AsyncExecutionError> {
        if context.is_completed() {
            return Ok(());
        }

        let key = persist::context_storage_key(self.host.prev_tx_hash());
        let value = persist::encode_async_context(context)?;

        debug!(
            groups = context.groups.len(),
            calls = context.call_count(),
            key = %hex_prefix(&key),
            "persisting residual async context"
        );

        self.host
            .set_storage(&key, &value)
            .map_err(|error| AsyncExecutionError::PersistenceFailed(error.to_string()))?;

        Ok(())
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    let head = &bytes[..bytes.len().min(8)];
    head.iter().map(|b| format!("{b:02x}")).collect()
}
