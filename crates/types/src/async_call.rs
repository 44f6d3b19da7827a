//! Async calls and call groups.

use crate::{Address, ReturnCode};
use sbor::prelude::*;

/// Identifier of the group that collects calls made through the single-call
/// API. It carries no group callback and is always deleted before the
/// residual context is persisted.
pub const LEGACY_ASYNC_CALL_GROUP_ID: &str = "legacy";

/// Resolution status of one async call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub enum AsyncCallStatus {
    /// Not yet resolved; still owned by its group.
    Pending,
    /// Resolved with `ReturnCode::Ok`.
    ResolvedOk,
    /// Resolved with a non-`Ok` return code.
    ResolvedFailed,
}

/// One child invocation scheduled by a contract.
///
/// The destination may live on any shard; the data field carries the encoded
/// function name and argument list. Once the status leaves `Pending` the call
/// must be pruned from its group before the next sweep.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct AsyncCall {
    /// Destination account.
    pub destination: Address,
    /// Encoded function name and arguments.
    pub data: Vec<u8>,
    /// Transferred value as big-endian bytes (empty means zero).
    pub value_bytes: Vec<u8>,
    /// Gas requested by the contract developer (zero means "share the rest").
    pub provided_gas: u64,
    /// Gas limit assigned by the gas allocator.
    pub gas_limit: u64,
    /// Gas reserved at dispatch time to pay for the eventual callback.
    pub gas_locked: u64,
    /// Contract function invoked with the call's result.
    pub callback_name: String,
    /// Resolution status.
    pub status: AsyncCallStatus,
}

impl AsyncCall {
    /// Create a pending call with no gas assignment and no callback.
    pub fn new(destination: Address, data: Vec<u8>, value_bytes: Vec<u8>) -> Self {
        Self {
            destination,
            data,
            value_bytes,
            provided_gas: 0,
            gas_limit: 0,
            gas_locked: 0,
            callback_name: String::new(),
            status: AsyncCallStatus::Pending,
        }
    }

    /// Set the callback function name.
    pub fn with_callback(mut self, callback_name: impl Into<String>) -> Self {
        self.callback_name = callback_name.into();
        self
    }

    /// Set the developer-requested gas.
    pub fn with_provided_gas(mut self, provided_gas: u64) -> Self {
        self.provided_gas = provided_gas;
        self
    }

    /// Set the gas locked for the eventual callback.
    pub fn with_gas_locked(mut self, gas_locked: u64) -> Self {
        self.gas_locked = gas_locked;
        self
    }

    /// Whether the call has not yet been resolved.
    pub fn is_pending(&self) -> bool {
        self.status == AsyncCallStatus::Pending
    }

    /// Resolve the call from the return code of its forward execution.
    pub fn update_status(&mut self, return_code: ReturnCode) {
        self.status = if return_code == ReturnCode::Ok {
            AsyncCallStatus::ResolvedOk
        } else {
            AsyncCallStatus::ResolvedFailed
        };
    }
}

/// Narrow read capability over a dispatchable call.
///
/// Satisfied by the full `AsyncCall` record and by any leaner handle a host
/// may carry; the cross-shard emitter and the forward input builder only need
/// this view.
pub trait AsyncCallHandle {
    /// Destination account.
    fn destination(&self) -> &Address;
    /// Encoded function name and arguments.
    fn data(&self) -> &[u8];
    /// Transferred value as big-endian bytes.
    fn value_bytes(&self) -> &[u8];
    /// Assigned gas limit.
    fn gas_limit(&self) -> u64;
    /// Gas reserved for the eventual callback.
    fn gas_locked(&self) -> u64;
    /// Callback function name (possibly empty).
    fn callback_name(&self) -> &str;
}

impl AsyncCallHandle for AsyncCall {
    fn destination(&self) -> &Address {
        &self.destination
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn value_bytes(&self) -> &[u8] {
        &self.value_bytes
    }

    fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    fn gas_locked(&self) -> u64 {
        self.gas_locked
    }

    fn callback_name(&self) -> &str {
        &self.callback_name
    }
}

/// An ordered batch of async calls sharing a caller-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct AsyncCallGroup {
    /// Caller-assigned group identifier, unique within its context.
    pub identifier: String,
    /// Contract function invoked when the whole group resolves, if any.
    pub callback_name: Option<String>,
    /// Calls in dispatch order.
    pub calls: Vec<AsyncCall>,
}

impl AsyncCallGroup {
    /// Create an empty group.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            callback_name: None,
            calls: Vec::new(),
        }
    }

    /// Append a call, preserving dispatch order.
    pub fn push_call(&mut self, call: AsyncCall) {
        self.calls.push(call);
    }

    /// A group is completed iff every call has left the `Pending` status.
    pub fn is_completed(&self) -> bool {
        self.calls.iter().all(|call| !call.is_pending())
    }

    /// Remove resolved calls, keeping pending ones in order.
    pub fn delete_completed_calls(&mut self) {
        self.calls.retain(|call| call.is_pending());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_address, test_async_call};

    #[test]
    fn test_update_status_from_return_code() {
        let mut call = test_async_call(test_address(1), b"f".to_vec());
        assert!(call.is_pending());

        call.update_status(ReturnCode::Ok);
        assert_eq!(call.status, AsyncCallStatus::ResolvedOk);

        call.update_status(ReturnCode::UserError);
        assert_eq!(call.status, AsyncCallStatus::ResolvedFailed);
    }

    #[test]
    fn test_group_completion_and_pruning() {
        let mut group = AsyncCallGroup::new("batch");
        group.push_call(test_async_call(test_address(1), b"a".to_vec()));
        group.push_call(test_async_call(test_address(2), b"b".to_vec()));
        assert!(!group.is_completed());

        group.calls[0].update_status(ReturnCode::Ok);
        assert!(!group.is_completed());

        group.delete_completed_calls();
        assert_eq!(group.calls.len(), 1);
        assert_eq!(group.calls[0].data, b"b".to_vec());

        group.calls[0].update_status(ReturnCode::UserError);
        assert!(group.is_completed());
        group.delete_completed_calls();
        assert!(group.calls.is_empty());
        assert!(group.is_completed());
    }

    #[test]
    fn test_handle_view_matches_record() {
        let call = test_async_call(test_address(3), b"fn@01".to_vec()).with_callback("onDone");
        let handle: &dyn AsyncCallHandle = &call;
        assert_eq!(handle.destination(), &test_address(3));
        assert_eq!(handle.data(), b"fn@01");
        assert_eq!(handle.callback_name(), "onDone");
        assert_eq!(handle.gas_limit(), 0);
    }
}
