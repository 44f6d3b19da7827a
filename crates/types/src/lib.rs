//! Core types for the sharded contract VM host.
//!
//! This crate provides the foundational types used by the asynchronous call
//! execution core:
//!
//! - **Primitives**: `Hash`, `Address`, `ShardId`
//! - **VM surface**: `ReturnCode`, `CallType`, `VmOutput`, `ContractCallInput`,
//!   `OutputTransfer`, `GasSchedule`
//! - **Async call model**: `AsyncCall`, `AsyncCallGroup`, `AsyncContext`,
//!   `ExecutionMode`, and the `AsyncCallHandle` read capability
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer. Types that
//! survive a block boundary (the async call aggregates) derive `BasicSbor` so
//! the residual context can be persisted in a self-describing encoding.

mod address;
mod async_call;
mod context;
mod hash;
mod vm;

pub use address::{Address, ShardId};
pub use async_call::{
    AsyncCall, AsyncCallGroup, AsyncCallHandle, AsyncCallStatus, LEGACY_ASYNC_CALL_GROUP_ID,
};
pub use context::AsyncContext;
pub use hash::Hash;
pub use vm::{
    CallType, ContractCallInput, ExecutionMode, GasSchedule, OutputTransfer, ReturnCode, VmOutput,
};

/// Test utilities.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;

    /// Create a test address from a seed byte.
    pub fn test_address(seed: u8) -> Address {
        Address::new([seed; 32])
    }

    /// Create a test transaction hash from seed bytes.
    pub fn test_tx_hash(seed: &[u8]) -> Hash {
        Hash::from_bytes(seed)
    }

    /// Create a pending async call with the given destination and data.
    pub fn test_async_call(destination: Address, data: Vec<u8>) -> AsyncCall {
        AsyncCall::new(destination, data, Vec::new())
    }
}
