//! Asynchronous call execution core of the sharded contract VM host.
//!
//! When a contract invocation produces child calls, this crate decides how
//! each one executes, apportions gas among them, synthesizes callbacks from
//! their results, and persists whatever must survive into a later block:
//!
//! - same-shard calls execute synchronously, callback included;
//! - remote built-ins execute locally and emit their own cross-shard output;
//! - everything else becomes an outbound transfer record, and its logical
//!   continuation — the callback — runs when the protocol delivers the
//!   cross-shard result in a future block.
//!
//! # Architecture
//!
//! The core is single-threaded and cooperative. It consumes its
//! collaborators through the capability traits in [`traits`] and performs no
//! I/O of its own; "awaiting" a cross-shard result means persisting the
//! residual [`AsyncContext`](shardvm_types::AsyncContext) and returning.
//!
//! ```text
//! AsyncCallExecutor::execute_context
//!      │
//!      ├─ assign gas limits ──► sweep 1 (sync only) ──► prune groups
//!      ├─ assign gas limits ──► sweep 2 (dispatch)
//!      ├─ drop single-call-API group
//!      └─ persist residue under ASYNC_DATA_PREFIX ∥ prev_tx_hash
//! ```

#![warn(missing_docs)]

mod error;
mod executor;
mod gas;
mod inputs;
mod mode;
mod persist;
mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use error::{AsyncExecutionError, StorageError, TransferError};
pub use executor::AsyncCallExecutor;
pub use mode::determine_execution_mode;
pub use persist::{
    context_storage_key, decode_async_context, encode_async_context, ASYNC_DATA_PREFIX,
    CONTEXT_CODEC_VERSION,
};
pub use traits::{
    BuiltinRegistry, CallDataParser, ContextStorage, Host, Metering, OutputSink, Runtime,
    ShardOracle, SyncExecutor,
};
