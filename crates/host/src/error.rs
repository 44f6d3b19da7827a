//! Errors surfaced by the async call execution core.

use shardvm_calldata::CallDataError;
use thiserror::Error;

/// Failure of an outbound cross-shard transfer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The sender's balance cannot cover the transfer.
    #[error("insufficient funds")]
    InsufficientFunds,
    /// The transfer was rejected for another reason.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Failure of a storage write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The write was rejected by the storage layer.
    #[error("storage write rejected: {0}")]
    WriteRejected(String),
}

/// Errors returned by the context driver and its components.
///
/// `NotEnoughGas`, `InvalidCallData`, `TransferFailed`, and
/// `PersistenceFailed` abort the current invocation. `CallbackSynthesisFailed`
/// is produced by the callback input builder; the per-call executor converts
/// it into a well-formed transaction outcome instead of unwinding, because the
/// forward call's result has already been applied.
#[derive(Debug, Error)]
pub enum AsyncExecutionError {
    /// Gas allocation, a dispatch step fee, or a callback fee cannot be paid.
    #[error("not enough gas")]
    NotEnoughGas,

    /// The call's data field could not be decoded.
    #[error("invalid call data: {0}")]
    InvalidCallData(#[from] CallDataError),

    /// The outbound cross-shard transfer was rejected. Terminal: all
    /// remaining gas is burned and the runtime is marked failed before this
    /// error surfaces.
    #[error("cross-shard transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// The residual async context could not be serialized or written.
    #[error("async context persistence failed: {0}")]
    PersistenceFailed(String),

    /// The callback input could not be paid for. The forward result is
    /// already applied; no callback runs.
    #[error("callback synthesis failed: not enough gas")]
    CallbackSynthesisFailed,
}
