//! Persistence codec for residual async contexts.
//!
//! A context that still holds groups after both sweeps is written under
//! `ASYNC_DATA_PREFIX ∥ prev_tx_hash` so that a later block, delivering a
//! cross-shard callback, can locate and restore the right continuation. The
//! value is a one-byte format version followed by a self-describing SBOR
//! payload; the encoding is deterministic, so encode∘decode is the identity
//! on stored bytes.

use crate::error::AsyncExecutionError;
use shardvm_types::{AsyncContext, Hash};

/// Prefix of every persisted async context key.
pub const ASYNC_DATA_PREFIX: &[u8] = b"async:";

/// Format version of the persisted value.
pub const CONTEXT_CODEC_VERSION: u8 = 1;

/// Storage key of the residual context for the given previous transaction.
pub fn context_storage_key(prev_tx_hash: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(ASYNC_DATA_PREFIX.len() + Hash::BYTES);
    key.extend_from_slice(ASYNC_DATA_PREFIX);
    key.extend_from_slice(prev_tx_hash.as_bytes());
    key
}

/// Serialize a residual context.
pub fn encode_async_context(context: &AsyncContext) -> Result<Vec<u8>, AsyncExecutionError> {
    let payload = sbor::basic_encode(context)
        .map_err(|error| AsyncExecutionError::PersistenceFailed(format!("{error:?}")))?;

    let mut value = Vec::with_capacity(1 + payload.len());
    value.push(CONTEXT_CODEC_VERSION);
    value.extend_from_slice(&payload);
    Ok(value)
}

/// Restore a residual context from its stored bytes.
pub fn decode_async_context(bytes: &[u8]) -> Result<AsyncContext, AsyncExecutionError> {
    let (version, payload) = bytes
        .split_first()
        .ok_or_else(|| AsyncExecutionError::PersistenceFailed("empty value".to_owned()))?;

    if *version != CONTEXT_CODEC_VERSION {
        return Err(AsyncExecutionError::PersistenceFailed(format!(
            "unsupported format version {version}"
        )));
    }

    sbor::basic_decode(payload)
        .map_err(|error| AsyncExecutionError::PersistenceFailed(format!("{error:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardvm_types::test_utils::{test_address, test_async_call, test_tx_hash};
    use shardvm_types::{AsyncCallStatus, ReturnCode};

    fn residual_context() -> AsyncContext {
        let mut context = AsyncContext::new(test_address(9));
        context.register_call(
            "batch",
            test_async_call(test_address(1), b"transfer@0a".to_vec())
                .with_provided_gas(100_000)
                .with_gas_locked(5_000)
                .with_callback("onTransfer"),
        );
        let mut resolved = test_async_call(test_address(2), b"swap@0b".to_vec());
        resolved.update_status(ReturnCode::UserError);
        context.register_call("other", resolved);
        context
    }

    #[test]
    fn test_storage_key_layout() {
        let prev_tx_hash = test_tx_hash(b"prev");
        let key = context_storage_key(&prev_tx_hash);
        assert!(key.starts_with(ASYNC_DATA_PREFIX));
        assert_eq!(&key[ASYNC_DATA_PREFIX.len()..], prev_tx_hash.as_bytes());
    }

    #[test]
    fn test_context_roundtrip() {
        let context = residual_context();
        let encoded = encode_async_context(&context).unwrap();
        let decoded = decode_async_context(&encoded).unwrap();
        assert_eq!(decoded, context);

        // Every field a later block needs survives the trip.
        let call = &decoded.groups[0].calls[0];
        assert_eq!(call.destination, test_address(1));
        assert_eq!(call.data, b"transfer@0a".to_vec());
        assert_eq!(call.provided_gas, 100_000);
        assert_eq!(call.gas_locked, 5_000);
        assert_eq!(call.callback_name, "onTransfer");
        assert_eq!(call.status, AsyncCallStatus::Pending);
        assert_eq!(
            decoded.groups[1].calls[0].status,
            AsyncCallStatus::ResolvedFailed
        );
    }

    #[test]
    fn test_stored_bytes_are_canonical() {
        // encode(decode(bytes)) == bytes for anything the driver produced.
        let encoded = encode_async_context(&residual_context()).unwrap();
        let reencoded = encode_async_context(&decode_async_context(&encoded).unwrap()).unwrap();
        assert_eq!(reencoded, encoded);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let mut encoded = encode_async_context(&residual_context()).unwrap();
        encoded[0] = CONTEXT_CODEC_VERSION + 1;
        assert!(matches!(
            decode_async_context(&encoded),
            Err(AsyncExecutionError::PersistenceFailed(_))
        ));
        assert!(matches!(
            decode_async_context(&[]),
            Err(AsyncExecutionError::PersistenceFailed(_))
        ));
    }
}
