//! Account addressing and shard identifiers.

use sbor::prelude::*;
use std::fmt;

/// A 32-byte smart-contract account address.
///
/// Addresses are opaque to the execution core; the shard oracle is the only
/// component that assigns meaning to their contents.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct Address([u8; 32]);

impl Address {
    /// Create an address from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Identifier of a shard.
///
/// Addresses are statically assigned to shards by the shard oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct ShardId(pub u32);
