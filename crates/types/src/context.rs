//! The per-invocation async context.

use crate::{Address, AsyncCall, AsyncCallGroup, LEGACY_ASYNC_CALL_GROUP_ID};
use sbor::prelude::*;

/// Root aggregate holding all async call groups of one contract invocation.
///
/// Created implicitly when a contract first registers an async call, mutated
/// by the host while the invocation runs, and destroyed when the driver either
/// resolves every group synchronously or persists the residue for a later
/// block. Groups are owned by the context and calls by their group; there are
/// no cross-references.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct AsyncContext {
    /// Address of the contract that scheduled the calls.
    pub caller: Address,
    /// Groups in registration order. Identifiers are unique.
    pub groups: Vec<AsyncCallGroup>,
}

impl AsyncContext {
    /// Create an empty context for the given contract.
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            groups: Vec::new(),
        }
    }

    /// A context is completed iff it holds no groups.
    pub fn is_completed(&self) -> bool {
        self.groups.is_empty()
    }

    /// Find a group by identifier.
    pub fn find_group(&self, identifier: &str) -> Option<&AsyncCallGroup> {
        self.groups
            .iter()
            .find(|group| group.identifier == identifier)
    }

    /// Find a group by identifier, mutably.
    pub fn find_group_mut(&mut self, identifier: &str) -> Option<&mut AsyncCallGroup> {
        self.groups
            .iter_mut()
            .find(|group| group.identifier == identifier)
    }

    /// Register a call under the given group, creating the group on first
    /// use. Group identifiers stay unique because registration is the only
    /// way a group comes into existence.
    pub fn register_call(&mut self, group_id: &str, call: AsyncCall) {
        if let Some(group) = self.find_group_mut(group_id) {
            group.push_call(call);
            return;
        }
        let mut group = AsyncCallGroup::new(group_id);
        group.push_call(call);
        self.groups.push(group);
    }

    /// Register a call made through the single-call API.
    pub fn register_legacy_call(&mut self, call: AsyncCall) {
        self.register_call(LEGACY_ASYNC_CALL_GROUP_ID, call);
    }

    /// Delete a group by identifier. Returns whether a group was removed.
    pub fn delete_group(&mut self, identifier: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|group| group.identifier != identifier);
        self.groups.len() != before
    }

    /// Total number of calls across all groups.
    pub fn call_count(&self) -> usize {
        self.groups.iter().map(|group| group.calls.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_address, test_async_call};

    #[test]
    fn test_register_creates_group_once() {
        let mut context = AsyncContext::new(test_address(9));
        context.register_call("batch", test_async_call(test_address(1), b"a".to_vec()));
        context.register_call("batch", test_async_call(test_address(2), b"b".to_vec()));
        context.register_call("other", test_async_call(test_address(3), b"c".to_vec()));

        assert_eq!(context.groups.len(), 2);
        assert_eq!(context.find_group("batch").unwrap().calls.len(), 2);
        assert_eq!(context.find_group("other").unwrap().calls.len(), 1);
    }

    #[test]
    fn test_legacy_registration_uses_reserved_group() {
        let mut context = AsyncContext::new(test_address(9));
        context.register_legacy_call(test_async_call(test_address(1), b"a".to_vec()));
        assert!(context.find_group(LEGACY_ASYNC_CALL_GROUP_ID).is_some());

        assert!(context.delete_group(LEGACY_ASYNC_CALL_GROUP_ID));
        assert!(context.is_completed());
        assert!(!context.delete_group(LEGACY_ASYNC_CALL_GROUP_ID));
    }

    #[test]
    fn test_groups_keep_registration_order() {
        let mut context = AsyncContext::new(test_address(9));
        for id in ["g2", "g0", "g1"] {
            context.register_call(id, test_async_call(test_address(1), b"x".to_vec()));
        }
        let order: Vec<_> = context
            .groups
            .iter()
            .map(|group| group.identifier.as_str())
            .collect();
        assert_eq!(order, vec!["g2", "g0", "g1"]);
    }
}
