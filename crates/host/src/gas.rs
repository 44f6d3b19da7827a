//! Gas allocation across pending async calls.

use crate::error::AsyncExecutionError;
use crate::traits::Host;
use shardvm_types::AsyncContext;

/// Assign a gas limit to every pending call in the context.
///
/// Calls with developer-provided gas get exactly that amount; the remaining
/// metering balance is split evenly (integer division, remainder discarded)
/// among the calls that provided none. Runs before each sweep: the balance
/// observed here already reflects whatever earlier sweeps consumed or
/// refunded, so unspent gas from same-shard completions flows to the
/// survivors before cross-shard dispatch.
///
/// Fails with `NotEnoughGas` when the provided amounts exceed the balance
/// (overflow included) or when nothing would be left for a zero-gas call.
pub(crate) fn assign_gas_limits<H: Host>(
    host: &H,
    context: &mut AsyncContext,
) -> Result<(), AsyncExecutionError> {
    let gas_left = host.gas_left();
    let mut gas_needed = 0u64;
    let mut calls_with_zero_gas = 0u64;

    for group in context.groups.iter_mut() {
        for call in group.calls.iter_mut() {
            gas_needed = gas_needed
                .checked_add(call.provided_gas)
                .ok_or(AsyncExecutionError::NotEnoughGas)?;
            if gas_needed > gas_left {
                return Err(AsyncExecutionError::NotEnoughGas);
            }

            if call.provided_gas == 0 {
                calls_with_zero_gas += 1;
                continue;
            }

            call.gas_limit = call.provided_gas;
        }
    }

    if calls_with_zero_gas == 0 {
        return Ok(());
    }

    // Strict: an exactly exhausted balance leaves nothing for zero-gas calls.
    if gas_left <= gas_needed {
        return Err(AsyncExecutionError::NotEnoughGas);
    }

    let gas_share = (gas_left - gas_needed) / calls_with_zero_gas;
    for group in context.groups.iter_mut() {
        for call in group.calls.iter_mut() {
            if call.provided_gas == 0 {
                call.gas_limit = gas_share;
            }
        }
    }

    Ok(())
}

/// Length the data field would have, were the callback rendered in the
/// canonical flat form `callback@arg1@arg2…`.
///
/// One separator is counted per argument. Callers depend on the resulting
/// gas charge, so the formula is part of the protocol surface.
pub(crate) fn callback_data_length(function: &str, arguments: &[Vec<u8>]) -> usize {
    let separators = arguments.len();
    let payload: usize = arguments.iter().map(|argument| argument.len()).sum();
    function.len() + separators + payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHost;
    use shardvm_types::test_utils::{test_address, test_async_call};
    use shardvm_types::AsyncContext;

    fn context_with_gas(amounts: &[u64]) -> AsyncContext {
        let mut context = AsyncContext::new(test_address(9));
        for (i, &provided) in amounts.iter().enumerate() {
            let call = test_async_call(test_address(i as u8), b"f".to_vec())
                .with_provided_gas(provided);
            context.register_call("batch", call);
        }
        context
    }

    fn limits(context: &AsyncContext) -> Vec<u64> {
        context.groups[0]
            .calls
            .iter()
            .map(|call| call.gas_limit)
            .collect()
    }

    #[test]
    fn test_provided_gas_is_honored() {
        let host = TestHost::new().with_gas_left(1_000);
        let mut context = context_with_gas(&[300, 700]);
        assign_gas_limits(&host, &mut context).unwrap();
        assert_eq!(limits(&context), vec![300, 700]);
    }

    #[test]
    fn test_residual_split_discards_remainder() {
        let host = TestHost::new().with_gas_left(1_000);
        let mut context = context_with_gas(&[0, 0, 301]);
        assign_gas_limits(&host, &mut context).unwrap();
        // (1000 - 301) / 2 = 349, remainder 1 discarded.
        assert_eq!(limits(&context), vec![349, 349, 301]);
        let total: u64 = limits(&context).iter().sum();
        assert!(total <= 1_000, "allocator must never over-commit");
    }

    #[test]
    fn test_provided_exceeding_balance_fails() {
        let host = TestHost::new().with_gas_left(1_000);
        let mut context = context_with_gas(&[1_001]);
        assert!(matches!(
            assign_gas_limits(&host, &mut context),
            Err(AsyncExecutionError::NotEnoughGas)
        ));
    }

    #[test]
    fn test_exact_balance_with_zero_gas_call_fails() {
        // The provided amounts consume the whole balance; the zero-gas call
        // would get nothing, which is a failure by definition.
        let host = TestHost::new().with_gas_left(1_000);
        let mut context = context_with_gas(&[1_000, 0]);
        assert!(matches!(
            assign_gas_limits(&host, &mut context),
            Err(AsyncExecutionError::NotEnoughGas)
        ));
    }

    #[test]
    fn test_accumulation_overflow_fails() {
        let host = TestHost::new().with_gas_left(u64::MAX);
        let mut context = context_with_gas(&[u64::MAX, u64::MAX]);
        assert!(matches!(
            assign_gas_limits(&host, &mut context),
            Err(AsyncExecutionError::NotEnoughGas)
        ));
    }

    #[test]
    fn test_data_length_counts_a_separator_per_argument() {
        // "cb" with no arguments: just the function name.
        assert_eq!(callback_data_length("cb", &[]), 2);
        // One empty argument still pays for its separator.
        assert_eq!(callback_data_length("cb", &[vec![]]), 3);
        // "cb@xx@yyy" → 2 + 2 + (2 + 3)
        assert_eq!(
            callback_data_length("cb", &[vec![1, 2], vec![3, 4, 5]]),
            9
        );
    }
}
