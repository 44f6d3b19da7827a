//! Call input builders for forward async calls and their callbacks.

use crate::error::AsyncExecutionError;
use crate::gas::callback_data_length;
use crate::traits::Host;
use num_bigint::BigUint;
use shardvm_types::{AsyncCall, AsyncCallHandle, CallType, ContractCallInput, VmOutput};

/// Build the descriptor for a forward async call executed synchronously.
///
/// Charges the flat dispatch step fee against the call's assigned gas limit;
/// a limit that cannot strictly cover the fee is `NotEnoughGas`. The
/// transferred value is the big-endian decoding of the call's value bytes
/// (zero when empty), and the enclosing transaction's hashes pass through
/// untouched.
pub(crate) fn forward_call_input<H: Host>(
    host: &H,
    call: &dyn AsyncCallHandle,
) -> Result<ContractCallInput, AsyncExecutionError> {
    let parsed = host.parse_call_data(call.data())?;

    let step_fee = host.gas_schedule().async_call_step;
    let gas_limit = call.gas_limit();
    if gas_limit <= step_fee {
        return Err(AsyncExecutionError::NotEnoughGas);
    }

    Ok(ContractCallInput {
        caller: *host.contract_address(),
        recipient: *call.destination(),
        function: parsed.function,
        arguments: parsed.arguments,
        call_value: BigUint::from_bytes_be(call.value_bytes()),
        call_type: CallType::AsynchronousCall,
        gas_price: host.gas_price(),
        gas_provided: gas_limit - step_fee,
        current_tx_hash: *host.current_tx_hash(),
        original_tx_hash: *host.original_tx_hash(),
        prev_tx_hash: *host.prev_tx_hash(),
    })
}

/// Build the descriptor for the callback of a resolved forward call.
///
/// The first argument is always the forward return code in minimal
/// big-endian form. On success the forward return data follows in order; on
/// failure the single extra argument is the forward return message. The fee
/// is the dispatch step plus the per-byte copy cost of the canonical flat
/// rendering, paid from the forward call's remaining gas plus the gas locked
/// at dispatch time. Caller and callee are reversed and no value moves.
pub(crate) fn callback_input<H: Host>(
    host: &H,
    call: &AsyncCall,
    forward_output: &VmOutput,
    forward_error: Option<&str>,
) -> Result<ContractCallInput, AsyncExecutionError> {
    let mut arguments = vec![forward_output.return_code.to_bytes()];
    if forward_error.is_none() {
        arguments.extend(forward_output.return_data.iter().cloned());
    } else {
        arguments.push(forward_output.return_message.clone().into_bytes());
    }

    let schedule = host.gas_schedule();
    let data_length = callback_data_length(&call.callback_name, &arguments) as u64;
    let fee = schedule
        .async_call_step
        .saturating_add(schedule.data_copy_per_byte.saturating_mul(data_length));

    let available = forward_output.gas_remaining.saturating_add(call.gas_locked);
    if available <= fee {
        return Err(AsyncExecutionError::NotEnoughGas);
    }

    Ok(ContractCallInput {
        caller: call.destination,
        recipient: *host.contract_address(),
        function: call.callback_name.clone(),
        arguments,
        call_value: BigUint::from(0u32),
        call_type: CallType::AsynchronousCallback,
        gas_price: host.gas_price(),
        gas_provided: available - fee,
        current_tx_hash: *host.current_tx_hash(),
        original_tx_hash: *host.original_tx_hash(),
        prev_tx_hash: *host.prev_tx_hash(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestHost;
    use crate::traits::Runtime;
    use shardvm_calldata::CallDataBuilder;
    use shardvm_types::test_utils::{test_address, test_async_call};
    use shardvm_types::ReturnCode;

    // The test host schedule: step fee 1_000, copy fee 1/byte.

    fn call_to(destination_seed: u8, function: &str) -> AsyncCall {
        let data = CallDataBuilder::new(function).arg(&[0x2a]).into_bytes();
        test_async_call(test_address(destination_seed), data)
    }

    #[test]
    fn test_forward_input_fields() {
        let host = TestHost::new();
        let mut call = call_to(1, "transfer");
        call.value_bytes = vec![0x01, 0x00];
        call.gas_limit = 5_000;

        let input = forward_call_input(&host, &call).unwrap();
        assert_eq!(input.caller, *host.contract_address());
        assert_eq!(input.recipient, test_address(1));
        assert_eq!(input.function, "transfer");
        assert_eq!(input.arguments, vec![vec![0x2a]]);
        assert_eq!(input.call_value, BigUint::from(256u32));
        assert_eq!(input.call_type, CallType::AsynchronousCall);
        assert_eq!(input.gas_provided, 4_000);
        assert_eq!(input.prev_tx_hash, *host.prev_tx_hash());
    }

    #[test]
    fn test_forward_input_empty_value_is_zero() {
        let host = TestHost::new();
        let mut call = call_to(1, "f");
        call.gas_limit = 2_000;
        let input = forward_call_input(&host, &call).unwrap();
        assert_eq!(input.call_value, BigUint::from(0u32));
    }

    #[test]
    fn test_forward_input_step_fee_is_strict() {
        let host = TestHost::new();
        let mut call = call_to(1, "f");
        call.gas_limit = 1_000;
        assert!(matches!(
            forward_call_input(&host, &call),
            Err(AsyncExecutionError::NotEnoughGas)
        ));

        call.gas_limit = 1_001;
        let input = forward_call_input(&host, &call).unwrap();
        assert_eq!(input.gas_provided, 1);
    }

    #[test]
    fn test_callback_arguments_on_success() {
        let host = TestHost::new();
        let call = call_to(1, "f").with_callback("onDone");
        let forward_output = VmOutput {
            return_code: ReturnCode::Ok,
            return_data: vec![b"first".to_vec(), b"second".to_vec()],
            return_message: String::new(),
            gas_remaining: 10_000,
        };

        let input = callback_input(&host, &call, &forward_output, None).unwrap();
        assert_eq!(input.function, "onDone");
        // Ok encodes as the empty byte string.
        assert_eq!(
            input.arguments,
            vec![vec![], b"first".to_vec(), b"second".to_vec()]
        );
        assert_eq!(input.caller, test_address(1));
        assert_eq!(input.recipient, *host.contract_address());
        assert_eq!(input.call_type, CallType::AsynchronousCallback);
        assert_eq!(input.call_value, BigUint::from(0u32));

        // fee = 1000 + 1 * ("onDone" + 3 separators + 0 + 5 + 6 bytes) = 1020
        assert_eq!(input.gas_provided, 10_000 - 1_020);
    }

    #[test]
    fn test_callback_arguments_on_failure() {
        let host = TestHost::new();
        let call = call_to(1, "f").with_callback("onDone");
        let forward_output = VmOutput {
            return_code: ReturnCode::UserError,
            return_data: vec![b"ignored".to_vec()],
            return_message: "boom".to_owned(),
            gas_remaining: 10_000,
        };

        let input = callback_input(&host, &call, &forward_output, Some("boom")).unwrap();
        // Failure replaces the return data with the message.
        assert_eq!(input.arguments, vec![vec![4], b"boom".to_vec()]);
    }

    #[test]
    fn test_callback_fee_paid_from_remaining_plus_locked() {
        let host = TestHost::new();
        let mut call = call_to(1, "f").with_callback("cb");
        call.gas_locked = 1_000;
        let forward_output = VmOutput::ok(100);

        // fee = 1000 + 1 * ("cb" + 1 separator + 0 bytes) = 1003;
        // available = 100 + 1000 = 1100.
        let input = callback_input(&host, &call, &forward_output, None).unwrap();
        assert_eq!(input.gas_provided, 1_100 - 1_003);
    }

    #[test]
    fn test_callback_fee_is_strict() {
        let host = TestHost::new();
        let call = call_to(1, "f").with_callback("cb");
        // available == fee is still a failure.
        let forward_output = VmOutput::ok(1_003);
        assert!(matches!(
            callback_input(&host, &call, &forward_output, None),
            Err(AsyncExecutionError::NotEnoughGas)
        ));
    }
}
