//! Integration tests for the frame dispatch boundary.

#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;

    use alloy::primitives::{Address, Bytes, U256};
    use sleipnir_common::utils::strings::{decode_hex, encode_hex};
    use sleipnir_config::{ChainConfig, ExecutionConfig};
    use sleipnir_vm::{
        core::{
            abort::AbortFlag,
            context::ExecutionContext,
            contract::{AccountRef, ContractRef},
            dispatch::{CallResult, DefaultDispatcher, DispatchLayer, FrameDispatcher},
            state::{Account, InMemoryState},
        },
        ext::layers::TracingLayer,
        Error,
    };

    const SENDER: Address = Address::repeat_byte(0x5e);
    const ENTRY: Address = Address::repeat_byte(0xe0);
    const SINK: Address = Address::repeat_byte(0xf1);

    fn code(hex: &str) -> Bytes {
        decode_hex(hex).expect("invalid bytecode").into()
    }

    /// Sends every `call` to a fixed address, whatever its target.
    #[derive(Debug)]
    struct Redirect {
        inner: Arc<dyn FrameDispatcher>,
        to: Address,
    }

    impl DispatchLayer for Redirect {
        fn inner(&self) -> &dyn FrameDispatcher {
            self.inner.as_ref()
        }

        fn call(
            &self,
            ctx: &mut ExecutionContext<'_>,
            caller: &dyn ContractRef,
            _to: Address,
            input: Bytes,
            gas: u64,
            value: U256,
        ) -> CallResult {
            self.inner.call(ctx, caller, self.to, input, gas, value)
        }
    }

    #[test]
    fn test_redirecting_dispatcher_observes_effects_only_at_fixed_address() {
        let target = Address::from_word(U256::from(0x100).to_be_bytes::<32>().into());

        let mut state = InMemoryState::new();
        state.insert_account(SENDER, Account::with_balance(U256::from(1_000)));
        // CALL 0x100 with no value and no data, then STOP
        state.insert_account(ENTRY, Account::with_code(code("600060006000600060006101005af100")));
        // SSTORE(0, 1)
        state.insert_account(target, Account::with_code(code("600160005500")));
        // SSTORE(0, 2)
        state.insert_account(SINK, Account::with_code(code("600260005500")));

        let dispatcher: Arc<dyn FrameDispatcher> =
            Arc::new(Redirect { inner: DefaultDispatcher::shared(), to: SINK });
        let mut ctx = ExecutionContext::with_dispatcher(
            &mut state,
            ChainConfig::default(),
            ExecutionConfig::default(),
            dispatcher,
            AbortFlag::new(),
        );

        let result =
            ctx.call(&AccountRef::new(SENDER), ENTRY, Bytes::new(), 1_000_000, U256::ZERO);
        assert!(result.is_success(), "{result:?}");
        assert_eq!(ctx.state().storage(SINK, U256::ZERO), U256::from(2));
        assert_eq!(ctx.state().storage(target, U256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_top_level_call_does_not_use_installed_dispatcher() {
        let mut state = InMemoryState::new();
        // SSTORE(0, 1)
        state.insert_account(ENTRY, Account::with_code(code("600160005500")));
        state.insert_account(SINK, Account::with_code(code("600260005500")));

        let dispatcher: Arc<dyn FrameDispatcher> =
            Arc::new(Redirect { inner: DefaultDispatcher::shared(), to: SINK });
        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());
        ctx.set_dispatcher(dispatcher);

        let result =
            ctx.call(&AccountRef::new(SENDER), ENTRY, Bytes::new(), 100_000, U256::ZERO);
        assert!(result.is_success());
        assert_eq!(ctx.state().storage(ENTRY, U256::ZERO), U256::from(1));
        assert_eq!(ctx.state().storage(SINK, U256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_insufficient_balance_leaves_balances_untouched() {
        let mut state = InMemoryState::new();
        state.insert_account(SENDER, Account::with_balance(U256::from(100)));
        state.insert_account(ENTRY, Account::with_code(code("00")));
        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());

        let result =
            ctx.call(&AccountRef::new(SENDER), ENTRY, Bytes::new(), 50_000, U256::from(200));
        assert_eq!(result.error, Some(Error::InsufficientBalance));
        assert_eq!(result.gas_left, 50_000);
        assert!(result.output.is_empty());
        assert_eq!(ctx.state().balance(SENDER), U256::from(100));
        assert_eq!(ctx.state().balance(ENTRY), U256::ZERO);

        let result = ctx.create(&AccountRef::new(SENDER), code("00"), 50_000, U256::from(200));
        assert_eq!(result.error, Some(Error::InsufficientBalance));
        assert_eq!(result.gas_left, 50_000);
        assert_eq!(ctx.state().nonce(SENDER), 0);
    }

    #[test]
    fn test_gas_left_bounds() {
        let mut state = InMemoryState::new();
        let success = Address::repeat_byte(0x01);
        let revert = Address::repeat_byte(0x02);
        let invalid = Address::repeat_byte(0x03);
        let out_of_gas = Address::repeat_byte(0x04);
        // PUSH1 0x01 POP STOP
        state.insert_account(success, Account::with_code(code("60015000")));
        // PUSH1 0x00 PUSH1 0x00 REVERT
        state.insert_account(revert, Account::with_code(code("60006000fd")));
        // PUSH1 0x01 INVALID
        state.insert_account(invalid, Account::with_code(code("6001fe")));
        // JUMPDEST PUSH1 0x00 JUMP
        state.insert_account(out_of_gas, Account::with_code(code("5b600056")));
        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());
        let sender = AccountRef::new(SENDER);

        let result = ctx.call(&sender, success, Bytes::new(), 10_000, U256::ZERO);
        assert!(result.is_success());
        assert_eq!(result.gas_left, 10_000 - 5);

        let result = ctx.call(&sender, revert, Bytes::new(), 10_000, U256::ZERO);
        assert_eq!(result.error, Some(Error::Revert(Bytes::new())));
        assert_eq!(result.gas_left, 10_000 - 6);

        let result = ctx.call(&sender, invalid, Bytes::new(), 10_000, U256::ZERO);
        assert_eq!(result.error, Some(Error::InvalidOpcode(0xfe)));
        assert_eq!(result.gas_left, 0);
        assert!(result.output.is_empty());

        let result = ctx.call(&sender, out_of_gas, Bytes::new(), 10_000, U256::ZERO);
        assert_eq!(result.error, Some(Error::InsufficientGas));
        assert_eq!(result.gas_left, 0);
    }

    #[test]
    fn test_nested_revert_data_reaches_caller() {
        let mut state = InMemoryState::new();
        let reverter = Address::repeat_byte(0x0f);
        // MSTORE(0, 0xdead) REVERT(30, 2)
        state.insert_account(reverter, Account::with_code(code("61dead6000526002601efd")));
        // CALL reverter, RETURNDATACOPY the revert data to 0 and return it
        let entry = format!(
            "6000600060006000600073{}5af150{}",
            hex_address(reverter),
            "3d600060003e3d6000f3"
        );
        state.insert_account(ENTRY, Account::with_code(code(&entry)));

        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());
        let result =
            ctx.call(&AccountRef::new(SENDER), ENTRY, Bytes::new(), 100_000, U256::ZERO);
        assert!(result.is_success(), "{result:?}");
        assert_eq!(result.output, Bytes::from_static(&[0xde, 0xad]));
    }

    #[test]
    fn test_tracing_layer_is_transparent() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("sleipnir_vm=debug"))
            .with_test_writer()
            .try_init();

        let mut state = InMemoryState::new();
        let callee = Address::repeat_byte(0x0c);
        // MSTORE8(0, 0x2a) RETURN(0, 1)
        state.insert_account(callee, Account::with_code(code("602a60005360016000f3")));
        // CALL callee with a 1 byte return buffer at 0, then RETURN(0, 1)
        let entry = format!("6001600060006000600073{}5af15060016000f3", hex_address(callee));
        state.insert_account(ENTRY, Account::with_code(code(&entry)));

        let dispatcher: Arc<dyn FrameDispatcher> = Arc::new(TracingLayer::default());
        let mut ctx = ExecutionContext::with_dispatcher(
            &mut state,
            ChainConfig::default(),
            ExecutionConfig::default(),
            dispatcher,
            AbortFlag::new(),
        );
        let result =
            ctx.call(&AccountRef::new(SENDER), ENTRY, Bytes::new(), 100_000, U256::ZERO);
        assert_eq!(result.output, Bytes::from_static(&[0x2a]));
    }

    fn hex_address(address: Address) -> String {
        encode_hex(address.as_slice())
    }
}
