//! Integration tests for contract creation.

#[cfg(test)]
mod integration_tests {
    use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
    use sleipnir_common::utils::strings::decode_hex;
    use sleipnir_config::{ChainConfig, ExecutionConfig};
    use sleipnir_vm::{
        core::{
            context::ExecutionContext,
            contract::AccountRef,
            state::{Account, InMemoryState},
        },
        Error,
    };

    const CREATOR: Address = Address::repeat_byte(0xc0);
    const FACTORY: Address = Address::repeat_byte(0xfa);

    /// Returns 42 as a 32 byte word.
    const RUNTIME: &str = "602a60005260206000f3";

    fn code(hex: &str) -> Bytes {
        decode_hex(hex).expect("invalid bytecode").into()
    }

    /// Init code that copies the 10 byte runtime appended to it and returns it.
    fn init_code() -> Bytes {
        // CODECOPY(0, 12, 10) RETURN(0, 10)
        code(&format!("600a600c600039600a6000f3{RUNTIME}"))
    }

    fn genesis() -> InMemoryState {
        let mut state = InMemoryState::new();
        state.insert_account(CREATOR, Account::with_balance(U256::from(1_000_000)));
        // CALLDATACOPY the init code, CREATE with it and return the new address
        state.insert_account(
            FACTORY,
            Account::with_code(code("3660006000373660006000f060005260206000f3")),
        );
        state
    }

    #[test]
    fn test_init_code_output_is_deployed() {
        let mut state = genesis();
        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());
        let creator = AccountRef::new(CREATOR);

        let result = ctx.create(&creator, init_code(), 1_000_000, U256::from(7));
        assert!(result.is_success(), "{result:?}");
        assert_eq!(result.address, CREATOR.create(0));
        assert_eq!(result.output, code(RUNTIME));
        assert!(result.gas_left < 1_000_000);

        assert_eq!(ctx.state().code(result.address), code(RUNTIME));
        assert_eq!(ctx.state().nonce(CREATOR), 1);
        assert_eq!(ctx.state().nonce(result.address), 1);
        assert_eq!(ctx.state().balance(result.address), U256::from(7));

        let call = ctx.call(&creator, result.address, Bytes::new(), 100_000, U256::ZERO);
        assert!(call.is_success());
        assert_eq!(U256::from_be_slice(&call.output), U256::from(42));
    }

    #[test]
    fn test_create_opcode_deploys_through_dispatcher() {
        let mut state = genesis();
        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());

        let result =
            ctx.call(&AccountRef::new(CREATOR), FACTORY, init_code(), 1_000_000, U256::ZERO);
        assert!(result.is_success(), "{result:?}");

        let created = Address::from_word(B256::from_slice(&result.output));
        assert_eq!(created, FACTORY.create(0));
        assert_eq!(ctx.state().code(created), code(RUNTIME));
        assert_eq!(ctx.state().nonce(FACTORY), 1);
    }

    #[test]
    fn test_create2_address_depends_on_salt() {
        let mut state = genesis();
        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());
        let creator = AccountRef::new(CREATOR);

        let first = ctx.create2(&creator, init_code(), 1_000_000, U256::ZERO, U256::from(1));
        let second = ctx.create2(&creator, init_code(), 1_000_000, U256::ZERO, U256::from(2));
        assert!(first.is_success() && second.is_success());
        assert_ne!(first.address, second.address);
        assert_eq!(
            first.address,
            CREATOR.create2(B256::from(U256::from(1).to_be_bytes::<32>()), keccak256(init_code()))
        );

        // the same inputs against a fresh state derive the same address
        let mut fresh = genesis();
        let mut ctx =
            ExecutionContext::new(&mut fresh, ChainConfig::default(), ExecutionConfig::default());
        let again = ctx.create2(&creator, init_code(), 1_000_000, U256::ZERO, U256::from(1));
        assert_eq!(again.address, first.address);
    }

    #[test]
    fn test_create2_collision() {
        let mut state = genesis();
        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());
        let creator = AccountRef::new(CREATOR);

        let first = ctx.create2(&creator, init_code(), 1_000_000, U256::ZERO, U256::ZERO);
        assert!(first.is_success());

        let second = ctx.create2(&creator, init_code(), 1_000_000, U256::ZERO, U256::ZERO);
        assert_eq!(second.error, Some(Error::AddressCollision));
        assert_eq!(second.address, first.address);
        assert_eq!(second.gas_left, 0);
        // the nonce is still consumed
        assert_eq!(ctx.state().nonce(CREATOR), 2);
    }

    #[test]
    fn test_empty_init_code_deploys_nothing() {
        let mut state = genesis();
        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());

        let result = ctx.create(&AccountRef::new(CREATOR), Bytes::new(), 50_000, U256::ZERO);
        assert!(result.is_success());
        assert_eq!(result.gas_left, 50_000);
        assert!(ctx.state().code(result.address).is_empty());
        assert!(ctx.state().exists(result.address));
    }

    #[test]
    fn test_deposit_failures() {
        let mut state = genesis();
        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());
        let creator = AccountRef::new(CREATOR);

        // MSTORE8(0, 0xef) RETURN(0, 1)
        let result = ctx.create(&creator, code("60ef60005360016000f3"), 100_000, U256::from(5));
        assert_eq!(result.error, Some(Error::InvalidCodePrefix));
        assert_eq!(result.gas_left, 0);
        assert!(!ctx.state().exists(result.address));
        assert_eq!(ctx.state().balance(CREATOR), U256::from(1_000_000));

        // RETURN(0, 24577)
        let result = ctx.create(&creator, code("6160016000f3"), 100_000, U256::ZERO);
        assert_eq!(result.error, Some(Error::MaxCodeSizeExceeded));
        assert!(ctx.state().code(result.address).is_empty());

        // RETURN(0, 10) with too little gas left for the deposit
        let result = ctx.create(&creator, init_code(), 1_500, U256::ZERO);
        assert_eq!(result.error, Some(Error::InsufficientGas));
        assert_eq!(result.gas_left, 0);
    }

    #[test]
    fn test_reverting_init_code_returns_data_and_gas() {
        let mut state = genesis();
        let mut ctx =
            ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());

        // MSTORE8(0, 0x01) REVERT(0, 1)
        let init_code = code("600160005360016000fd");
        let result = ctx.create(&AccountRef::new(CREATOR), init_code, 100_000, U256::ZERO);
        assert_eq!(result.error, Some(Error::Revert(Bytes::from_static(&[0x01]))));
        assert!(result.gas_left > 0 && result.gas_left < 100_000);
        assert!(!ctx.state().exists(result.address));
    }
}
