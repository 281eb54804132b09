//! The per-execution context shared by every frame of one top-level call.

use std::{fmt, sync::Arc};

use alloy::primitives::{Address, Bytes, B256, U256};
use hashbrown::HashSet;
use sleipnir_config::{ChainConfig, ExecutionConfig};
use tracing::{debug, warn};

use super::{
    abort::AbortFlag,
    constants::CODE_DEPOSIT_GAS,
    contract::ContractRef,
    dispatch::{CallResult, CreateResult, DefaultDispatcher, FrameDispatcher},
    precompile::precompile,
    state::{Checkpoint, StateDb},
    vm::VM,
};
use crate::error::Error;

/// Block-level values readable by the `COINBASE`..`BLOBBASEFEE` opcodes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockContext {
    /// The block's beneficiary
    pub coinbase: Address,
    /// The block number
    pub number: u64,
    /// The block timestamp, in seconds
    pub timestamp: u64,
    /// The block gas limit
    pub gas_limit: u64,
    /// The base fee per gas
    pub base_fee: U256,
    /// The beacon chain randomness
    pub prevrandao: B256,
    /// The blob base fee
    pub blob_base_fee: U256,
}

/// Transaction-level values readable by the `ORIGIN`, `GASPRICE` and `BLOBHASH` opcodes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxContext {
    /// The externally-owned account that signed the transaction
    pub origin: Address,
    /// The effective gas price
    pub gas_price: U256,
    /// Versioned hashes of the transaction's blobs
    pub blob_hashes: Vec<B256>,
}

/// What a frame is about to execute, and on whose behalf.
#[derive(Clone, Debug)]
struct FrameInput {
    code_address: Address,
    address: Address,
    caller: Address,
    value: U256,
    input: Bytes,
    gas: u64,
}

/// The [`ExecutionContext`] owns everything the frames of one execution share: configuration,
/// the state database, block and transaction context, the current call depth, the read-only
/// flag, the installed [`FrameDispatcher`] and the [`AbortFlag`].
///
/// The six dispatch operations are available as methods here. These are the in-process
/// implementations: calling them directly (for example to start an execution) never goes
/// through the installed dispatcher, while every nested call made by running code does.
pub struct ExecutionContext<'a> {
    state: &'a mut dyn StateDb,

    /// Chain parameters
    pub chain: ChainConfig,

    /// Execution limits
    pub config: ExecutionConfig,

    /// Block-level values
    pub block: BlockContext,

    /// Transaction-level values
    pub tx: TxContext,

    depth: usize,
    read_only: bool,
    dispatcher: Arc<dyn FrameDispatcher>,
    abort: AbortFlag,

    accessed_addresses: HashSet<Address>,
    accessed_slots: HashSet<(Address, U256)>,
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("chain", &self.chain)
            .field("config", &self.config)
            .field("block", &self.block)
            .field("tx", &self.tx)
            .field("depth", &self.depth)
            .field("read_only", &self.read_only)
            .field("dispatcher", &self.dispatcher)
            .field("aborted", &self.abort.is_aborted())
            .finish_non_exhaustive()
    }
}

impl<'a> ExecutionContext<'a> {
    /// Creates a context with the [`DefaultDispatcher`] and a fresh [`AbortFlag`].
    pub fn new(state: &'a mut dyn StateDb, chain: ChainConfig, config: ExecutionConfig) -> Self {
        Self::with_dispatcher(state, chain, config, DefaultDispatcher::shared(), AbortFlag::new())
    }

    /// Creates a context with a custom dispatcher and a cancellation flag shared with a
    /// supervisor.
    ///
    /// ```
    /// use sleipnir_config::{ChainConfig, ExecutionConfig};
    /// use sleipnir_vm::core::{
    ///     abort::AbortFlag, context::ExecutionContext, dispatch::DefaultDispatcher,
    ///     state::InMemoryState,
    /// };
    ///
    /// let mut state = InMemoryState::new();
    /// let abort = AbortFlag::new();
    /// let ctx = ExecutionContext::with_dispatcher(
    ///     &mut state,
    ///     ChainConfig::default(),
    ///     ExecutionConfig::default(),
    ///     DefaultDispatcher::shared(),
    ///     abort.clone(),
    /// );
    ///
    /// abort.abort();
    /// assert!(ctx.is_aborted());
    /// ```
    pub fn with_dispatcher(
        state: &'a mut dyn StateDb,
        chain: ChainConfig,
        config: ExecutionConfig,
        dispatcher: Arc<dyn FrameDispatcher>,
        abort: AbortFlag,
    ) -> Self {
        Self {
            state,
            chain,
            config,
            block: BlockContext::default(),
            tx: TxContext::default(),
            depth: 0,
            read_only: false,
            dispatcher,
            abort,
            accessed_addresses: HashSet::new(),
            accessed_slots: HashSet::new(),
        }
    }

    /// Sets the block context.
    pub fn with_block(mut self, block: BlockContext) -> Self {
        self.block = block;
        self
    }

    /// Sets the transaction context.
    pub fn with_tx(mut self, tx: TxContext) -> Self {
        self.tx = tx;
        self
    }

    /// Replaces the installed dispatcher. Ignored once a frame is running.
    pub fn set_dispatcher(&mut self, dispatcher: Arc<dyn FrameDispatcher>) {
        if self.depth > 0 {
            warn!(depth = self.depth, "ignoring dispatcher change during execution");
            return;
        }
        self.dispatcher = dispatcher;
    }

    /// Replaces the cancellation flag. Ignored once a frame is running.
    pub fn set_abort_flag(&mut self, abort: AbortFlag) {
        if self.depth > 0 {
            warn!(depth = self.depth, "ignoring abort flag change during execution");
            return;
        }
        self.abort = abort;
    }

    /// Returns a handle to the installed dispatcher.
    pub fn dispatcher(&self) -> Arc<dyn FrameDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Returns the cancellation flag.
    pub fn abort_flag(&self) -> &AbortFlag {
        &self.abort
    }

    /// Returns true once the cancellation flag is set.
    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Returns the number of frames currently running.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns true while any enclosing frame is a static call.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Read access to the state database.
    pub fn state(&self) -> &dyn StateDb {
        &*self.state
    }

    /// Write access to the state database.
    pub fn state_mut(&mut self) -> &mut dyn StateDb {
        &mut *self.state
    }

    /// Marks `address` as accessed, returning true if it already was.
    pub fn warm_address(&mut self, address: Address) -> bool {
        !self.accessed_addresses.insert(address)
    }

    /// Marks a storage slot as accessed, returning true if it already was.
    pub fn warm_slot(&mut self, address: Address, key: U256) -> bool {
        !self.accessed_slots.insert((address, key))
    }

    /// Executes a message call to `to`, transferring `value` from the caller.
    pub fn call(
        &mut self,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult {
        self.in_transaction(|ctx| ctx.message_call(caller, to, input, gas, value))
    }

    /// Executes `to`'s code against the caller's own account.
    pub fn call_code(
        &mut self,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult {
        self.in_transaction(|ctx| ctx.code_call(caller, to, input, gas, value))
    }

    /// Executes `to`'s code against the caller's account, with the caller's own caller and
    /// value.
    pub fn delegate_call(
        &mut self,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        self.in_transaction(|ctx| ctx.delegated_call(caller, to, input, gas))
    }

    /// Executes `to`'s code with state mutations forbidden for the duration of the call.
    pub fn static_call(
        &mut self,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        self.in_transaction(|ctx| ctx.read_only_call(caller, to, input, gas))
    }

    fn message_call(
        &mut self,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult {
        if self.depth >= self.config.max_call_depth {
            return CallResult::failure(Error::MaxCallDepthExceeded, gas);
        }
        if self.read_only && !value.is_zero() {
            return CallResult::failure(Error::StaticContextViolation, 0);
        }

        let from = caller.address();
        if !self.state.can_transfer(from, value) {
            return CallResult::failure(Error::InsufficientBalance, gas);
        }

        let checkpoint = self.state.checkpoint();
        if !value.is_zero() {
            if let Err(e) = self.state.transfer(from, to, value) {
                self.state.revert_to(checkpoint);
                return CallResult::failure(e, gas);
            }
        }

        let result = self.run_frame(FrameInput {
            code_address: to,
            address: to,
            caller: from,
            value,
            input,
            gas,
        });
        self.settle(checkpoint, &result.error);
        result
    }

    fn code_call(
        &mut self,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult {
        if self.depth >= self.config.max_call_depth {
            return CallResult::failure(Error::MaxCallDepthExceeded, gas);
        }
        if self.read_only && !value.is_zero() {
            return CallResult::failure(Error::StaticContextViolation, 0);
        }

        let address = caller.address();
        if !self.state.can_transfer(address, value) {
            return CallResult::failure(Error::InsufficientBalance, gas);
        }

        let checkpoint = self.state.checkpoint();
        let result = self.run_frame(FrameInput {
            code_address: to,
            address,
            caller: address,
            value,
            input,
            gas,
        });
        self.settle(checkpoint, &result.error);
        result
    }

    fn delegated_call(
        &mut self,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        if self.depth >= self.config.max_call_depth {
            return CallResult::failure(Error::MaxCallDepthExceeded, gas);
        }

        let checkpoint = self.state.checkpoint();
        let result = self.run_frame(FrameInput {
            code_address: to,
            address: caller.address(),
            caller: caller.caller(),
            value: caller.value(),
            input,
            gas,
        });
        self.settle(checkpoint, &result.error);
        result
    }

    fn read_only_call(
        &mut self,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        if self.depth >= self.config.max_call_depth {
            return CallResult::failure(Error::MaxCallDepthExceeded, gas);
        }

        let checkpoint = self.state.checkpoint();
        let was_read_only = std::mem::replace(&mut self.read_only, true);
        let result = self.run_frame(FrameInput {
            code_address: to,
            address: to,
            caller: caller.address(),
            value: U256::ZERO,
            input,
            gas,
        });
        self.read_only = was_read_only;
        self.settle(checkpoint, &result.error);
        result
    }

    /// Creates a contract at `caller.create(nonce)`.
    pub fn create(
        &mut self,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
    ) -> CreateResult {
        let creator = caller.address();
        self.in_transaction(|ctx| {
            ctx.create_inner(caller, init_code, gas, value, |nonce, _| creator.create(nonce))
        })
    }

    /// Creates a contract at `caller.create2(salt, keccak256(init_code))`.
    pub fn create2(
        &mut self,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
        salt: U256,
    ) -> CreateResult {
        let creator = caller.address();
        let salt = B256::from(salt.to_be_bytes::<32>());
        self.in_transaction(|ctx| {
            ctx.create_inner(caller, init_code, gas, value, |_, code| {
                creator.create2_from_code(salt, code)
            })
        })
    }

    fn create_inner(
        &mut self,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
        derive: impl FnOnce(u64, &[u8]) -> Address,
    ) -> CreateResult {
        if self.depth >= self.config.max_call_depth {
            return CreateResult::failure(Error::MaxCallDepthExceeded, gas);
        }
        if self.read_only {
            return CreateResult::failure(Error::StaticContextViolation, 0);
        }

        let creator = caller.address();
        if !self.state.can_transfer(creator, value) {
            return CreateResult::failure(Error::InsufficientBalance, gas);
        }

        let nonce = self.state.nonce(creator);
        let Some(next_nonce) = nonce.checked_add(1) else {
            return CreateResult::failure(Error::NonceOverflow, gas);
        };
        self.state.set_nonce(creator, next_nonce);

        let address = derive(nonce, &init_code);
        self.warm_address(address);

        if self.state.nonce(address) != 0 || !self.state.code(address).is_empty() {
            debug!(%address, "creation address collision");
            return CreateResult {
                output: Bytes::new(),
                address,
                gas_left: 0,
                error: Some(Error::AddressCollision),
            };
        }

        let checkpoint = self.state.checkpoint();
        self.state.create_account(address);
        self.state.set_nonce(address, 1);
        if let Err(e) = self.state.transfer(creator, address, value) {
            self.state.revert_to(checkpoint);
            return CreateResult { output: Bytes::new(), address, gas_left: gas, error: Some(e) };
        }

        let mut result = self.run_init_code(address, creator, value, init_code, gas);
        if result.error.is_none() {
            if let Err(e) = self.deposit_code(address, &result.output, result.gas_left) {
                result = CallResult::failure(e, 0);
            } else {
                result.gas_left -= result.output.len() as u64 * CODE_DEPOSIT_GAS;
            }
        }

        self.settle(checkpoint, &result.error);
        CreateResult { output: result.output, address, gas_left: result.gas_left, error: result.error }
    }

    fn deposit_code(&mut self, address: Address, code: &Bytes, gas_left: u64) -> Result<(), Error> {
        if code.len() > self.config.max_code_size {
            return Err(Error::MaxCodeSizeExceeded);
        }
        if code.first() == Some(&0xef) {
            return Err(Error::InvalidCodePrefix);
        }
        if (code.len() as u64).saturating_mul(CODE_DEPOSIT_GAS) > gas_left {
            return Err(Error::InsufficientGas);
        }

        self.state.set_code(address, code.clone());
        Ok(())
    }

    fn run_init_code(
        &mut self,
        address: Address,
        caller: Address,
        value: U256,
        init_code: Bytes,
        gas: u64,
    ) -> CallResult {
        if init_code.is_empty() {
            return CallResult::success(Bytes::new(), gas);
        }

        let mut frame = Box::new(VM::new(init_code, Bytes::new(), address, caller, value, gas));
        self.enter(frame.as_mut())
    }

    /// Runs the code at `input.code_address` in a new frame, or the precompile living there.
    fn run_frame(&mut self, input: FrameInput) -> CallResult {
        self.warm_address(input.code_address);

        if let Some(precompile) = precompile(&input.code_address) {
            return match precompile.execute(&input.input, input.gas) {
                Ok((output, gas_left)) => CallResult::success(output, gas_left),
                Err(e) => CallResult::failure(e, 0),
            };
        }

        let code = self.state.code(input.code_address);
        if code.is_empty() {
            return CallResult::success(Bytes::new(), input.gas);
        }

        let mut frame = Box::new(VM::new(
            code,
            input.input,
            input.address,
            input.caller,
            input.value,
            input.gas,
        ));
        self.enter(frame.as_mut())
    }

    fn enter(&mut self, frame: &mut VM) -> CallResult {
        self.depth += 1;
        debug!(
            depth = self.depth,
            address = %frame.address,
            caller = %frame.caller,
            gas = frame.gas_remaining,
            read_only = self.read_only,
            "entering frame"
        );

        let outcome = frame.execute(self);

        self.depth -= 1;
        match &outcome {
            Ok(output) => debug!(depth = self.depth + 1, len = output.len(), "frame returned"),
            Err(e) => debug!(depth = self.depth + 1, error = %e, "frame failed"),
        }

        CallResult::from_outcome(outcome, frame.gas_remaining)
    }

    /// Runs `op`. When no frame is active, `op` is a whole transaction: once it returns, its
    /// changes become final and transient storage is cleared.
    fn in_transaction<R>(&mut self, op: impl FnOnce(&mut Self) -> R) -> R {
        if self.depth > 0 {
            return op(self);
        }

        let result = op(self);
        debug!("transaction finished");
        self.state.finalize();
        result
    }

    /// Commits or reverts the changes since `checkpoint`. Aborted executions are left as they
    /// are.
    fn settle(&mut self, checkpoint: Checkpoint, error: &Option<Error>) {
        match error {
            None => self.state.commit(checkpoint),
            Some(Error::ExecutionAborted) => {}
            Some(_) => self.state.revert_to(checkpoint),
        }
    }
}
