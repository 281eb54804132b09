use alloy::primitives::{Address, Bytes, U256};
use tracing::warn;

#[cfg(feature = "step-tracing")]
use std::time::Instant;
#[cfg(feature = "step-tracing")]
use tracing::trace;

use crate::{
    core::{
        context::ExecutionContext,
        contract::ContractRef,
        opcodes::{self, OpCodeInfo},
    },
    error::{Error, Result},
};

use super::super::{
    constants::{COLD_ACCOUNT_ACCESS_GAS, COPY_WORD_GAS, WARM_ACCESS_GAS},
    memory::Memory,
    stack::Stack,
};

use super::{execution::Control, handlers};

/// The [`VM`] struct represents a single frame: one activation of code for a message call or a
/// contract creation. \
/// It contains the frame's [`Stack`], [`Memory`], program counter and gas, along with the
/// addresses and value the frame runs with. Everything shared between frames lives in the
/// [`ExecutionContext`] the frame is executed against.
#[derive(Clone, Debug)]
pub struct VM {
    /// The operand stack.
    pub stack: Stack,

    /// The frame's memory.
    pub memory: Memory,

    /// The program counter, as an index into [`VM::bytecode`].
    pub instruction: usize,

    /// The code being executed.
    pub bytecode: Bytes,

    /// Valid jump destinations, indexed by code offset.
    jumpdests: Vec<bool>,

    /// The input data provided to the frame.
    pub calldata: Bytes,

    /// The account whose storage and balance the frame acts on.
    pub address: Address,

    /// The account that invoked the frame.
    pub caller: Address,

    /// The value the frame was invoked with.
    pub value: U256,

    /// The amount of gas remaining for execution.
    pub gas_remaining: u64,

    /// The amount of gas used so far during execution.
    pub gas_used: u64,

    /// The data returned by the most recent nested call or creation.
    pub returndata: Bytes,

    /// The data this frame returns, set by `RETURN`.
    pub output: Bytes,

    /// Number of opcodes executed so far.
    pub operation_count: u64,

    /// The time when execution started (only available with step-tracing feature).
    #[cfg(feature = "step-tracing")]
    pub start_time: Instant,
}

impl ContractRef for VM {
    fn address(&self) -> Address {
        self.address
    }

    fn caller(&self) -> Address {
        self.caller
    }

    fn value(&self) -> U256 {
        self.value
    }
}

impl VM {
    /// Creates a new frame that runs `bytecode` with `calldata` on behalf of `caller`.
    ///
    /// ```
    /// use alloy::primitives::{Address, Bytes, U256};
    /// use sleipnir_vm::core::vm::VM;
    ///
    /// let vm = VM::new(
    ///     Bytes::from_static(&[0x00]),
    ///     Bytes::new(),
    ///     Address::repeat_byte(0x01),
    ///     Address::repeat_byte(0x02),
    ///     U256::ZERO,
    ///     100_000,
    /// );
    /// assert_eq!(vm.gas_remaining, 100_000);
    /// assert_eq!(vm.instruction, 0);
    /// ```
    pub fn new(
        bytecode: Bytes,
        calldata: Bytes,
        address: Address,
        caller: Address,
        value: U256,
        gas_limit: u64,
    ) -> VM {
        VM {
            stack: Stack::new(),
            memory: Memory::new(),
            instruction: 0,
            jumpdests: analyze_jumpdests(&bytecode),
            bytecode,
            calldata,
            address,
            caller,
            value,
            gas_remaining: gas_limit,
            gas_used: 0,
            returndata: Bytes::new(),
            output: Bytes::new(),
            operation_count: 0,
            #[cfg(feature = "step-tracing")]
            start_time: Instant::now(),
        }
    }

    /// Consume gas units, failing with [`Error::InsufficientGas`] and burning whatever is left
    /// if there isn't enough.
    ///
    /// ```
    /// use alloy::primitives::{Address, Bytes, U256};
    /// use sleipnir_vm::{core::vm::VM, Error};
    ///
    /// let mut vm = VM::new(Bytes::new(), Bytes::new(), Address::ZERO, Address::ZERO, U256::ZERO, 1000);
    ///
    /// vm.consume_gas(100).expect("out of gas");
    /// assert_eq!(vm.gas_remaining, 900);
    ///
    /// assert_eq!(vm.consume_gas(1000), Err(Error::InsufficientGas));
    /// assert_eq!(vm.gas_remaining, 0);
    /// assert_eq!(vm.gas_used, 1000);
    /// ```
    pub fn consume_gas(&mut self, amount: u64) -> Result<()> {
        if amount > self.gas_remaining {
            self.gas_used += self.gas_remaining;
            self.gas_remaining = 0;
            return Err(Error::InsufficientGas);
        }

        self.gas_remaining -= amount;
        self.gas_used += amount;
        Ok(())
    }

    /// Returns gas a nested frame didn't use.
    pub(crate) fn refund_gas(&mut self, amount: u64) {
        self.gas_remaining += amount;
        self.gas_used = self.gas_used.saturating_sub(amount);
    }

    /// Push a boolean value onto the stack
    pub(crate) fn push_boolean(&mut self, condition: bool) -> Result<()> {
        let value = if condition { U256::from(1u8) } else { U256::ZERO };
        self.stack.push(value)
    }

    /// Convert an address to U256
    pub(crate) fn address_to_u256(address: &Address) -> U256 {
        U256::from_be_bytes(address.into_word().0)
    }

    /// Convert the low 20 bytes of a word to an address
    pub(crate) fn u256_to_address(value: U256) -> Address {
        Address::from_word(value.to_be_bytes::<32>().into())
    }

    /// Returns true if `destination` is a `JUMPDEST` outside of push data.
    pub(crate) fn is_valid_jump(&self, destination: usize) -> bool {
        self.jumpdests.get(destination).copied().unwrap_or(false)
    }

    /// Safely copy data from source with bounds checking
    pub(crate) fn safe_copy_data(source: &[u8], offset: usize, size: usize) -> Vec<u8> {
        let end_offset = offset.saturating_add(size).min(source.len());
        let mut value = source.get(offset..end_offset).unwrap_or(&[]).to_owned();
        if value.len() < size {
            value.resize(size, 0u8);
        }
        value
    }

    /// Charges for and performs the memory expansion needed to access `size` bytes at
    /// `offset`, returning both as `usize`. A zero `size` never expands and ignores `offset`.
    pub(crate) fn expand_memory(&mut self, offset: U256, size: U256) -> Result<(usize, usize)> {
        if size.is_zero() {
            return Ok((0, 0));
        }

        // anything past 4 GiB can never be paid for
        let (Ok(offset), Ok(size)) = (u32::try_from(offset), u32::try_from(size)) else {
            self.consume_gas(u64::MAX)?;
            return Err(Error::InsufficientGas);
        };
        let (offset, size) = (offset as usize, size as usize);

        self.consume_gas(self.memory.expansion_cost(offset, size))?;
        self.memory.extend(offset, size);
        Ok((offset, size))
    }

    /// Charges the surcharge for touching a cold account and marks it warm. The warm cost is
    /// part of the opcode's static gas.
    pub(crate) fn access_account(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        address: Address,
    ) -> Result<()> {
        if !ctx.warm_address(address) {
            self.consume_gas(COLD_ACCOUNT_ACCESS_GAS - WARM_ACCESS_GAS)?;
        }
        Ok(())
    }

    /// Charges the per-word cost of copying `size` bytes.
    pub(crate) fn charge_copy(&mut self, size: usize) -> Result<()> {
        self.consume_gas(COPY_WORD_GAS * size.div_ceil(32) as u64)
    }

    /// Executes the next instruction in the bytecode.
    ///
    /// Running past the end of the code behaves like `STOP`.
    pub fn step(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<Control> {
        let Some(&opcode) = self.bytecode.get(self.instruction) else {
            return Ok(Control::Halt);
        };

        let opcode_info = OpCodeInfo::from(opcode);
        if !OpCodeInfo::is_defined(opcode) || !opcode_info.is_active(ctx.chain.hardfork) {
            return Err(Error::InvalidOpcode(opcode));
        }
        if !opcode_info.is_view() && ctx.is_read_only() {
            return Err(Error::StaticContextViolation);
        }

        let last_instruction = self.instruction;
        self.instruction += 1;
        self.operation_count += 1;

        // if step-tracing feature is enabled, print the current operation
        #[cfg(feature = "step-tracing")]
        trace!(
            pc = last_instruction,
            opcode = opcode_info.name(),
            depth = ctx.depth(),
            gas = self.gas_remaining,
            stack = %self.stack,
            "executing opcode"
        );

        // Consume the static gas for the opcode
        self.consume_gas(opcode_info.min_gas().into())?;

        // execute the operation
        match opcode {
            opcodes::STOP => return Ok(Control::Halt),

            opcodes::ADD => handlers::arithmetic::add(self)?,
            opcodes::MUL => handlers::arithmetic::mul(self)?,
            opcodes::SUB => handlers::arithmetic::sub(self)?,
            opcodes::DIV => handlers::arithmetic::div(self)?,
            opcodes::SDIV => handlers::arithmetic::sdiv(self)?,
            opcodes::MOD => handlers::arithmetic::modulo(self)?,
            opcodes::SMOD => handlers::arithmetic::smod(self)?,
            opcodes::ADDMOD => handlers::arithmetic::addmod(self)?,
            opcodes::MULMOD => handlers::arithmetic::mulmod(self)?,
            opcodes::EXP => handlers::arithmetic::exp(self)?,
            opcodes::SIGNEXTEND => handlers::arithmetic::signextend(self)?,

            opcodes::LT => handlers::comparison::lt(self)?,
            opcodes::GT => handlers::comparison::gt(self)?,
            opcodes::SLT => handlers::comparison::slt(self)?,
            opcodes::SGT => handlers::comparison::sgt(self)?,
            opcodes::EQ => handlers::comparison::eq(self)?,
            opcodes::ISZERO => handlers::comparison::iszero(self)?,

            opcodes::AND => handlers::bitwise::and(self)?,
            opcodes::OR => handlers::bitwise::or(self)?,
            opcodes::XOR => handlers::bitwise::xor(self)?,
            opcodes::NOT => handlers::bitwise::not(self)?,
            opcodes::BYTE => handlers::bitwise::byte(self)?,
            opcodes::SHL => handlers::bitwise::shl(self)?,
            opcodes::SHR => handlers::bitwise::shr(self)?,
            opcodes::SAR => handlers::bitwise::sar(self)?,

            opcodes::SHA3 => handlers::crypto::sha3(self)?,

            opcodes::ADDRESS => handlers::environment::address(self)?,
            opcodes::BALANCE => handlers::environment::balance(self, ctx)?,
            opcodes::ORIGIN => handlers::environment::origin(self, ctx)?,
            opcodes::CALLER => handlers::environment::caller(self)?,
            opcodes::CALLVALUE => handlers::environment::callvalue(self)?,
            opcodes::CALLDATALOAD => handlers::environment::calldataload(self)?,
            opcodes::CALLDATASIZE => handlers::environment::calldatasize(self)?,
            opcodes::CALLDATACOPY => handlers::environment::calldatacopy(self)?,
            opcodes::CODESIZE => handlers::environment::codesize(self)?,
            opcodes::CODECOPY => handlers::environment::codecopy(self)?,
            opcodes::GASPRICE => handlers::environment::gasprice(self, ctx)?,
            opcodes::EXTCODESIZE => handlers::environment::extcodesize(self, ctx)?,
            opcodes::EXTCODECOPY => handlers::environment::extcodecopy(self, ctx)?,
            opcodes::RETURNDATASIZE => handlers::environment::returndatasize(self)?,
            opcodes::RETURNDATACOPY => handlers::environment::returndatacopy(self)?,
            opcodes::EXTCODEHASH => handlers::environment::extcodehash(self, ctx)?,

            opcodes::BLOCKHASH => handlers::block::blockhash(self, ctx)?,
            opcodes::COINBASE => handlers::block::coinbase(self, ctx)?,
            opcodes::TIMESTAMP => handlers::block::timestamp(self, ctx)?,
            opcodes::NUMBER => handlers::block::number(self, ctx)?,
            opcodes::PREVRANDAO => handlers::block::prevrandao(self, ctx)?,
            opcodes::GASLIMIT => handlers::block::gaslimit(self, ctx)?,
            opcodes::CHAINID => handlers::block::chainid(self, ctx)?,
            opcodes::SELFBALANCE => handlers::block::selfbalance(self, ctx)?,
            opcodes::BASEFEE => handlers::block::basefee(self, ctx)?,
            opcodes::BLOBHASH => handlers::block::blobhash(self, ctx)?,
            opcodes::BLOBBASEFEE => handlers::block::blobbasefee(self, ctx)?,

            opcodes::POP => handlers::stack::pop(self)?,
            opcodes::MLOAD => handlers::memory::mload(self)?,
            opcodes::MSTORE => handlers::memory::mstore(self)?,
            opcodes::MSTORE8 => handlers::memory::mstore8(self)?,
            opcodes::SLOAD => handlers::storage::sload(self, ctx)?,
            opcodes::SSTORE => handlers::storage::sstore(self, ctx)?,

            opcodes::JUMP => handlers::control::jump(self)?,
            opcodes::JUMPI => handlers::control::jumpi(self)?,
            opcodes::PC => handlers::control::pc(self, last_instruction)?,
            opcodes::MSIZE => handlers::memory::msize(self)?,
            opcodes::GAS => handlers::control::gas(self)?,
            opcodes::JUMPDEST => {}
            opcodes::TLOAD => handlers::storage::tload(self, ctx)?,
            opcodes::TSTORE => handlers::storage::tstore(self, ctx)?,
            opcodes::MCOPY => handlers::memory::mcopy(self)?,

            opcodes::PUSH0 => handlers::stack::push0(self)?,
            (opcodes::PUSH1..=opcodes::PUSH32) => handlers::stack::push_n(self, opcode)?,
            (opcodes::DUP1..=opcodes::DUP16) => handlers::stack::dup_n(self, opcode)?,
            (opcodes::SWAP1..=opcodes::SWAP16) => handlers::stack::swap_n(self, opcode)?,

            (opcodes::LOG0..=opcodes::LOG4) => {
                handlers::logging::log_n(self, ctx, opcode - opcodes::LOG0)?;
            }

            opcodes::CREATE => handlers::system::create(self, ctx)?,
            opcodes::CALL => handlers::system::call(self, ctx)?,
            opcodes::CALLCODE => handlers::system::callcode(self, ctx)?,
            opcodes::RETURN => {
                handlers::system::op_return(self)?;
                return Ok(Control::Halt);
            }
            opcodes::DELEGATECALL => handlers::system::delegatecall(self, ctx)?,
            opcodes::CREATE2 => handlers::system::create2(self, ctx)?,
            opcodes::STATICCALL => handlers::system::staticcall(self, ctx)?,
            opcodes::REVERT => return Err(handlers::system::revert(self)),
            opcodes::SELFDESTRUCT => {
                handlers::system::selfdestruct(self, ctx)?;
                return Ok(Control::Halt);
            }

            _ => return Err(Error::InvalidOpcode(opcode)),
        }

        Ok(Control::Continue)
    }

    /// Executes the frame until it halts, returning its output.
    ///
    /// The cancellation flag is checked before the first opcode and then every
    /// `abort_check_interval` opcodes. Once it is observed set, the frame ends with
    /// [`Error::ExecutionAborted`].
    ///
    /// ```
    /// use alloy::primitives::{Address, Bytes, U256};
    /// use sleipnir_config::{ChainConfig, ExecutionConfig};
    /// use sleipnir_vm::core::{context::ExecutionContext, state::InMemoryState, vm::VM};
    ///
    /// let mut state = InMemoryState::new();
    /// let mut ctx = ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());
    ///
    /// // PUSH1 0x01 PUSH1 0x02 ADD
    /// let mut vm = VM::new(
    ///     Bytes::from_static(&[0x60, 0x01, 0x60, 0x02, 0x01]),
    ///     Bytes::new(),
    ///     Address::ZERO,
    ///     Address::ZERO,
    ///     U256::ZERO,
    ///     100,
    /// );
    ///
    /// assert_eq!(vm.execute(&mut ctx), Ok(Bytes::new()));
    /// assert_eq!(vm.stack.peek(0), Some(U256::from(3)));
    /// assert_eq!(vm.gas_used, 9);
    /// ```
    pub fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<Bytes> {
        let interval = ctx.config.abort_check_interval.max(1);

        loop {
            if self.operation_count % interval == 0 && ctx.is_aborted() {
                warn!(
                    address = %self.address,
                    pc = self.instruction,
                    depth = ctx.depth(),
                    "abort requested, stopping execution"
                );
                return Err(Error::ExecutionAborted);
            }

            if let Control::Halt = self.step(ctx)? {
                break;
            }
        }

        #[cfg(feature = "step-tracing")]
        trace!(
            address = %self.address,
            ops = self.operation_count,
            elapsed = ?self.start_time.elapsed(),
            "frame halted"
        );

        Ok(std::mem::take(&mut self.output))
    }
}

/// Marks every `JUMPDEST` byte that is an opcode rather than push data.
fn analyze_jumpdests(code: &[u8]) -> Vec<bool> {
    let mut jumpdests = vec![false; code.len()];
    let mut i = 0;
    while i < code.len() {
        let opcode = code[i];
        if opcode == opcodes::JUMPDEST {
            jumpdests[i] = true;
        } else if (opcodes::PUSH1..=opcodes::PUSH32).contains(&opcode) {
            i += (opcode - opcodes::PUSH0) as usize;
        }
        i += 1;
    }
    jumpdests
}
