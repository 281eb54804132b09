use alloy::primitives::{Address, Bytes, U256};
use sleipnir_config::hardfork::HardFork;

use crate::{
    core::{
        constants::{
            CALL_STIPEND, CALL_VALUE_TRANSFER_GAS, CREATE2_WORD_GAS, INITCODE_WORD_GAS,
            NEW_ACCOUNT_GAS,
        },
        context::ExecutionContext,
        dispatch::{CallResult, CreateResult},
    },
    error::{Error, Result},
};

use super::super::core::VM;

/// The operands shared by the call family, with memory already expanded and charged.
struct CallArgs {
    gas: U256,
    to: Address,
    value: U256,
    input: Bytes,
    ret_offset: usize,
    ret_size: usize,
}

/// Pops the call operands. `CALL` and `CALLCODE` carry a value, the others don't.
fn pop_call_args(vm: &mut VM, with_value: bool) -> Result<CallArgs> {
    let gas = vm.stack.pop()?;
    let to = VM::u256_to_address(vm.stack.pop()?);
    let value = if with_value { vm.stack.pop()? } else { U256::ZERO };
    let args_offset = vm.stack.pop()?;
    let args_size = vm.stack.pop()?;
    let ret_offset = vm.stack.pop()?;
    let ret_size = vm.stack.pop()?;

    // consume dynamic gas
    let (args_offset, args_size) = vm.expand_memory(args_offset, args_size)?;
    let (ret_offset, ret_size) = vm.expand_memory(ret_offset, ret_size)?;

    let input = Bytes::from(vm.memory.read(args_offset, args_size));
    Ok(CallArgs { gas, to, value, input, ret_offset, ret_size })
}

/// Consumes and returns the gas handed to a nested frame: the requested amount, capped at all
/// but one 64th of what is left.
fn forward_gas(vm: &mut VM, requested: U256) -> Result<u64> {
    let available = vm.gas_remaining - vm.gas_remaining / 64;
    let gas = u64::try_from(requested).unwrap_or(u64::MAX).min(available);
    vm.consume_gas(gas)?;
    Ok(gas)
}

/// Applies a nested call's result to the calling frame.
fn finish_call(vm: &mut VM, result: CallResult, ret_offset: usize, ret_size: usize) -> Result<()> {
    if result.is_aborted() {
        return Err(Error::ExecutionAborted);
    }

    vm.refund_gas(result.gas_left);

    let copied = ret_size.min(result.output.len());
    vm.memory.write(ret_offset, &result.output[..copied]);

    let success = result.is_success();
    vm.returndata = result.output;
    vm.push_boolean(success)
}

/// Applies a nested creation's result to the creating frame.
fn finish_create(vm: &mut VM, result: CreateResult) -> Result<()> {
    if result.is_aborted() {
        return Err(Error::ExecutionAborted);
    }

    vm.refund_gas(result.gas_left);

    let success = result.is_success();
    let address = result.address;

    // only a revert hands data back to the creator
    vm.returndata = match result.error {
        Some(Error::Revert(_)) => result.output,
        _ => Bytes::new(),
    };

    if success {
        vm.stack.push(VM::address_to_u256(&address))
    } else {
        vm.stack.push(U256::ZERO)
    }
}

/// Pops and charges for the init code of `CREATE` and `CREATE2`.
fn pop_init_code(vm: &mut VM, ctx: &ExecutionContext<'_>, hashed: bool) -> Result<(U256, Bytes)> {
    let value = vm.stack.pop()?;
    let offset = vm.stack.pop()?;
    let size = vm.stack.pop()?;

    // consume dynamic gas
    let (offset, size) = vm.expand_memory(offset, size)?;
    let words = size.div_ceil(32) as u64;
    if ctx.chain.hardfork.is_active(HardFork::Shanghai) {
        vm.consume_gas(INITCODE_WORD_GAS * words)?;
    }
    if hashed {
        vm.consume_gas(CREATE2_WORD_GAS * words)?;
    }

    Ok((value, Bytes::from(vm.memory.read(offset, size))))
}

/// Reads the output region named by the top two stack items.
fn pop_output(vm: &mut VM) -> Result<Bytes> {
    let offset = vm.stack.pop()?;
    let size = vm.stack.pop()?;

    // consume dynamic gas
    let (offset, size) = vm.expand_memory(offset, size)?;

    Ok(Bytes::from(vm.memory.read(offset, size)))
}

/// CREATE - Create a new account with associated code
pub fn create(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let (value, init_code) = pop_init_code(vm, ctx, false)?;
    let gas = forward_gas(vm, U256::MAX)?;

    let dispatcher = ctx.dispatcher();
    let result = dispatcher.create(ctx, &*vm, init_code, gas, value);
    finish_create(vm, result)
}

/// CALL - Message-call into an account
pub fn call(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let args = pop_call_args(vm, true)?;

    // consume dynamic gas
    vm.access_account(ctx, args.to)?;
    if !args.value.is_zero() {
        vm.consume_gas(CALL_VALUE_TRANSFER_GAS)?;
        if !ctx.state().exists(args.to) {
            vm.consume_gas(NEW_ACCOUNT_GAS)?;
        }
    }

    let mut gas = forward_gas(vm, args.gas)?;
    if !args.value.is_zero() {
        gas += CALL_STIPEND;
    }

    let dispatcher = ctx.dispatcher();
    let result = dispatcher.call(ctx, &*vm, args.to, args.input, gas, args.value);
    finish_call(vm, result, args.ret_offset, args.ret_size)
}

/// CALLCODE - Message-call into this account with alternative account's code
pub fn callcode(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let args = pop_call_args(vm, true)?;

    // consume dynamic gas
    vm.access_account(ctx, args.to)?;
    if !args.value.is_zero() {
        vm.consume_gas(CALL_VALUE_TRANSFER_GAS)?;
    }

    let mut gas = forward_gas(vm, args.gas)?;
    if !args.value.is_zero() {
        gas += CALL_STIPEND;
    }

    let dispatcher = ctx.dispatcher();
    let result = dispatcher.call_code(ctx, &*vm, args.to, args.input, gas, args.value);
    finish_call(vm, result, args.ret_offset, args.ret_size)
}

/// RETURN - Halt execution returning output data
pub fn op_return(vm: &mut VM) -> Result<()> {
    vm.output = pop_output(vm)?;
    Ok(())
}

/// DELEGATECALL - Message-call into this account with an alternative account's code
pub fn delegatecall(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let args = pop_call_args(vm, false)?;

    // consume dynamic gas
    vm.access_account(ctx, args.to)?;
    let gas = forward_gas(vm, args.gas)?;

    let dispatcher = ctx.dispatcher();
    let result = dispatcher.delegate_call(ctx, &*vm, args.to, args.input, gas);
    finish_call(vm, result, args.ret_offset, args.ret_size)
}

/// CREATE2 - Create a new account with associated code at a predictable address
pub fn create2(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let (value, init_code) = pop_init_code(vm, ctx, true)?;
    let salt = vm.stack.pop()?;
    let gas = forward_gas(vm, U256::MAX)?;

    let dispatcher = ctx.dispatcher();
    let result = dispatcher.create2(ctx, &*vm, init_code, gas, value, salt);
    finish_create(vm, result)
}

/// STATICCALL - Static message-call into an account
pub fn staticcall(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let args = pop_call_args(vm, false)?;

    // consume dynamic gas
    vm.access_account(ctx, args.to)?;
    let gas = forward_gas(vm, args.gas)?;

    let dispatcher = ctx.dispatcher();
    let result = dispatcher.static_call(ctx, &*vm, args.to, args.input, gas);
    finish_call(vm, result, args.ret_offset, args.ret_size)
}

/// REVERT - Halt execution reverting state changes, returning the error the frame ends with
pub fn revert(vm: &mut VM) -> Error {
    match pop_output(vm) {
        Ok(data) => Error::Revert(data),
        Err(e) => e,
    }
}

/// SELFDESTRUCT - Send the account's entire balance to a beneficiary and halt
///
/// The account itself is left in place.
pub fn selfdestruct(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let beneficiary = VM::u256_to_address(vm.stack.pop()?);

    // consume dynamic gas
    vm.access_account(ctx, beneficiary)?;
    let balance = ctx.state().balance(vm.address);
    if !balance.is_zero() && !ctx.state().exists(beneficiary) {
        vm.consume_gas(NEW_ACCOUNT_GAS)?;
    }

    if beneficiary != vm.address && !balance.is_zero() {
        ctx.state_mut().transfer(vm.address, beneficiary, balance)?;
    }
    Ok(())
}
