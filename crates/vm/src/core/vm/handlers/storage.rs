use crate::{
    core::{
        constants::CALL_STIPEND,
        context::ExecutionContext,
        storage::{access_cost, storage_cost},
    },
    error::{Error, Result},
};

use super::super::core::VM;

/// SLOAD - Load word from storage
pub fn sload(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let key = vm.stack.pop()?;

    // consume dynamic gas
    let warm = ctx.warm_slot(vm.address, key);
    vm.consume_gas(access_cost(warm))?;

    vm.stack.push(ctx.state().storage(vm.address, key))
}

/// SSTORE - Save word to storage
pub fn sstore(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let key = vm.stack.pop()?;
    let value = vm.stack.pop()?;

    // a frame running on the call stipend may not write storage
    if vm.gas_remaining <= CALL_STIPEND {
        return Err(Error::InsufficientGas);
    }

    // consume dynamic gas
    let warm = ctx.warm_slot(vm.address, key);
    let current = ctx.state().storage(vm.address, key);
    vm.consume_gas(storage_cost(current, value, warm))?;

    ctx.state_mut().set_storage(vm.address, key, value);
    Ok(())
}

/// TLOAD - Load word from transient storage
pub fn tload(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let key = vm.stack.pop()?;
    vm.stack.push(ctx.state().transient_storage(vm.address, key))
}

/// TSTORE - Save word to transient storage
pub fn tstore(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let key = vm.stack.pop()?;
    let value = vm.stack.pop()?;
    ctx.state_mut().set_transient_storage(vm.address, key, value);
    Ok(())
}
