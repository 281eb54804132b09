use alloy::primitives::U256;

use crate::error::{Error, Result};

use super::super::core::VM;

/// Moves the program counter to `destination`, which must be a valid `JUMPDEST`.
fn jump_to(vm: &mut VM, destination: U256) -> Result<()> {
    let destination = usize::try_from(destination).unwrap_or(usize::MAX);
    if !vm.is_valid_jump(destination) {
        return Err(Error::InvalidJump(destination));
    }

    vm.instruction = destination;
    Ok(())
}

/// JUMP - Alter the program counter
pub fn jump(vm: &mut VM) -> Result<()> {
    let destination = vm.stack.pop()?;
    jump_to(vm, destination)
}

/// JUMPI - Conditionally alter the program counter
pub fn jumpi(vm: &mut VM) -> Result<()> {
    let destination = vm.stack.pop()?;
    let condition = vm.stack.pop()?;

    if !condition.is_zero() {
        jump_to(vm, destination)?;
    }
    Ok(())
}

/// PC - Get the value of the program counter prior to the increment
pub fn pc(vm: &mut VM, last_instruction: usize) -> Result<()> {
    vm.stack.push(U256::from(last_instruction))
}

/// GAS - Get the amount of available gas
pub fn gas(vm: &mut VM) -> Result<()> {
    vm.stack.push(U256::from(vm.gas_remaining))
}
