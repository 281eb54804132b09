use std::ops::{Shl, Shr};

use alloy::primitives::U256;
use sleipnir_common::utils::strings::sign_uint;

use crate::error::Result;

use super::super::core::VM;

/// AND - Bitwise AND operation
pub fn and(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.stack.push(a & b)
}

/// OR - Bitwise OR operation
pub fn or(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.stack.push(a | b)
}

/// XOR - Bitwise XOR operation
pub fn xor(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.stack.push(a ^ b)
}

/// NOT - Bitwise NOT operation
pub fn not(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    vm.stack.push(!a)
}

/// BYTE - Retrieve single byte from word
pub fn byte(vm: &mut VM) -> Result<()> {
    let i = vm.stack.pop()?;
    let x = vm.stack.pop()?;
    let result = if i >= U256::from(32u8) {
        U256::ZERO
    } else {
        U256::from(x.byte(31 - i.to::<usize>()))
    };
    vm.stack.push(result)
}

/// SHL - Shift left operation
pub fn shl(vm: &mut VM) -> Result<()> {
    let shift = vm.stack.pop()?;
    let value = vm.stack.pop()?;
    let result =
        if shift > U256::from(255u8) { U256::ZERO } else { value.shl(shift.to::<usize>()) };
    vm.stack.push(result)
}

/// SHR - Shift right operation
pub fn shr(vm: &mut VM) -> Result<()> {
    let shift = vm.stack.pop()?;
    let value = vm.stack.pop()?;
    let result =
        if shift > U256::from(255u8) { U256::ZERO } else { value.shr(shift.to::<usize>()) };
    vm.stack.push(result)
}

/// SAR - Arithmetic shift right operation
pub fn sar(vm: &mut VM) -> Result<()> {
    let shift = vm.stack.pop()?;
    let value = sign_uint(vm.stack.pop()?);
    let result = if shift > U256::from(255u8) {
        if value.is_negative() {
            U256::MAX
        } else {
            U256::ZERO
        }
    } else {
        value.asr(shift.to::<usize>()).into_raw()
    };
    vm.stack.push(result)
}
