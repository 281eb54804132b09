use std::ops::{Div, Rem};

use alloy::primitives::{I256, U256};
use sleipnir_common::utils::strings::sign_uint;

use crate::{core::constants::EXP_BYTE_GAS, error::Result};

use super::super::core::VM;

/// ADD - Addition operation
pub fn add(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.stack.push(a.overflowing_add(b).0)
}

/// MUL - Multiplication operation
pub fn mul(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.stack.push(a.overflowing_mul(b).0)
}

/// SUB - Subtraction operation
pub fn sub(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.stack.push(a.overflowing_sub(b).0)
}

/// DIV - Integer division operation
pub fn div(vm: &mut VM) -> Result<()> {
    let numerator = vm.stack.pop()?;
    let denominator = vm.stack.pop()?;
    let result = if !denominator.is_zero() { numerator.div(denominator) } else { U256::ZERO };
    vm.stack.push(result)
}

/// SDIV - Signed integer division operation
pub fn sdiv(vm: &mut VM) -> Result<()> {
    let numerator = sign_uint(vm.stack.pop()?);
    let denominator = sign_uint(vm.stack.pop()?);
    let result = if !denominator.is_zero() {
        // MIN / -1 wraps back to MIN
        numerator.overflowing_div(denominator).0
    } else {
        I256::ZERO
    };
    vm.stack.push(result.into_raw())
}

/// MOD - Modulo operation
pub fn modulo(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let modulus = vm.stack.pop()?;
    let result = if !modulus.is_zero() { a.rem(modulus) } else { U256::ZERO };
    vm.stack.push(result)
}

/// SMOD - Signed modulo operation
pub fn smod(vm: &mut VM) -> Result<()> {
    let a = sign_uint(vm.stack.pop()?);
    let modulus = sign_uint(vm.stack.pop()?);
    let result = if !modulus.is_zero() { a.overflowing_rem(modulus).0 } else { I256::ZERO };
    vm.stack.push(result.into_raw())
}

/// ADDMOD - Addition modulo operation
pub fn addmod(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    let modulus = vm.stack.pop()?;
    let result = if !modulus.is_zero() { a.add_mod(b, modulus) } else { U256::ZERO };
    vm.stack.push(result)
}

/// MULMOD - Multiplication modulo operation
pub fn mulmod(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    let modulus = vm.stack.pop()?;
    let result = if !modulus.is_zero() { a.mul_mod(b, modulus) } else { U256::ZERO };
    vm.stack.push(result)
}

/// EXP - Exponential operation
pub fn exp(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let exponent = vm.stack.pop()?;

    // consume dynamic gas
    let exponent_byte_size = exponent.bit_len().div_ceil(8) as u64;
    vm.consume_gas(EXP_BYTE_GAS * exponent_byte_size)?;

    vm.stack.push(a.overflowing_pow(exponent).0)
}

/// SIGNEXTEND - Extend length of two's complement signed integer
pub fn signextend(vm: &mut VM) -> Result<()> {
    let x = vm.stack.pop()?;
    let b = vm.stack.pop()?;

    // sizes of 32 bytes or more leave the value as is
    if x >= U256::from(31u8) {
        return vm.stack.push(b);
    }

    let t = x.to::<usize>() * 8 + 7;
    let sign_bit = U256::from(1u8) << t;
    let mask = sign_bit - U256::from(1u8);
    let result = if b.bit(t) { b | !mask } else { b & mask };

    vm.stack.push(result)
}
