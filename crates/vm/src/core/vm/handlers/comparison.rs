use sleipnir_common::utils::strings::sign_uint;

use crate::error::Result;

use super::super::core::VM;

/// LT - Less than comparison
pub fn lt(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.push_boolean(a < b)
}

/// GT - Greater than comparison
pub fn gt(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.push_boolean(a > b)
}

/// SLT - Signed less than comparison
pub fn slt(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.push_boolean(sign_uint(a) < sign_uint(b))
}

/// SGT - Signed greater than comparison
pub fn sgt(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.push_boolean(sign_uint(a) > sign_uint(b))
}

/// EQ - Equality comparison
pub fn eq(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    let b = vm.stack.pop()?;
    vm.push_boolean(a == b)
}

/// ISZERO - Simple not operator
pub fn iszero(vm: &mut VM) -> Result<()> {
    let a = vm.stack.pop()?;
    vm.push_boolean(a.is_zero())
}
