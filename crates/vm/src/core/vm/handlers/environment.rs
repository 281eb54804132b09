use alloy::primitives::{Bytes, U256};

use crate::{
    core::context::ExecutionContext,
    error::{Error, Result},
};

use super::super::core::VM;

/// Pops `destOffset`, `offset` and `size`, then copies `size` bytes of `source` starting at
/// `offset` into memory, padding with zeros past its end.
fn copy_to_memory(vm: &mut VM, source: &Bytes) -> Result<()> {
    let dest_offset = vm.stack.pop()?;
    let offset = vm.stack.pop()?;
    let size = vm.stack.pop()?;

    // consume dynamic gas
    let (dest_offset, size) = vm.expand_memory(dest_offset, size)?;
    vm.charge_copy(size)?;

    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let value = VM::safe_copy_data(source, offset, size);
    vm.memory.write(dest_offset, &value);
    Ok(())
}

/// ADDRESS - Get address of currently executing account
pub fn address(vm: &mut VM) -> Result<()> {
    vm.stack.push(VM::address_to_u256(&vm.address))
}

/// BALANCE - Get balance of the given account
pub fn balance(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let address = VM::u256_to_address(vm.stack.pop()?);

    // consume dynamic gas
    vm.access_account(ctx, address)?;

    vm.stack.push(ctx.state().balance(address))
}

/// ORIGIN - Get execution origination address
pub fn origin(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.push(VM::address_to_u256(&ctx.tx.origin))
}

/// CALLER - Get caller address
pub fn caller(vm: &mut VM) -> Result<()> {
    vm.stack.push(VM::address_to_u256(&vm.caller))
}

/// CALLVALUE - Get deposited value by the instruction/transaction responsible for this execution
pub fn callvalue(vm: &mut VM) -> Result<()> {
    vm.stack.push(vm.value)
}

/// CALLDATALOAD - Get input data of current environment
pub fn calldataload(vm: &mut VM) -> Result<()> {
    let i = vm.stack.pop()?;
    let i = usize::try_from(i).unwrap_or(usize::MAX);

    let value = VM::safe_copy_data(&vm.calldata, i, 32);
    vm.stack.push(U256::from_be_slice(&value))
}

/// CALLDATASIZE - Get size of input data in current environment
pub fn calldatasize(vm: &mut VM) -> Result<()> {
    vm.stack.push(U256::from(vm.calldata.len()))
}

/// CALLDATACOPY - Copy input data in current environment to memory
pub fn calldatacopy(vm: &mut VM) -> Result<()> {
    let calldata = vm.calldata.clone();
    copy_to_memory(vm, &calldata)
}

/// CODESIZE - Get size of code running in current environment
pub fn codesize(vm: &mut VM) -> Result<()> {
    vm.stack.push(U256::from(vm.bytecode.len()))
}

/// CODECOPY - Copy code running in current environment to memory
pub fn codecopy(vm: &mut VM) -> Result<()> {
    let bytecode = vm.bytecode.clone();
    copy_to_memory(vm, &bytecode)
}

/// GASPRICE - Get price of gas in current environment
pub fn gasprice(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.push(ctx.tx.gas_price)
}

/// EXTCODESIZE - Get size of an account's code
pub fn extcodesize(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let address = VM::u256_to_address(vm.stack.pop()?);

    // consume dynamic gas
    vm.access_account(ctx, address)?;

    vm.stack.push(U256::from(ctx.state().code(address).len()))
}

/// EXTCODECOPY - Copy an account's code to memory
pub fn extcodecopy(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let address = VM::u256_to_address(vm.stack.pop()?);

    // consume dynamic gas
    vm.access_account(ctx, address)?;

    let code = ctx.state().code(address);
    copy_to_memory(vm, &code)
}

/// RETURNDATASIZE - Get size of output data from the previous call
pub fn returndatasize(vm: &mut VM) -> Result<()> {
    vm.stack.push(U256::from(vm.returndata.len()))
}

/// RETURNDATACOPY - Copy output data from the previous call to memory
///
/// Unlike the other copies, reading past the end of the return data is an error.
pub fn returndatacopy(vm: &mut VM) -> Result<()> {
    let (Some(offset), Some(size)) = (vm.stack.peek(1), vm.stack.peek(2)) else {
        return Err(Error::StackUnderflow);
    };

    let end = offset.checked_add(size).unwrap_or(U256::MAX);
    if end > U256::from(vm.returndata.len()) {
        return Err(Error::ReturnDataOutOfBounds);
    }

    let returndata = vm.returndata.clone();
    copy_to_memory(vm, &returndata)
}

/// EXTCODEHASH - Get hash of an account's code
pub fn extcodehash(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let address = VM::u256_to_address(vm.stack.pop()?);

    // consume dynamic gas
    vm.access_account(ctx, address)?;

    let hash = ctx.state().code_hash(address);
    vm.stack.push(U256::from_be_bytes(hash.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    fn vm_with_calldata(calldata: &'static [u8]) -> VM {
        VM::new(
            Bytes::new(),
            Bytes::from_static(calldata),
            Address::ZERO,
            Address::ZERO,
            U256::ZERO,
            10_000,
        )
    }

    #[test]
    fn test_calldataload_pads_with_zeros() {
        let mut vm = vm_with_calldata(&[0xaa, 0xbb]);
        vm.stack.push(U256::from(1)).expect("stack overflow");
        calldataload(&mut vm).expect("calldataload failed");
        assert_eq!(vm.stack.peek(0), Some(U256::from(0xbb) << 248));
    }

    #[test]
    fn test_calldatacopy() {
        let mut vm = vm_with_calldata(&[0x01, 0x02, 0x03]);
        // size, offset, destOffset
        for value in [4u8, 1, 0] {
            vm.stack.push(U256::from(value)).expect("stack overflow");
        }
        calldatacopy(&mut vm).expect("calldatacopy failed");
        assert_eq!(vm.memory.read(0, 4), vec![0x02, 0x03, 0x00, 0x00]);
        assert_eq!(vm.memory.size(), 32);
    }

    #[test]
    fn test_returndatacopy_out_of_bounds() {
        let mut vm = vm_with_calldata(&[]);
        vm.returndata = Bytes::from_static(&[0x01, 0x02]);
        for value in [2u8, 1, 0] {
            vm.stack.push(U256::from(value)).expect("stack overflow");
        }
        assert_eq!(returndatacopy(&mut vm), Err(Error::ReturnDataOutOfBounds));
    }
}
