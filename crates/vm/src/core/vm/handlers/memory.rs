use alloy::primitives::U256;

use crate::error::Result;

use super::super::core::VM;

/// MLOAD - Load word from memory
pub fn mload(vm: &mut VM) -> Result<()> {
    let offset = vm.stack.pop()?;

    // consume dynamic gas
    let (offset, _) = vm.expand_memory(offset, U256::from(32u8))?;

    let result = U256::from_be_slice(&vm.memory.read(offset, 32));
    vm.stack.push(result)
}

/// MSTORE - Save word to memory
pub fn mstore(vm: &mut VM) -> Result<()> {
    let offset = vm.stack.pop()?;
    let value = vm.stack.pop()?;

    // consume dynamic gas
    let (offset, _) = vm.expand_memory(offset, U256::from(32u8))?;

    vm.memory.store(offset, 32, &value.to_be_bytes::<32>());
    Ok(())
}

/// MSTORE8 - Save byte to memory
pub fn mstore8(vm: &mut VM) -> Result<()> {
    let offset = vm.stack.pop()?;
    let value = vm.stack.pop()?;

    // consume dynamic gas
    let (offset, _) = vm.expand_memory(offset, U256::from(1u8))?;

    vm.memory.store(offset, 1, &[value.byte(0)]);
    Ok(())
}

/// MSIZE - Get the size of active memory in bytes
pub fn msize(vm: &mut VM) -> Result<()> {
    vm.stack.push(U256::from(vm.memory.size()))
}

/// MCOPY - Copy memory areas
pub fn mcopy(vm: &mut VM) -> Result<()> {
    let dest_offset = vm.stack.pop()?;
    let offset = vm.stack.pop()?;
    let size = vm.stack.pop()?;

    if size.is_zero() {
        return Ok(());
    }

    // consume dynamic gas, covering whichever region reaches further
    let (_, size) = vm.expand_memory(dest_offset.max(offset), size)?;
    vm.charge_copy(size)?;

    let (dest_offset, offset) = (dest_offset.saturating_to::<usize>(), offset.saturating_to());
    let value = VM::safe_copy_data(&vm.memory.memory, offset, size);
    vm.memory.write(dest_offset, &value);
    Ok(())
}
