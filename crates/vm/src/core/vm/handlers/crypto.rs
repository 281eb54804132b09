use alloy::primitives::{keccak256, U256};

use crate::{core::constants::KECCAK_WORD_GAS, error::Result};

use super::super::core::VM;

/// SHA3 - Compute Keccak-256 hash
pub fn sha3(vm: &mut VM) -> Result<()> {
    let offset = vm.stack.pop()?;
    let size = vm.stack.pop()?;

    // consume dynamic gas
    let (offset, size) = vm.expand_memory(offset, size)?;
    vm.consume_gas(KECCAK_WORD_GAS * size.div_ceil(32) as u64)?;

    let data = vm.memory.read(offset, size);
    vm.stack.push(U256::from_be_bytes(keccak256(data).0))
}
