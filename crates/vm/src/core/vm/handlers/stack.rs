use alloy::primitives::U256;

use crate::{core::opcodes, error::Result};

use super::super::core::VM;

/// POP - Remove item from stack
pub fn pop(vm: &mut VM) -> Result<()> {
    vm.stack.pop()?;
    Ok(())
}

/// PUSH0 - Push 0 onto stack
pub fn push0(vm: &mut VM) -> Result<()> {
    vm.stack.push(U256::ZERO)
}

/// PUSH1-PUSH32 - Push N bytes onto stack
///
/// Immediates cut off by the end of the code are padded with zeros.
pub fn push_n(vm: &mut VM, opcode: u8) -> Result<()> {
    // Get the number of bytes to push
    let num_bytes = (opcode - opcodes::PUSH0) as usize;

    // Get the bytes to push from bytecode
    let bytes = VM::safe_copy_data(&vm.bytecode, vm.instruction, num_bytes);
    vm.instruction += num_bytes;

    vm.stack.push(U256::from_be_slice(&bytes))
}

/// DUP1-DUP16 - Duplicate Nth stack item
pub fn dup_n(vm: &mut VM, opcode: u8) -> Result<()> {
    let index = opcode - opcodes::DUP1 + 1;
    vm.stack.dup(index as usize)
}

/// SWAP1-SWAP16 - Exchange 1st and Nth stack items
pub fn swap_n(vm: &mut VM, opcode: u8) -> Result<()> {
    let index = opcode - opcodes::SWAP1 + 1;
    vm.stack.swap(index as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, Bytes};

    #[test]
    fn test_push_truncated_immediate() {
        // PUSH2 0xff, with the second byte missing
        let mut vm = VM::new(
            Bytes::from_static(&[0x61, 0xff]),
            Bytes::new(),
            Address::ZERO,
            Address::ZERO,
            U256::ZERO,
            100,
        );
        vm.instruction = 1;
        push_n(&mut vm, opcodes::PUSH2).expect("push failed");
        assert_eq!(vm.stack.peek(0), Some(U256::from(0xff00)));
        assert_eq!(vm.instruction, 3);
    }

    #[test]
    fn test_dup_and_swap() {
        let mut vm = VM::new(
            Bytes::new(),
            Bytes::new(),
            Address::ZERO,
            Address::ZERO,
            U256::ZERO,
            100,
        );
        vm.stack.push(U256::from(1)).expect("stack overflow");
        vm.stack.push(U256::from(2)).expect("stack overflow");

        dup_n(&mut vm, opcodes::DUP2).expect("dup failed");
        assert_eq!(vm.stack.peek(0), Some(U256::from(1)));

        swap_n(&mut vm, opcodes::SWAP2).expect("swap failed");
        assert_eq!(vm.stack.peek(0), Some(U256::from(1)));
        assert_eq!(vm.stack.peek(2), Some(U256::from(1)));
        assert_eq!(vm.stack.peek(1), Some(U256::from(2)));

        assert!(swap_n(&mut vm, opcodes::SWAP16).is_err());
    }
}
