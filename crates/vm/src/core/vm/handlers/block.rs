use alloy::primitives::U256;

use crate::{core::context::ExecutionContext, error::Result};

use super::super::core::VM;

/// BLOCKHASH - Get the hash of one of the 256 most recent complete blocks
///
/// No block history is available to an execution, so every lookup yields zero.
pub fn blockhash(vm: &mut VM, _ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.pop()?;
    vm.stack.push(U256::ZERO)
}

/// COINBASE - Get the block's beneficiary address
pub fn coinbase(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.push(VM::address_to_u256(&ctx.block.coinbase))
}

/// TIMESTAMP - Get the block's timestamp
pub fn timestamp(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.push(U256::from(ctx.block.timestamp))
}

/// NUMBER - Get the block's number
pub fn number(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.push(U256::from(ctx.block.number))
}

/// PREVRANDAO - Get the previous block's randomness beacon output
pub fn prevrandao(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.push(U256::from_be_bytes(ctx.block.prevrandao.0))
}

/// GASLIMIT - Get the block's gas limit
pub fn gaslimit(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.push(U256::from(ctx.block.gas_limit))
}

/// CHAINID - Get the chain ID
pub fn chainid(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.push(U256::from(ctx.chain.chain_id))
}

/// SELFBALANCE - Get balance of currently executing account
pub fn selfbalance(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let balance = ctx.state().balance(vm.address);
    vm.stack.push(balance)
}

/// BASEFEE - Get the base fee
pub fn basefee(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.push(ctx.block.base_fee)
}

/// BLOBHASH - Get the versioned hash of one of the transaction's blobs
pub fn blobhash(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    let index = vm.stack.pop()?;
    let hash = usize::try_from(index)
        .ok()
        .and_then(|index| ctx.tx.blob_hashes.get(index))
        .map(|hash| U256::from_be_bytes(hash.0))
        .unwrap_or(U256::ZERO);
    vm.stack.push(hash)
}

/// BLOBBASEFEE - Get the blob base fee
pub fn blobbasefee(vm: &mut VM, ctx: &mut ExecutionContext<'_>) -> Result<()> {
    vm.stack.push(ctx.block.blob_base_fee)
}
