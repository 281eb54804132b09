use alloy::primitives::{Bytes, B256};

use crate::{
    core::{constants::LOG_DATA_GAS, context::ExecutionContext, log::Log},
    error::Result,
};

use super::super::core::VM;

/// LOG0-LOG4 - Append log record with N topics
pub fn log_n(vm: &mut VM, ctx: &mut ExecutionContext<'_>, topic_count: u8) -> Result<()> {
    let offset = vm.stack.pop()?;
    let size = vm.stack.pop()?;
    let topics = vm
        .stack
        .pop_n(topic_count as usize)?
        .into_iter()
        .map(|topic| B256::from(topic.to_be_bytes::<32>()))
        .collect();

    // consume dynamic gas
    let (offset, size) = vm.expand_memory(offset, size)?;
    vm.consume_gas(LOG_DATA_GAS * size as u64)?;

    let data = Bytes::from(vm.memory.read(offset, size));
    ctx.state_mut().add_log(Log::new(vm.address, topics, data));
    Ok(())
}
