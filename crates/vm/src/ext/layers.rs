//! Ready-made [`DispatchLayer`]s.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use tracing::{debug, field::display};

use crate::core::{
    context::ExecutionContext,
    contract::ContractRef,
    dispatch::{CallResult, CreateResult, DispatchLayer, FrameDispatcher},
};

/// Emits a `debug` event for every operation dispatched through it, then forwards to the inner
/// dispatcher unchanged.
///
/// ```
/// use std::sync::Arc;
///
/// use sleipnir_vm::{core::dispatch::FrameDispatcher, ext::layers::TracingLayer};
///
/// let dispatcher: Arc<dyn FrameDispatcher> = Arc::new(TracingLayer::default());
/// ```
#[derive(Debug, Clone)]
pub struct TracingLayer {
    inner: Arc<dyn FrameDispatcher>,
}

impl TracingLayer {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn FrameDispatcher>) -> Self {
        Self { inner }
    }
}

impl Default for TracingLayer {
    fn default() -> Self {
        Self::new(crate::core::dispatch::DefaultDispatcher::shared())
    }
}

fn log_call(op: &str, depth: usize, caller: Address, to: Address, gas: u64, result: &CallResult) {
    debug!(
        op,
        depth,
        %caller,
        %to,
        gas,
        gas_left = result.gas_left,
        error = result.error.as_ref().map(display),
        "dispatched"
    );
}

fn log_create(op: &str, depth: usize, caller: Address, gas: u64, result: &CreateResult) {
    debug!(
        op,
        depth,
        %caller,
        address = %result.address,
        gas,
        gas_left = result.gas_left,
        error = result.error.as_ref().map(display),
        "dispatched"
    );
}

impl DispatchLayer for TracingLayer {
    fn inner(&self) -> &dyn FrameDispatcher {
        self.inner.as_ref()
    }

    fn call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult {
        let result = self.inner.call(ctx, caller, to, input, gas, value);
        log_call("call", ctx.depth(), caller.address(), to, gas, &result);
        result
    }

    fn call_code(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult {
        let result = self.inner.call_code(ctx, caller, to, input, gas, value);
        log_call("call_code", ctx.depth(), caller.address(), to, gas, &result);
        result
    }

    fn delegate_call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        let result = self.inner.delegate_call(ctx, caller, to, input, gas);
        log_call("delegate_call", ctx.depth(), caller.address(), to, gas, &result);
        result
    }

    fn static_call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        let result = self.inner.static_call(ctx, caller, to, input, gas);
        log_call("static_call", ctx.depth(), caller.address(), to, gas, &result);
        result
    }

    fn create(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
    ) -> CreateResult {
        let result = self.inner.create(ctx, caller, init_code, gas, value);
        log_create("create", ctx.depth(), caller.address(), gas, &result);
        result
    }

    fn create2(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
        salt: U256,
    ) -> CreateResult {
        let result = self.inner.create2(ctx, caller, init_code, gas, value, salt);
        log_create("create2", ctx.depth(), caller.address(), gas, &result);
        result
    }
}
