//! The frame dispatch boundary.
//!
//! Whenever a frame executes `CALL`, `CALLCODE`, `DELEGATECALL`, `STATICCALL`, `CREATE` or
//! `CREATE2`, the interpreter hands the operation to the [`FrameDispatcher`] installed in the
//! [`ExecutionContext`]. [`DefaultDispatcher`] runs the operation in-process; any other
//! implementation may redirect, record, meter or replace it, as long as it honors the result
//! guarantees documented on each method.
//!
//! Partial overrides are written as a [`DispatchLayer`]: the layer supplies its inner dispatcher
//! and overrides only the operations it cares about, everything else forwards unchanged.

use std::{fmt::Debug, sync::Arc};

use alloy::primitives::{Address, Bytes, U256};

use super::{context::ExecutionContext, contract::ContractRef};
use crate::error::Error;

/// The outcome of a message call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallResult {
    /// Return data on success, revert data on [`Error::Revert`], empty otherwise.
    pub output: Bytes,
    /// Gas left over. Never exceeds the gas supplied, and is zero after a runtime failure other
    /// than a revert.
    pub gas_left: u64,
    /// Why the call failed, if it did.
    pub error: Option<Error>,
}

impl CallResult {
    /// A successful call.
    pub fn success(output: Bytes, gas_left: u64) -> Self {
        Self { output, gas_left, error: None }
    }

    /// A failed call that returns `gas_left` and no output.
    pub fn failure(error: Error, gas_left: u64) -> Self {
        Self { output: Bytes::new(), gas_left, error: Some(error) }
    }

    /// Builds the result of a frame that ran to completion or halted with `outcome`.
    pub fn from_outcome(outcome: Result<Bytes, Error>, gas_left: u64) -> Self {
        match outcome {
            Ok(output) => Self::success(output, gas_left),
            Err(Error::Revert(data)) => {
                Self { output: data.clone(), gas_left, error: Some(Error::Revert(data)) }
            }
            Err(error) => Self::failure(error, 0),
        }
    }

    /// Returns true if the call succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if the call observed the cancellation flag.
    pub fn is_aborted(&self) -> bool {
        self.error.as_ref().is_some_and(Error::is_aborted)
    }
}

/// The outcome of a contract creation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateResult {
    /// The deployed code on success, revert data on [`Error::Revert`], empty otherwise.
    pub output: Bytes,
    /// The derived address of the new contract. Set whenever derivation happened, even if the
    /// creation then failed.
    pub address: Address,
    /// Gas left over, with the same guarantees as [`CallResult::gas_left`].
    pub gas_left: u64,
    /// Why the creation failed, if it did.
    pub error: Option<Error>,
}

impl CreateResult {
    /// A creation that failed before an address was derived.
    pub fn failure(error: Error, gas_left: u64) -> Self {
        Self { output: Bytes::new(), address: Address::ZERO, gas_left, error: Some(error) }
    }

    /// Returns true if the creation succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if the creation observed the cancellation flag.
    pub fn is_aborted(&self) -> bool {
        self.error.as_ref().is_some_and(Error::is_aborted)
    }
}

/// Executes the six nested-frame operations on behalf of a calling frame.
///
/// Every operation receives the execution context and the caller as a [`ContractRef`]. The
/// context carries the current depth and read-only flag, which implementations must respect:
/// a frame may not nest deeper than the configured maximum, and nothing may mutate state while
/// the context is read-only.
///
/// Implementations are shared across threads, so they must be `Send + Sync`.
pub trait FrameDispatcher: Send + Sync + Debug {
    /// Executes `to`'s code in `to`'s storage context, moving `value` from the caller to `to`.
    fn call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult;

    /// Executes `to`'s code in the caller's storage context. `value` is checked against the
    /// caller's balance but stays with the caller.
    fn call_code(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult;

    /// Executes `to`'s code in the caller's storage context, keeping the caller's own caller and
    /// value. No value moves.
    fn delegate_call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult;

    /// Executes `to`'s code with the context made read-only for the duration of the call and
    /// every frame nested inside it.
    fn static_call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult;

    /// Creates a contract at the address derived from the caller and its nonce.
    fn create(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
    ) -> CreateResult;

    /// Creates a contract at the address derived from the caller, `salt` and the init code hash.
    fn create2(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
        salt: U256,
    ) -> CreateResult;
}

/// The dispatcher installed when no other is supplied. Every operation runs in-process through
/// the matching method on [`ExecutionContext`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultDispatcher;

impl DefaultDispatcher {
    /// Returns the default dispatcher as a shareable trait object.
    pub fn shared() -> Arc<dyn FrameDispatcher> {
        Arc::new(DefaultDispatcher)
    }
}

impl FrameDispatcher for DefaultDispatcher {
    fn call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult {
        ctx.call(caller, to, input, gas, value)
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
        ctx.call_code(caller, to, input, gas, value)
    }

    fn delegate_call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        ctx.delegate_call(caller, to, input, gas)
    }

    fn static_call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        ctx.static_call(caller, to, input, gas)
    }

    fn create(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
    ) -> CreateResult {
        ctx.create(caller, init_code, gas, value)
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
        ctx.create2(caller, init_code, gas, value, salt)
    }
}

/// A dispatcher that wraps another and overrides only some operations.
///
/// Every [`DispatchLayer`] is a [`FrameDispatcher`]: operations the layer doesn't override are
/// forwarded to [`DispatchLayer::inner`].
///
/// ```
/// use std::sync::Arc;
///
/// use alloy::primitives::{Address, Bytes, U256};
/// use sleipnir_vm::core::{
///     context::ExecutionContext,
///     contract::ContractRef,
///     dispatch::{CallResult, DefaultDispatcher, DispatchLayer, FrameDispatcher},
/// };
///
/// /// Sends every value-bearing call to a fixed sink instead.
/// #[derive(Debug)]
/// struct Sink {
///     inner: Arc<dyn FrameDispatcher>,
///     sink: Address,
/// }
///
/// impl DispatchLayer for Sink {
///     fn inner(&self) -> &dyn FrameDispatcher {
///         self.inner.as_ref()
///     }
///
///     fn call(
///         &self,
///         ctx: &mut ExecutionContext<'_>,
///         caller: &dyn ContractRef,
///         _to: Address,
///         input: Bytes,
///         gas: u64,
///         value: U256,
///     ) -> CallResult {
///         self.inner().call(ctx, caller, self.sink, input, gas, value)
///     }
/// }
///
/// let dispatcher: Arc<dyn FrameDispatcher> =
///     Arc::new(Sink { inner: DefaultDispatcher::shared(), sink: Address::repeat_byte(0x5e) });
/// ```
pub trait DispatchLayer: Send + Sync + Debug {
    /// The dispatcher operations are forwarded to.
    fn inner(&self) -> &dyn FrameDispatcher;

    /// See [`FrameDispatcher::call`].
    fn call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult {
        self.inner().call(ctx, caller, to, input, gas, value)
    }

    /// See [`FrameDispatcher::call_code`].
    fn call_code(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult {
        self.inner().call_code(ctx, caller, to, input, gas, value)
    }

    /// See [`FrameDispatcher::delegate_call`].
    fn delegate_call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        self.inner().delegate_call(ctx, caller, to, input, gas)
    }

    /// See [`FrameDispatcher::static_call`].
    fn static_call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        self.inner().static_call(ctx, caller, to, input, gas)
    }

    /// See [`FrameDispatcher::create`].
    fn create(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
    ) -> CreateResult {
        self.inner().create(ctx, caller, init_code, gas, value)
    }

    /// See [`FrameDispatcher::create2`].
    fn create2(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
        salt: U256,
    ) -> CreateResult {
        self.inner().create2(ctx, caller, init_code, gas, value, salt)
    }
}

impl<L: DispatchLayer> FrameDispatcher for L {
    fn call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> CallResult {
        DispatchLayer::call(self, ctx, caller, to, input, gas, value)
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
        DispatchLayer::call_code(self, ctx, caller, to, input, gas, value)
    }

    fn delegate_call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        DispatchLayer::delegate_call(self, ctx, caller, to, input, gas)
    }

    fn static_call(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> CallResult {
        DispatchLayer::static_call(self, ctx, caller, to, input, gas)
    }

    fn create(
        &self,
        ctx: &mut ExecutionContext<'_>,
        caller: &dyn ContractRef,
        init_code: Bytes,
        gas: u64,
        value: U256,
    ) -> CreateResult {
        DispatchLayer::create(self, ctx, caller, init_code, gas, value)
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
        DispatchLayer::create2(self, ctx, caller, init_code, gas, value, salt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_result_from_outcome() {
        let ok = CallResult::from_outcome(Ok(Bytes::from_static(b"ok")), 10);
        assert!(ok.is_success());
        assert_eq!(ok.gas_left, 10);

        let reverted = CallResult::from_outcome(Err(Error::Revert(Bytes::from_static(b"no"))), 7);
        assert_eq!(reverted.output.as_ref(), b"no");
        assert_eq!(reverted.gas_left, 7);
        assert!(reverted.error.as_ref().is_some_and(Error::is_revert));

        let failed = CallResult::from_outcome(Err(Error::InvalidOpcode(0xfe)), 7);
        assert!(failed.output.is_empty());
        assert_eq!(failed.gas_left, 0);

        let aborted = CallResult::from_outcome(Err(Error::ExecutionAborted), 7);
        assert!(aborted.is_aborted());
        assert_eq!(aborted.gas_left, 0);
    }
}
