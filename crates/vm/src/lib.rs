//! Sleipnir EVM-style virtual machine
//!
//! This crate provides a compact contract interpreter whose nested message calls and contract
//! creations are routed through a replaceable [`FrameDispatcher`], together with a
//! cross-thread [`AbortFlag`] that lets a supervisor stop an execution at any depth.
//!
//! ```
//! use alloy::primitives::{Address, Bytes, U256};
//! use sleipnir_config::{ChainConfig, ExecutionConfig};
//! use sleipnir_vm::core::{
//!     contract::AccountRef,
//!     context::ExecutionContext,
//!     state::{Account, InMemoryState},
//! };
//!
//! let mut state = InMemoryState::new();
//! let contract = Address::repeat_byte(0x42);
//! // PUSH1 0x2a PUSH1 0x00 MSTORE PUSH1 0x20 PUSH1 0x00 RETURN
//! state.insert_account(
//!     contract,
//!     Account::with_code(Bytes::from_static(&[
//!         0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3,
//!     ])),
//! );
//!
//! let mut ctx = ExecutionContext::new(&mut state, ChainConfig::default(), ExecutionConfig::default());
//! let result = ctx.call(&AccountRef::new(Address::ZERO), contract, Bytes::new(), 100_000, U256::ZERO);
//!
//! assert!(result.is_success());
//! assert_eq!(U256::from_be_slice(&result.output), U256::from(42));
//! ```
//!
//! [`FrameDispatcher`]: crate::core::dispatch::FrameDispatcher
//! [`AbortFlag`]: crate::core::abort::AbortFlag

/// Core VM implementation: execution context, frame dispatch, state, memory, stack and opcodes
pub mod core;

/// Error types for the VM
pub mod error;

/// Extensions built on the dispatch boundary: tracing layers and deadline supervision
pub mod ext;

pub use error::Error;
