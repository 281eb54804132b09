//! The interpreter for a single frame.
//!
//! [`VM`] executes one frame's code against an
//! [`ExecutionContext`](crate::core::context::ExecutionContext). Nested calls and creations made
//! by the code leave the frame through the context's dispatcher.

mod core;
mod execution;

/// Opcode handlers organized by category.
pub mod handlers;

pub use self::core::VM;
pub use execution::Control;
