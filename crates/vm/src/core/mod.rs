/// Cross-thread cancellation flag
pub mod abort;

/// Gas constants used throughout the VM implementation
pub mod constants;

/// The per-execution context and the in-process dispatch operations
pub mod context;

/// References to the account a frame dispatches on behalf of
pub mod contract;

/// The frame dispatcher seam and its results
pub mod dispatch;

/// Log implementation for event handling
pub mod log;

/// Memory implementation for VM memory management
pub mod memory;

/// Opcode definitions and static opcode metadata
pub mod opcodes;

/// Precompiled contracts
pub mod precompile;

/// Stack implementation for the VM
pub mod stack;

/// Journaled world state
pub mod state;

/// Storage implementation for contract storage
pub mod storage;

/// The single-frame interpreter
pub mod vm;
