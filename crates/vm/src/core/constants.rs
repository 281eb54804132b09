//! Gas schedule constants used by the interpreter and the in-process dispatcher.
//!
//! This is a simplified schedule. It follows the shape of the Cancun schedule closely enough to
//! exercise gas accounting across frames, but is not meant to be consensus-accurate.

/// Gas forwarded to the callee on top of the requested gas when a call carries value.
pub const CALL_STIPEND: u64 = 2300;

/// Extra gas charged by `CALL` and `CALLCODE` when value is transferred.
pub const CALL_VALUE_TRANSFER_GAS: u64 = 9000;

/// Extra gas charged by `CALL` when value is sent to an account that does not exist yet.
pub const NEW_ACCOUNT_GAS: u64 = 25000;

/// Cost of touching an account that is already warm.
pub const WARM_ACCESS_GAS: u64 = 100;

/// Cost of touching an account for the first time in the execution.
pub const COLD_ACCOUNT_ACCESS_GAS: u64 = 2600;

/// Cost of reading a storage slot for the first time in the execution.
pub const COLD_SLOAD_GAS: u64 = 2100;

/// Cost of setting a storage slot from zero to non-zero.
pub const SSTORE_SET_GAS: u64 = 20000;

/// Cost of changing a non-zero storage slot.
pub const SSTORE_RESET_GAS: u64 = 2900;

/// Cost per byte of deployed contract code.
pub const CODE_DEPOSIT_GAS: u64 = 200;

/// Cost per word hashed by `SHA3`.
pub const KECCAK_WORD_GAS: u64 = 6;

/// Cost per word copied by the `*COPY` family.
pub const COPY_WORD_GAS: u64 = 3;

/// Cost per byte of log data.
pub const LOG_DATA_GAS: u64 = 8;

/// Cost per word of init code hashed by `CREATE2`.
pub const CREATE2_WORD_GAS: u64 = 6;

/// Cost per word of init code supplied to `CREATE` and `CREATE2`.
pub const INITCODE_WORD_GAS: u64 = 2;

/// Gas charged per byte of exponent by `EXP`.
pub const EXP_BYTE_GAS: u64 = 50;
