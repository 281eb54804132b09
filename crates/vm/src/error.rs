use alloy::primitives::Bytes;

/// Error type for the VM module.
///
/// Every variant except [`Error::ExecutionAborted`] is local to the frame that produced it and
/// is reported to the calling frame as an ordinary failed call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The sender cannot cover the value being transferred
    #[error("insufficient balance for transfer")]
    InsufficientBalance,
    /// The frame ran out of gas
    #[error("out of gas")]
    InsufficientGas,
    /// The nesting limit for message calls and creations was reached
    #[error("max call depth exceeded")]
    MaxCallDepthExceeded,
    /// A state mutation was attempted inside a read-only context
    #[error("state modification in static context")]
    StaticContextViolation,
    /// The frame executed `REVERT`, carrying its output
    #[error("execution reverted")]
    Revert(Bytes),
    /// The derived creation address already holds code or a non-zero nonce
    #[error("contract address collision")]
    AddressCollision,
    /// The shared cancellation flag was observed set
    #[error("execution aborted")]
    ExecutionAborted,
    /// An opcode needed more stack items than were available
    #[error("stack underflow")]
    StackUnderflow,
    /// The stack grew past 1024 items
    #[error("stack limit reached")]
    StackOverflow,
    /// The opcode is undefined, or not active in the configured hard fork
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),
    /// The jump target is not a `JUMPDEST`
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),
    /// A precompiled contract failed
    #[error("precompile failed")]
    PrecompileFailure,
    /// Deployed code exceeds the configured maximum size
    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,
    /// Deployed code starts with the reserved `0xEF` byte
    #[error("invalid code: must not begin with 0xef")]
    InvalidCodePrefix,
    /// The creator's nonce cannot be incremented
    #[error("nonce overflow")]
    NonceOverflow,
    /// `RETURNDATACOPY` read past the end of the return data buffer
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,
}

impl Error {
    /// Returns true if this is an explicit revert.
    pub fn is_revert(&self) -> bool {
        matches!(self, Error::Revert(_))
    }

    /// Returns true if this error must terminate the entire execution.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::ExecutionAborted)
    }

    /// Returns the revert payload, if any.
    pub fn revert_data(&self) -> Option<&Bytes> {
        match self {
            Error::Revert(data) => Some(data),
            _ => None,
        }
    }
}

/// Result alias for fallible VM operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let revert = Error::Revert(Bytes::from_static(b"nope"));
        assert!(revert.is_revert());
        assert!(!revert.is_aborted());
        assert_eq!(revert.revert_data().map(|d| d.as_ref()), Some(&b"nope"[..]));

        assert!(Error::ExecutionAborted.is_aborted());
        assert!(Error::InsufficientGas.revert_data().is_none());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::InvalidOpcode(0xfe).to_string(), "invalid opcode: 0xfe");
        assert_eq!(Error::InvalidJump(12).to_string(), "invalid jump destination: 12");
    }
}
