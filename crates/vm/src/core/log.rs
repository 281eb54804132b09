use alloy::primitives::{Address, Bytes, B256};

/// The [`Log`] struct represents a log emitted by a `LOG0-LOG4` opcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// The account that emitted the log
    pub address: Address,
    /// Up to four indexed topics
    pub topics: Vec<B256>,
    /// The unindexed payload
    pub data: Bytes,
}

impl Log {
    /// Creates a new [`Log`] emitted by `address`.
    pub fn new(address: Address, topics: Vec<B256>, data: Bytes) -> Log {
        Log { address, topics, data }
    }
}
