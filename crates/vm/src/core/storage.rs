use alloy::primitives::U256;
use hashbrown::HashMap;

use super::constants::{
    COLD_SLOAD_GAS, SSTORE_RESET_GAS, SSTORE_SET_GAS, WARM_ACCESS_GAS,
};

/// The [`Storage`] struct represents the persistent storage of a single account. \
/// \
/// Zero values are never stored, so an absent key and a key set to zero are indistinguishable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Storage {
    slots: HashMap<U256, U256>,
}

impl Storage {
    /// Creates a new, empty [`Storage`] struct.
    pub fn new() -> Storage {
        Storage { slots: HashMap::new() }
    }

    /// Store a key-value pair, returning the value previously held by `key`.
    ///
    /// ```
    /// use alloy::primitives::U256;
    /// use sleipnir_vm::core::storage::Storage;
    ///
    /// let mut storage = Storage::new();
    /// assert_eq!(storage.store(U256::from(1), U256::from(2)), U256::ZERO);
    /// assert_eq!(storage.store(U256::from(1), U256::ZERO), U256::from(2));
    /// assert!(storage.is_empty());
    /// ```
    pub fn store(&mut self, key: U256, value: U256) -> U256 {
        let previous = if value.is_zero() {
            self.slots.remove(&key)
        } else {
            self.slots.insert(key, value)
        };
        previous.unwrap_or_default()
    }

    /// Load the value held by `key`, or zero if it was never written.
    pub fn load(&self, key: U256) -> U256 {
        self.slots.get(&key).copied().unwrap_or_default()
    }

    /// Returns the number of non-zero slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if every slot is zero.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over the non-zero slots in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&U256, &U256)> {
        self.slots.iter()
    }
}

/// Calculate the cost of reading a slot.
///
/// ```
/// use sleipnir_vm::core::storage::access_cost;
///
/// assert_eq!(access_cost(false), 2100);
/// assert_eq!(access_cost(true), 100);
/// ```
pub fn access_cost(warm: bool) -> u64 {
    if warm {
        WARM_ACCESS_GAS
    } else {
        COLD_SLOAD_GAS
    }
}

/// Calculate the cost of writing `new` to a slot currently holding `current`.
///
/// ```
/// use alloy::primitives::U256;
/// use sleipnir_vm::core::storage::storage_cost;
///
/// // setting a fresh slot on a cold key
/// assert_eq!(storage_cost(U256::ZERO, U256::from(1), false), 22100);
/// // no-op write on a warm key
/// assert_eq!(storage_cost(U256::from(1), U256::from(1), true), 100);
/// ```
pub fn storage_cost(current: U256, new: U256, warm: bool) -> u64 {
    let base = if current == new {
        WARM_ACCESS_GAS
    } else if current.is_zero() {
        SSTORE_SET_GAS
    } else {
        SSTORE_RESET_GAS
    };

    if warm {
        base
    } else {
        base + COLD_SLOAD_GAS
    }
}
