use alloy::primitives::{Address, U256};

/// A reference to the account on whose behalf a frame dispatches an operation.
///
/// Dispatchers receive the caller as `&dyn ContractRef`, so the caller is always the live frame
/// (or account) itself rather than a copy of its fields.
pub trait ContractRef {
    /// The address of the calling account.
    fn address(&self) -> Address;

    /// The account that invoked the calling frame. `DELEGATECALL` forwards it as the callee's
    /// caller.
    fn caller(&self) -> Address {
        self.address()
    }

    /// The value the calling frame was invoked with. `DELEGATECALL` forwards it as the callee's
    /// value.
    fn value(&self) -> U256 {
        U256::ZERO
    }
}

/// A plain account reference, typically an externally-owned account starting an execution.
///
/// ```
/// use alloy::primitives::{Address, U256};
/// use sleipnir_vm::core::contract::{AccountRef, ContractRef};
///
/// let sender = AccountRef::new(Address::repeat_byte(0x11));
/// assert_eq!(sender.address(), Address::repeat_byte(0x11));
/// assert_eq!(sender.caller(), sender.address());
/// assert_eq!(sender.value(), U256::ZERO);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AccountRef(pub Address);

impl AccountRef {
    /// Creates a reference to `address`.
    pub const fn new(address: Address) -> Self {
        Self(address)
    }
}

impl ContractRef for AccountRef {
    fn address(&self) -> Address {
        self.0
    }
}

impl From<Address> for AccountRef {
    fn from(address: Address) -> Self {
        Self(address)
    }
}
