//! Precompiled contracts.
//!
//! Precompiles live at the low addresses `0x01..=0x0a`. Only the ones listed in
//! [`PRECOMPILE_TABLE`] are executed natively; calls to the remaining addresses behave like calls
//! to empty accounts.

use alloy::primitives::{Address, Bytes};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Information about a precompile, such as name, pricing and implementation.
#[derive(Debug, Clone, Copy)]
pub struct PrecompileInfo {
    /// Name
    name: &'static str,
    /// Flat gas charged on every invocation.
    base_gas: u64,
    /// Gas charged per 32-byte word of input, rounded up.
    word_gas: u64,
    /// The native implementation.
    run: fn(&[u8]) -> Bytes,
}

impl PrecompileInfo {
    const fn new(name: &'static str, run: fn(&[u8]) -> Bytes) -> Self {
        Self { name, base_gas: 0, word_gas: 0, run }
    }

    /// Returns the name of the precompile.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the gas charged for an input of `input_len` bytes.
    ///
    /// ```
    /// use sleipnir_vm::core::precompile::{precompile, IDENTITY};
    ///
    /// let identity = precompile(&IDENTITY).expect("identity is a precompile");
    /// assert_eq!(identity.gas_cost(0), 15);
    /// assert_eq!(identity.gas_cost(33), 21);
    /// ```
    pub fn gas_cost(&self, input_len: usize) -> u64 {
        let words = input_len.div_ceil(32) as u64;
        self.base_gas.saturating_add(self.word_gas.saturating_mul(words))
    }

    /// Runs the precompile with `gas` available, returning its output and the gas left over.
    /// Fails with [`Error::PrecompileFailure`] when `gas` doesn't cover the cost.
    pub fn execute(&self, input: &[u8], gas: u64) -> Result<(Bytes, u64)> {
        let cost = self.gas_cost(input.len());
        if cost > gas {
            return Err(Error::PrecompileFailure);
        }
        Ok(((self.run)(input), gas - cost))
    }
}

/// Sets the flat gas charged on every invocation.
#[inline]
const fn base_gas(mut info: PrecompileInfo, gas: u64) -> PrecompileInfo {
    info.base_gas = gas;
    info
}

/// Sets the gas charged per word of input.
#[inline]
const fn word_gas(mut info: PrecompileInfo, gas: u64) -> PrecompileInfo {
    info.word_gas = gas;
    info
}

fn sha2_256(input: &[u8]) -> Bytes {
    Bytes::from(Sha256::digest(input).to_vec())
}

fn identity(input: &[u8]) -> Bytes {
    Bytes::copy_from_slice(input)
}

macro_rules! precompiles {
    ($($val:literal => $name:ident => $run:ident => $($modifier:ident $(( $($modifier_arg:expr),* ))?),*);* $(;)?) => {
        // create an address constant for each precompile
        $(
            #[doc = concat!("The `", stringify!($val), "` (\"", stringify!($name),"\") precompile.")]
            pub const $name: Address = Address::with_last_byte($val);
        )*

        /// Maps the last address byte of each implemented precompile to its info.
        pub const PRECOMPILE_TABLE: [Option<PrecompileInfo>; 11] = {
            let mut map = [None; 11];
            let mut prev: u8 = 0;
            $(
                let val: u8 = $val;
                assert!(val > prev, "precompiles must be sorted in ascending order");
                prev = val;
                let info = PrecompileInfo::new(stringify!($name), $run);
                $(
                let info = $modifier(info, $($($modifier_arg),*)?);
                )*
                map[$val] = Some(info);
            )*
            let _ = prev;
            map
        };
    }
}

precompiles! {
    0x02 => SHA2_256 => sha2_256 => base_gas(60), word_gas(12);
    0x04 => IDENTITY => identity => base_gas(15), word_gas(3);
}

/// Returns the precompile deployed at `address`, if any.
pub fn precompile(address: &Address) -> Option<PrecompileInfo> {
    let (prefix, last) = address.0.split_at(19);
    if prefix.iter().any(|byte| *byte != 0) {
        return None;
    }
    PRECOMPILE_TABLE.get(last[0] as usize).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleipnir_common::utils::strings::encode_hex;

    #[test]
    fn test_lookup() {
        assert_eq!(precompile(&IDENTITY).map(|p| p.name()), Some("IDENTITY"));
        assert_eq!(precompile(&SHA2_256).map(|p| p.name()), Some("SHA2_256"));
        assert!(precompile(&Address::with_last_byte(0x01)).is_none());
        assert!(precompile(&Address::with_last_byte(0x0b)).is_none());
        assert!(precompile(&Address::repeat_byte(0x04)).is_none());
    }

    #[test]
    fn test_identity() {
        let identity = precompile(&IDENTITY).expect("missing identity");
        let (output, gas_left) = identity.execute(b"hello", 100).expect("identity failed");
        assert_eq!(output.as_ref(), b"hello");
        assert_eq!(gas_left, 100 - 18);
    }

    #[test]
    fn test_identity_out_of_gas() {
        let identity = precompile(&IDENTITY).expect("missing identity");
        assert_eq!(identity.execute(&[0u8; 64], 20), Err(Error::PrecompileFailure));
    }

    #[test]
    fn test_sha2_256() {
        let sha = precompile(&SHA2_256).expect("missing sha2");
        let (output, gas_left) = sha.execute(b"", 72).expect("sha2 failed");
        assert_eq!(
            encode_hex(&output),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(gas_left, 12);
    }
}
