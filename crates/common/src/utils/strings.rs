use alloy::primitives::{I256, U256};
use eyre::{bail, eyre, Result};
use std::fmt::Write;

/// Reinterprets a 256-bit word as a two's complement signed integer
///
/// ```
/// use sleipnir_common::utils::strings::sign_uint;
/// use alloy::primitives::{I256, U256};
///
/// assert_eq!(sign_uint(U256::MAX), I256::MINUS_ONE);
/// ```
pub fn sign_uint(unsigned: U256) -> I256 {
    I256::from_raw(unsigned)
}

/// Decodes a hex string into a vector of bytes. A leading `0x` and surrounding whitespace are
/// ignored.
///
/// ```
/// use sleipnir_common::utils::strings::decode_hex;
///
/// let hex = "48656c6c6f20576f726c64"; // "Hello World" in hex
/// let result = decode_hex(hex).expect("should decode hex");
/// assert_eq!(result, vec![72, 101, 108, 108, 111, 32, 87, 111, 114, 108, 100]);
/// ```
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);

    if s.len() % 2 != 0 {
        bail!("invalid hex string: odd length {}", s.len());
    }

    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|byte| u8::from_str_radix(byte, 16).ok())
                .ok_or_else(|| eyre!("invalid hex string: {}", s))
        })
        .collect()
}

/// Encodes a slice of bytes into a lowercase hex string without a prefix
///
/// ```
/// use sleipnir_common::utils::strings::encode_hex;
///
/// assert_eq!(encode_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
/// ```
pub fn encode_hex(s: &[u8]) -> String {
    s.iter().fold(String::with_capacity(s.len() * 2), |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Encodes a U256 into a `0x` prefixed hex string, removing leading zeros
///
/// ```
/// use sleipnir_common::utils::strings::encode_hex_reduced;
/// use alloy::primitives::U256;
///
/// assert_eq!(encode_hex_reduced(U256::from(0x1234)), "0x1234");
/// assert_eq!(encode_hex_reduced(U256::ZERO), "0");
/// ```
pub fn encode_hex_reduced(s: U256) -> String {
    if s.is_zero() {
        return "0".to_string();
    }
    format!("{s:#x}")
}
