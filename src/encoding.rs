//! Hex text handling and fixed-width integer encoders.
//!
//! The fixed-width encoders do not range-check in release builds: callers
//! keep `n` below 2^8, 2^16 and 2^24 respectively.

use crate::error::CompressError;

/// Largest value representable by [`to_bytes3`].
pub const MAX_U24: u32 = (1 << 24) - 1;

/// Two hex characters for a value below 256.
pub fn to_byte(n: u32) -> String {
    debug_assert!(n <= 0xff, "to_byte: {n} does not fit in one byte");
    format!("{n:02x}")
}

/// Four hex characters for a value below 65536.
pub fn to_bytes2(n: u32) -> String {
    debug_assert!(n <= 0xffff, "to_bytes2: {n} does not fit in two bytes");
    format!("{n:04x}")
}

/// Six hex characters for a value below 2^24.
pub fn to_bytes3(n: u32) -> String {
    debug_assert!(n <= MAX_U24, "to_bytes3: {n} does not fit in three bytes");
    format!("{n:06x}")
}

/// Big-endian three-byte form of `n`, the byte layout of [`to_bytes3`].
pub fn u24_be(n: u32) -> [u8; 3] {
    debug_assert!(n <= MAX_U24);
    let [_, a, b, c] = n.to_be_bytes();
    [a, b, c]
}

pub fn strip_hex_prefix(data: &str) -> &str {
    data.strip_prefix("0x")
        .or_else(|| data.strip_prefix("0X"))
        .unwrap_or(data)
}

/// Parse calldata hex (optional `0x`) into bytes.
pub fn decode_calldata(data: &str) -> Result<Vec<u8>, CompressError> {
    let digits = strip_hex_prefix(data.trim());
    if digits.len() % 2 != 0 {
        return Err(CompressError::OddLength { len: digits.len() });
    }
    Ok(hex::decode(digits)?)
}
