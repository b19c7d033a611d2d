//! L2 data-gas cost model
//!
//! Zero bytes are priced at 4 units, every other byte at 16.

pub const ZERO_BYTE_COST: u64 = 4;
pub const NON_ZERO_BYTE_COST: u64 = 16;

/// Cost of a byte slice.
pub fn cost(data: &[u8]) -> u64 {
    data.iter().map(|&b| byte_cost(b)).sum()
}

/// Cost of hex text, with or without a `0x` prefix.
///
/// Counts two-character pairs; a trailing odd character is ignored.
pub fn cost_hex(data: &str) -> u64 {
    let digits = crate::encoding::strip_hex_prefix(data).as_bytes();
    digits
        .chunks_exact(2)
        .map(|pair| if pair == b"00" { ZERO_BYTE_COST } else { NON_ZERO_BYTE_COST })
        .sum()
}

#[inline]
pub fn byte_cost(b: u8) -> u64 {
    if b == 0 {
        ZERO_BYTE_COST
    } else {
        NON_ZERO_BYTE_COST
    }
}
