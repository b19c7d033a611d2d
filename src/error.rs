//! Error types for calldata-compress

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("calldata has odd hex length {len}")]
    OddLength { len: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid address {0:?}: expected 20 bytes")]
    InvalidAddress(String),

    #[error("address index {index} out of range (max {max})")]
    IndexOutOfRange { index: i64, max: u32 },

    #[error("address table parse error: {0}")]
    TableParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}
