use thiserror::Error;

use crate::layout::PhysicalAddress;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("coordinate ({row}, {col}) is outside a {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("tile input has {0} elements, expected exactly 8x8")]
    InvalidTileSize(usize),

    #[error("unsupported dimensions {width}x{height}: {reason}")]
    UnsupportedDimensions {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    #[error("address map has no entry for scan-order tile {tile}")]
    AddressMapIncomplete { tile: usize },

    #[error("packed buffer is {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("tiles {first} and {second} are both mapped to {address}")]
    DuplicateAddress {
        address: PhysicalAddress,
        first: usize,
        second: usize,
    },

    #[error("invalid tile partition: {0}")]
    InvalidPartition(String),

    #[error("pattern table line {line}: {message}")]
    PatternSyntax { line: usize, message: String },
}

impl CodecError {
    pub(crate) fn dimensions(width: usize, height: usize, reason: &'static str) -> Self {
        CodecError::UnsupportedDimensions {
            width: u32::try_from(width).unwrap_or(u32::MAX),
            height: u32::try_from(height).unwrap_or(u32::MAX),
            reason,
        }
    }
}

pub type Result<T, E = CodecError> = std::result::Result<T, E>;
