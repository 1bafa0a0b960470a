//! Error types for compressed integer sets.

use thiserror::Error;

/// Error variants for compressed integer set operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An element was provided that exceeds the highest representable
    /// integer of the encoding.
    #[error("element out of range: {0}")]
    ElementOutOfRange(u32),

    /// A positional index was provided that is out of `[0, len)`.
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// An argument violated a documented precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A byte buffer could not be decoded into a valid set.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// A specialized Result type for set operations.
pub type Result<T> = std::result::Result<T, Error>;
