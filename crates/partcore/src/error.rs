//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building layouts or routing rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bad partition count, missing or wrong-typed column, or malformed row.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The source holds no rows, so min/max and counts are undefined.
    #[error("Source collection is empty")]
    EmptySource,
    /// The value does not fall inside any range partition's bounds.
    #[error("Value {value} is outside all partition bounds")]
    OutOfRange { value: String },
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

/// Validates a requested partition count, returning it as a `usize`.
pub(crate) fn partition_count(partitions: i64) -> Result<usize> {
    if partitions <= 0 {
        return Err(Error::invalid(format!(
            "partition count must be positive, got {partitions}"
        )));
    }
    usize::try_from(partitions)
        .map_err(|_| Error::invalid(format!("partition count {partitions} is too large")))
}
