use thiserror::Error;

use crate::index::Token;

/// Errors emitted by the spatial index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Configuration values that cannot be used (e.g. non-positive cell size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// An optimistic transaction kept conflicting with a concurrent writer.
    #[error("transaction on {token:?} gave up after {attempts} conflicting attempts")]
    RetryLimitExceeded { token: Token, attempts: u32 },
}
