use thiserror::Error;

use spaceships_core::types::ShipId;
use spaceships_index::{IndexError, Token};

/// Failure of a ship's per-tick processing. Ends that ship's task only.
#[derive(Debug, Error)]
pub enum ShipError {
    /// A combat message could not be enqueued. Dropping it would change the
    /// outcome of an engagement, so the send fails instead.
    #[error("mailbox of {target} is full")]
    MailboxFull { target: ShipId },
    /// The ship's own record disappeared from the index.
    #[error("record {token:?} of {ship} vanished from the index")]
    RecordVanished { ship: ShipId, token: Token },
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Rejected simulation parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::Invalid { field, reason }
    }
}
