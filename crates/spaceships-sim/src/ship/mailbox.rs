//! Bounded per-ship mailboxes.

use tokio::sync::mpsc::{self, error::TrySendError};

use spaceships_core::events::ShipMessage;
use spaceships_core::types::ShipId;

use crate::error::ShipError;

/// Sending half of a ship's mailbox, published in its index record.
#[derive(Debug, Clone)]
pub struct Mailbox {
    owner: ShipId,
    tx: mpsc::Sender<ShipMessage>,
}

/// Outcome of a send that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The receiver already finished; the message has nobody to affect.
    Closed,
}

pub fn channel(owner: ShipId, capacity: usize) -> (Mailbox, mpsc::Receiver<ShipMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Mailbox { owner, tx }, rx)
}

impl Mailbox {
    /// Enqueue without waiting. A full mailbox is an error, never a drop.
    pub fn send(&self, message: ShipMessage) -> Result<Delivery, ShipError> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(Delivery::Delivered),
            Err(TrySendError::Full(_)) => Err(ShipError::MailboxFull { target: self.owner }),
            Err(TrySendError::Closed(_)) => Ok(Delivery::Closed),
        }
    }
}
