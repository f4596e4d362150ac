//! Single-slot mailbox in front of the playback engine.
//!
//! The mailbox holds at most one message. User commands are
//! [submitted](Mailbox::submit): when the slot is taken the command is
//! dropped on the spot and the caller is told so. A user who presses "skip"
//! five times while the station service is slow gets one skip, not five.
//!
//! Events of the audio output are [delivered](Mailbox::deliver) instead:
//! the producer waits until the slot frees up. An end of stream that got
//! lost would leave playback stalled for good.
//!
//! Both share the same slot, so commands and events are totally ordered.

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Why a message did not make it into the mailbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Another message is waiting; this one was dropped.
    #[error("busy, message dropped")]
    Busy,

    /// The receiving end is gone.
    #[error("closed")]
    Closed,
}

/// Sending half. Cheap to clone.
#[derive(Debug)]
pub struct Mailbox<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Receiving half, owned by the playback engine.
#[derive(Debug)]
pub struct Receiver<T> {
    rx: mpsc::Receiver<T>,
}

/// Creates a mailbox with a single slot.
#[must_use]
pub fn mailbox<T>() -> (Mailbox<T>, Receiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    (Mailbox { tx }, Receiver { rx })
}

impl<T> Mailbox<T> {
    /// Puts a message into the slot without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Busy`] if the slot is taken, in which case the
    /// message is dropped, and [`SubmitError::Closed`] if the receiver is
    /// gone.
    pub fn submit(&self, message: T) -> Result<(), SubmitError> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SubmitError::Busy,
            TrySendError::Closed(_) => SubmitError::Closed,
        })
    }

    /// Puts a message into the slot, waiting for it to free up.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Closed`] if the receiver is gone.
    pub async fn deliver(&self, message: T) -> Result<(), SubmitError> {
        self.tx.send(message).await.map_err(|_| SubmitError::Closed)
    }

    /// Like [`deliver`](Self::deliver), for threads outside the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Closed`] if the receiver is gone.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous context.
    pub fn blocking_deliver(&self, message: T) -> Result<(), SubmitError> {
        self.tx
            .blocking_send(message)
            .map_err(|_| SubmitError::Closed)
    }
}

impl<T> Receiver<T> {
    /// Takes the next message, waiting for one. Returns `None` once every
    /// sender is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}
