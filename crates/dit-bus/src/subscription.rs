//! # Subscription Handle
//!
//! Receiving side of a bus subscription. Dropping the handle unsubscribes.

use crate::bus::Registry;
use crate::message::Message;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from receiving on a subscription.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecvError {
    /// The bus side of the channel went away.
    #[error("subscription closed")]
    Closed,
}

/// Identifies where a subscription is registered inside the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SubKey {
    /// Exact subject or trailing-wildcard pattern.
    Plain { pattern: String },
    /// Queue-group membership on an exact subject.
    Group { subject: String, group: String },
}

/// A subscription handle for receiving messages.
///
/// When dropped, the subscription is removed from the bus registry, so a
/// later publish to the subject can observe the no-responders condition.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Message>,
    registry: Arc<RwLock<Registry>>,
    key: SubKey,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<Message>,
        registry: Arc<RwLock<Registry>>,
        key: SubKey,
        id: u64,
    ) -> Self {
        Self {
            receiver,
            registry,
            key,
            id,
        }
    }

    /// Receive the next message.
    ///
    /// Returns `None` when the bus has been torn down.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Try to receive the next message without waiting.
    ///
    /// `Ok(None)` means no message is currently buffered.
    pub fn try_recv(&mut self) -> Result<Option<Message>, RecvError> {
        match self.receiver.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(RecvError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Ok(mut reg) = self.registry.write() else {
            return;
        };
        reg.remove(&self.key, self.id);
    }
}
