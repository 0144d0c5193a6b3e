//! # Bus Message
//!
//! The unit of delivery: opaque payload bytes plus subject and an optional
//! reply destination.

/// A message delivered to a subscriber.
#[derive(Debug, Clone)]
pub struct Message {
    /// Subject the message was published to.
    pub subject: String,
    /// Reply destination attached by the publisher, if any.
    pub reply: Option<String>,
    /// Opaque payload bytes. The bus never inspects these.
    pub payload: Vec<u8>,
}

impl Message {
    /// Build a message without a reply destination.
    #[must_use]
    pub fn new(subject: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            reply: None,
            payload,
        }
    }

    /// Build a message carrying a reply destination.
    #[must_use]
    pub fn with_reply(
        subject: impl Into<String>,
        reply: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            subject: subject.into(),
            reply: Some(reply.into()),
            payload,
        }
    }
}
