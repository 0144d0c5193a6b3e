//! # Expert Handle
//!
//! Local proxy for one remote expert identity: knows its derived subject
//! and queue group, and invokes the shared transport client. Handles are
//! built when the dispatch table is constructed and are immutable for the
//! process lifetime.

use dit_proto::{queue_group, request_subject, Response};
use dit_transport::{AskError, TransportClient};
use std::sync::Arc;

/// A local proxy representing one remote expert identity.
#[derive(Clone)]
pub struct ExpertHandle {
    model_id: String,
    subject: String,
    queue_group: String,
    client: Arc<TransportClient>,
}

impl ExpertHandle {
    /// Build a handle for `model_id` over a shared transport client.
    #[must_use]
    pub fn new(model_id: impl Into<String>, client: Arc<TransportClient>) -> Self {
        let model_id = model_id.into();
        Self {
            subject: request_subject(&model_id),
            queue_group: queue_group(&model_id),
            model_id,
            client,
        }
    }

    /// The expert identity this handle targets.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// The subject requests are published to.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The queue group the expert's replicas share.
    #[must_use]
    pub fn queue_group(&self) -> &str {
        &self.queue_group
    }

    /// Dispatch one query to this expert and await its reply.
    pub async fn invoke(&self, payload: &str) -> Result<Response, AskError> {
        self.client.ask(&self.model_id, payload).await
    }
}
