//! # Envelope Types
//!
//! The request/reply envelope carried over the bus. Payloads are opaque
//! strings; the routing layer never inspects them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Decoding malformed envelope bytes failed.
///
/// Local and non-retryable. Callers must handle this explicitly; it is never
/// folded into a panic or a generic error space.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes did not parse as a valid envelope.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] bincode::Error),
}

/// Encoding an envelope value failed.
#[derive(Debug, Error)]
#[error("envelope serialization failed: {0}")]
pub struct EncodeError(#[from] bincode::Error);

/// Outcome of an expert invocation, carried in every [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The expert callable returned normally.
    Success,
    /// The expert callable failed; `error_message` holds the reason.
    Error,
}

/// An inference request addressed to one expert identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Caller-generated correlation id, echoed back in the reply.
    ///
    /// Unique per outstanding call from a given transport client; reused only
    /// across retries of the same logical call.
    pub request_id: String,
    /// Target expert identity.
    pub model_id: String,
    /// Opaque serialized query.
    pub payload: String,
}

impl Request {
    /// Build a request with a fresh UUIDv4 `request_id`.
    #[must_use]
    pub fn new(model_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            model_id: model_id.into(),
            payload: payload.into(),
        }
    }

    /// Encode to the compact binary wire form.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from the binary wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// The reply produced for exactly one [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Echo of the originating request's id.
    pub request_id: String,
    /// Identity of the expert that produced this reply.
    pub model_id: String,
    /// Opaque serialized result; empty when `status` is [`Status::Error`].
    pub payload: String,
    /// Whether the expert callable succeeded.
    pub status: Status,
    /// Wall-clock milliseconds the responder spent handling the request,
    /// measured responder-side.
    pub latency_ms: u64,
    /// Failure description; non-empty only when `status` is [`Status::Error`].
    pub error_message: String,
}

impl Response {
    /// Build a success reply.
    #[must_use]
    pub fn success(
        request_id: impl Into<String>,
        model_id: impl Into<String>,
        payload: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            model_id: model_id.into(),
            payload: payload.into(),
            status: Status::Success,
            latency_ms,
            error_message: String::new(),
        }
    }

    /// Build an error reply with an empty payload.
    #[must_use]
    pub fn failure(
        request_id: impl Into<String>,
        model_id: impl Into<String>,
        error_message: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            model_id: model_id.into(),
            payload: String::new(),
            status: Status::Error,
            latency_ms,
            error_message: error_message.into(),
        }
    }

    /// Whether the expert callable succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Encode to the compact binary wire form.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from the binary wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
