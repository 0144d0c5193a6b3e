//! # Expert Callable Capability
//!
//! The black-box contract the responder binds to: `invoke(payload) -> result`.
//! Implementations may run a model in-process or forward to a remote service;
//! the responder treats both identically.

use crate::client::AskError;
use async_trait::async_trait;
use thiserror::Error;

/// Failure of an expert invocation.
///
/// A responder never lets one of these escape as an unhandled fault: it is
/// always converted into an `Error`-status response and replied.
#[derive(Debug, Error)]
pub enum ExpertError {
    /// The expert has no model bound yet.
    #[error("model not loaded")]
    NotLoaded,

    /// The expert's own logic failed.
    #[error("{0}")]
    Execution(String),

    /// A remote expert replied with an `Error`-status response.
    #[error("remote expert error: {0}")]
    Remote(String),

    /// The remote invocation failed at the transport level.
    #[error(transparent)]
    Transport(#[from] AskError),
}

/// A capability that answers inference queries for one identity.
#[async_trait]
pub trait ExpertCallable: Send + Sync {
    /// Run the expert on an opaque payload.
    async fn invoke(&self, payload: &str) -> Result<String, ExpertError>;
}
