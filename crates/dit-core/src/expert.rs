//! # Expert Callable Implementations
//!
//! The two concrete forms of the expert capability: a local in-process
//! function and a remote invocation over the transport client, plus a
//! stats-recording wrapper around the remote form.

use async_trait::async_trait;
use dit_proto::Status;
use dit_router::ExpertStatsTracker;
use dit_transport::{ExpertCallable, ExpertError, TransportClient};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// An expert backed by an in-process function.
pub struct LocalExpert<F>
where
    F: Fn(&str) -> Result<String, ExpertError> + Send + Sync,
{
    func: F,
}

impl<F> LocalExpert<F>
where
    F: Fn(&str) -> Result<String, ExpertError> + Send + Sync,
{
    /// Wrap a function as an expert callable.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> ExpertCallable for LocalExpert<F>
where
    F: Fn(&str) -> Result<String, ExpertError> + Send + Sync,
{
    async fn invoke(&self, payload: &str) -> Result<String, ExpertError> {
        (self.func)(payload)
    }
}

/// An expert reached over the transport client.
///
/// An `Error`-status response becomes [`ExpertError::Remote`]; transport
/// faults (timeout, no responders, decode) become
/// [`ExpertError::Transport`].
pub struct RemoteExpert {
    client: Arc<TransportClient>,
    model_id: String,
}

impl RemoteExpert {
    /// Target `model_id` through `client`.
    #[must_use]
    pub fn new(client: Arc<TransportClient>, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl ExpertCallable for RemoteExpert {
    async fn invoke(&self, payload: &str) -> Result<String, ExpertError> {
        let response = self.client.ask(&self.model_id, payload).await?;
        match response.status {
            Status::Success => Ok(response.payload),
            Status::Error => Err(ExpertError::Remote(response.error_message)),
        }
    }
}

/// A [`RemoteExpert`] that records latency and success/failure into a shared
/// [`ExpertStatsTracker`] after each call, feeding load-aware routing.
pub struct TrackedRemoteExpert {
    inner: RemoteExpert,
    model_id: String,
    stats: Arc<ExpertStatsTracker>,
}

impl TrackedRemoteExpert {
    /// Target `model_id` through `client`, recording into `stats`.
    #[must_use]
    pub fn new(
        client: Arc<TransportClient>,
        model_id: impl Into<String>,
        stats: Arc<ExpertStatsTracker>,
    ) -> Self {
        let model_id = model_id.into();
        Self {
            inner: RemoteExpert::new(client, model_id.clone()),
            model_id,
            stats,
        }
    }
}

#[async_trait]
impl ExpertCallable for TrackedRemoteExpert {
    async fn invoke(&self, payload: &str) -> Result<String, ExpertError> {
        self.stats.record_request(&self.model_id);
        let started = Instant::now();
        let outcome = self.inner.invoke(payload).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.stats
            .record_result(&self.model_id, latency_ms, outcome.is_ok());
        debug!(
            model_id = %self.model_id,
            latency_ms,
            success = outcome.is_ok(),
            "tracked invocation recorded"
        );
        outcome
    }
}
