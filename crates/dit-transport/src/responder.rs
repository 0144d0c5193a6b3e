//! # Responder Service
//!
//! Expert-side half of the protocol. Subscribes to `models.<model_id>` as a
//! member of `ditq.<model_id>` and answers every decoded request with
//! exactly one reply, regardless of how the expert callable fares. Failing
//! to reply is indistinguishable from the bus dropping the message and
//! forces the caller into its full timeout budget, so the reply is
//! unconditional.
//!
//! Admission is bounded: a semaphore permit is acquired before the next
//! message is pulled, so excess requests wait in the bus's queue-group
//! dispatch rather than in local memory.

use crate::callable::ExpertCallable;
use dit_bus::{Message, MessageBus};
use dit_proto::{queue_group, request_subject, Request, Response};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Responder tuning knobs.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Queue group to join; derived from the model id when `None`.
    pub queue_group: Option<String>,
    /// Maximum concurrent expert invocations.
    pub max_inflight: usize,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            queue_group: None,
            max_inflight: 64,
        }
    }
}

/// Expert-side subscriber that invokes a bound callable and always replies.
///
/// Stateless beyond the admission counter; reaches its terminal state only
/// on explicit [`Responder::shutdown`], which drains in-flight handlers
/// before the run loop returns.
pub struct Responder {
    bus: Arc<dyn MessageBus>,
    model_id: String,
    queue: String,
    expert: Arc<dyn ExpertCallable>,
    limiter: Arc<Semaphore>,
    max_inflight: usize,
    shutdown_tx: watch::Sender<bool>,
}

impl Responder {
    /// Bind an expert callable to a model identity on the given bus.
    #[must_use]
    pub fn new(bus: Arc<dyn MessageBus>, model_id: impl Into<String>, expert: Arc<dyn ExpertCallable>) -> Self {
        Self::with_config(bus, model_id, expert, ResponderConfig::default())
    }

    /// Bind with explicit queue-group and admission settings.
    #[must_use]
    pub fn with_config(
        bus: Arc<dyn MessageBus>,
        model_id: impl Into<String>,
        expert: Arc<dyn ExpertCallable>,
        config: ResponderConfig,
    ) -> Self {
        let model_id = model_id.into();
        let queue = config
            .queue_group
            .unwrap_or_else(|| queue_group(&model_id));
        let max_inflight = config.max_inflight.max(1);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            bus,
            model_id,
            queue,
            expert,
            limiter: Arc::new(Semaphore::new(max_inflight)),
            max_inflight,
            shutdown_tx,
        }
    }

    /// The identity this responder answers for.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Request shutdown: the run loop stops accepting, drains in-flight
    /// handlers, then returns.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Consume requests until shutdown.
    ///
    /// This should be spawned as a background task.
    pub async fn run(self: Arc<Self>) {
        let subject = request_subject(&self.model_id);
        let mut subscription = self.bus.queue_subscribe(&subject, &self.queue);
        let mut shutdown = self.shutdown_tx.subscribe();
        info!(
            model_id = %self.model_id,
            subject = %subject,
            queue = %self.queue,
            max_inflight = self.max_inflight,
            "responder subscribed"
        );

        loop {
            // Admission limit: take a permit before pulling the next message
            // so backpressure lands on the bus, not in local memory.
            let permit = tokio::select! {
                permit = Arc::clone(&self.limiter).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.changed() => break,
            };

            let msg = tokio::select! {
                msg = subscription.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
                _ = shutdown.changed() => break,
            };

            let this = Arc::clone(&self);
            tokio::spawn(async move {
                this.handle(msg).await;
                drop(permit);
            });
        }

        // Drain: wait for every in-flight handler to release its permit.
        let _ = self.limiter.acquire_many(self.max_inflight as u32).await;
        info!(model_id = %self.model_id, "responder stopped");
    }

    /// Handle one delivered request. Produces exactly one reply whenever a
    /// reply destination exists; a message without one is the sole
    /// unconditional-drop case.
    async fn handle(&self, msg: Message) {
        let Some(reply_to) = msg.reply else {
            warn!(
                model_id = %self.model_id,
                subject = %msg.subject,
                "request without reply destination dropped"
            );
            return;
        };

        let request = match Request::decode(&msg.payload) {
            Ok(request) => request,
            Err(e) => {
                // The original request id is unrecoverable; synthesize one so
                // the field stays non-empty and log-correlatable.
                let response = Response::failure(
                    Uuid::new_v4().to_string(),
                    self.model_id.clone(),
                    format!("bad request: {e}"),
                    0,
                );
                warn!(model_id = %self.model_id, error = %e, "undecodable request, replying with error");
                self.reply(&reply_to, &response).await;
                return;
            }
        };

        debug!(
            model_id = %self.model_id,
            request_id = %request.request_id,
            "request received"
        );

        // Latency covers the expert invocation only, not envelope decoding.
        let started = Instant::now();
        let outcome = self.expert.invoke(&request.payload).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let response = match outcome {
            Ok(payload) => {
                Response::success(request.request_id, self.model_id.clone(), payload, latency_ms)
            }
            Err(e) => Response::failure(
                request.request_id,
                self.model_id.clone(),
                e.to_string(),
                latency_ms,
            ),
        };

        debug!(
            model_id = %self.model_id,
            request_id = %response.request_id,
            status = ?response.status,
            latency_ms,
            "replying"
        );
        self.reply(&reply_to, &response).await;
    }

    async fn reply(&self, reply_to: &str, response: &Response) {
        let data = match response.encode() {
            Ok(data) => data,
            Err(e) => {
                error!(model_id = %self.model_id, error = %e, "response encoding failed");
                return;
            }
        };
        if let Err(e) = self.bus.publish(reply_to, data).await {
            // The caller may have timed out and dropped its inbox; nothing
            // more to do than record it.
            warn!(
                model_id = %self.model_id,
                request_id = %response.request_id,
                error = %e,
                "reply publish failed"
            );
        }
    }
}
