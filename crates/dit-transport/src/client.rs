//! # Transport Client
//!
//! Publisher side of the request/reply protocol. One client owns one bus
//! connection and one background task that demultiplexes replies from a
//! muxed inbox (`_inbox.<client>.*`) into per-call one-shot slots. Callers
//! may issue `ask` concurrently from any task; calls synchronize only on
//! the pending-call table.

use dit_bus::{BusError, Message, MessageBus};
use dit_proto::{inbox_prefix, request_subject, DecodeError, EncodeError, Request, Response};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors surfaced by [`TransportClient::ask`].
#[derive(Debug, Error)]
pub enum AskError {
    /// No reply arrived within the timeout budget across all retries.
    ///
    /// Ambiguous between a slow expert and a lost message.
    #[error("timed out after {attempts} attempt(s)")]
    Timeout {
        /// Number of attempts made (initial publish plus retries).
        attempts: u32,
    },

    /// The bus reported zero subscribers on the target subject.
    ///
    /// Signals a deployment/config mismatch rather than slowness; never
    /// retried, since retrying a guaranteed-absent listener wastes the
    /// budget.
    #[error("no responders on subject {subject}")]
    NoResponders {
        /// The subject that had no subscribers.
        subject: String,
    },

    /// The reply bytes did not decode as a response envelope.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The request could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The connection or the background demultiplexer is gone.
    #[error("transport connection closed")]
    ConnectionClosed,
}

/// Per-call timeout and retry budget.
#[derive(Debug, Clone, Copy)]
pub struct AskOptions {
    /// How long to wait for a reply per attempt.
    pub timeout: Duration,
    /// How many times to re-publish after a timed-out attempt.
    pub max_retries: u32,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(800),
            max_retries: 1,
        }
    }
}

type PendingCalls = Arc<Mutex<HashMap<String, oneshot::Sender<Message>>>>;

/// Publisher-side transport client.
///
/// Holds the one piece of mutable shared state in the protocol: the
/// pending-call table mapping correlation tokens to result slots. The
/// background demultiplexer resolves slots; `ask` callers await them.
pub struct TransportClient {
    bus: Arc<dyn MessageBus>,
    inbox: String,
    pending: PendingCalls,
    defaults: AskOptions,
    demux: JoinHandle<()>,
}

impl TransportClient {
    /// Create a client over a bus connection with default ask options.
    #[must_use]
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self::with_options(bus, AskOptions::default())
    }

    /// Create a client with explicit default timeout/retry options.
    #[must_use]
    pub fn with_options(bus: Arc<dyn MessageBus>, defaults: AskOptions) -> Self {
        let inbox = inbox_prefix();
        let pending: PendingCalls = Arc::new(Mutex::new(HashMap::new()));

        let subscription = bus.subscribe(&format!("{inbox}.*"));
        let demux = tokio::spawn(demux_loop(subscription, Arc::clone(&pending)));

        Self {
            bus,
            inbox,
            pending,
            defaults,
            demux,
        }
    }

    /// Send one request to `models.<model_id>` and await the correlated
    /// reply, using the client's default options.
    pub async fn ask(&self, model_id: &str, payload: &str) -> Result<Response, AskError> {
        self.ask_with_options(model_id, payload, self.defaults).await
    }

    /// Send one request with explicit timeout/retry options.
    ///
    /// Retries re-publish the same `request_id` under a fresh reply
    /// destination, after a jittered exponential backoff.
    pub async fn ask_with_options(
        &self,
        model_id: &str,
        payload: &str,
        options: AskOptions,
    ) -> Result<Response, AskError> {
        let request = Request::new(model_id, payload);
        let data = request.encode()?;
        let subject = request_subject(model_id);

        let mut attempt: u32 = 0;
        loop {
            let token = Uuid::new_v4().simple().to_string();
            let reply_subject = format!("{}.{}", self.inbox, token);
            let slot = self.register(&token)?;

            if let Err(e) = self
                .bus
                .publish_with_reply(&subject, &reply_subject, data.clone())
                .await
            {
                self.deregister(&token);
                return Err(match e {
                    BusError::NoResponders { subject } => AskError::NoResponders { subject },
                    BusError::Closed => AskError::ConnectionClosed,
                });
            }

            match tokio::time::timeout(options.timeout, slot).await {
                Ok(Ok(msg)) => {
                    let response = Response::decode(&msg.payload)?;
                    debug!(
                        request_id = %response.request_id,
                        model_id = %response.model_id,
                        latency_ms = response.latency_ms,
                        attempt,
                        "reply received"
                    );
                    return Ok(response);
                }
                // Slot sender dropped: the demultiplexer is gone.
                Ok(Err(_)) => {
                    self.deregister(&token);
                    return Err(AskError::ConnectionClosed);
                }
                Err(_) => {
                    self.deregister(&token);
                    if attempt >= options.max_retries {
                        return Err(AskError::Timeout {
                            attempts: attempt + 1,
                        });
                    }
                    attempt += 1;
                    let backoff = retry_backoff(attempt);
                    warn!(
                        model_id,
                        request_id = %request.request_id,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "ask timed out, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    fn register(&self, token: &str) -> Result<oneshot::Receiver<Message>, AskError> {
        let (tx, rx) = oneshot::channel();
        let Ok(mut pending) = self.pending.lock() else {
            return Err(AskError::ConnectionClosed);
        };
        pending.insert(token.to_string(), tx);
        Ok(rx)
    }

    fn deregister(&self, token: &str) {
        let Ok(mut pending) = self.pending.lock() else {
            return;
        };
        pending.remove(token);
    }

    /// Outstanding calls awaiting a reply.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.pending.lock().map_or(0, |p| p.len())
    }
}

impl Drop for TransportClient {
    fn drop(&mut self) {
        self.demux.abort();
    }
}

/// Background reply demultiplexer: resolves pending-call slots by the
/// correlation token carried as the last subject segment.
async fn demux_loop(mut subscription: dit_bus::Subscription, pending: PendingCalls) {
    while let Some(msg) = subscription.recv().await {
        let token = msg
            .subject
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string();
        let slot = {
            let Ok(mut pending) = pending.lock() else {
                return;
            };
            pending.remove(&token)
        };
        match slot {
            Some(tx) => {
                // Receiver gone means the caller timed out in the same
                // instant; the reply is stale either way.
                if tx.send(msg).is_err() {
                    debug!(token = %token, "reply raced a timed-out call, discarded");
                }
            }
            None => {
                debug!(token = %token, "stale reply discarded");
            }
        }
    }
    debug!("reply inbox closed, demultiplexer stopped");
}

/// Jittered exponential backoff: uniform in `150ms..=150ms * 2^attempt`,
/// capped at attempt 6.
fn retry_backoff(attempt: u32) -> Duration {
    let cap = 150u64.saturating_mul(1 << attempt.min(6));
    let ms = rand::thread_rng().gen_range(150..=cap.max(151));
    Duration::from_millis(ms)
}
