//! # In-Memory Bus
//!
//! Single-process implementation of [`MessageBus`] built on
//! `tokio::sync::mpsc` channels, one per subscription. Queue groups hold a
//! rotation cursor so members compete for messages round-robin.

use crate::message::Message;
use crate::subscription::{SubKey, Subscription};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors from bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Published to a subject with zero active subscribers.
    ///
    /// Surfaced distinctly from a timeout: it signals a routing/deployment
    /// mismatch rather than slowness, and is reported within one bus
    /// round-trip.
    #[error("no responders on subject {subject}")]
    NoResponders {
        /// The subject that had no subscribers.
        subject: String,
    },

    /// The bus was torn down.
    #[error("bus closed")]
    Closed,
}

/// Trait for the message bus the routing core runs over.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a message to a subject.
    ///
    /// Fails with [`BusError::NoResponders`] when no subscription matches.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Publish a message carrying a reply destination.
    async fn publish_with_reply(
        &self,
        subject: &str,
        reply: &str,
        payload: Vec<u8>,
    ) -> Result<(), BusError>;

    /// Subscribe to a subject.
    ///
    /// The subject may end in `.*`, which matches exactly one additional
    /// token (the form used for muxed reply inboxes).
    fn subscribe(&self, subject: &str) -> Subscription;

    /// Subscribe to a subject as a member of a queue group.
    ///
    /// Each message on the subject is delivered to exactly one member of
    /// each group, rotated round-robin.
    fn queue_subscribe(&self, subject: &str, group: &str) -> Subscription;
}

struct Entry {
    id: u64,
    sender: mpsc::UnboundedSender<Message>,
}

#[derive(Default)]
struct QueueGroup {
    members: Vec<Entry>,
    cursor: usize,
}

#[derive(Default)]
pub(crate) struct Registry {
    /// Plain subscriptions keyed by subject pattern (exact or trailing `.*`).
    plain: HashMap<String, Vec<Entry>>,
    /// Queue groups keyed by exact subject, then group name.
    groups: HashMap<String, HashMap<String, QueueGroup>>,
}

impl Registry {
    pub(crate) fn remove(&mut self, key: &SubKey, id: u64) {
        match key {
            SubKey::Plain { pattern } => {
                if let Some(entries) = self.plain.get_mut(pattern) {
                    entries.retain(|e| e.id != id);
                    if entries.is_empty() {
                        self.plain.remove(pattern);
                    }
                }
            }
            SubKey::Group { subject, group } => {
                if let Some(groups) = self.groups.get_mut(subject) {
                    if let Some(qg) = groups.get_mut(group) {
                        qg.members.retain(|e| e.id != id);
                        if qg.members.is_empty() {
                            groups.remove(group);
                        }
                    }
                    if groups.is_empty() {
                        self.groups.remove(subject);
                    }
                }
            }
        }
        debug!(?key, id, "subscription dropped");
    }
}

/// Whether a subscription pattern matches a published subject.
///
/// Patterns are exact subjects, or a prefix ending in `.*` matching exactly
/// one extra token (no further dots).
fn pattern_matches(pattern: &str, subject: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix(".*") {
        match subject.strip_prefix(prefix) {
            Some(rest) => {
                let Some(token) = rest.strip_prefix('.') else {
                    return false;
                };
                !token.is_empty() && !token.contains('.')
            }
            None => false,
        }
    } else {
        pattern == subject
    }
}

/// In-memory implementation of the message bus.
///
/// Suitable for single-process operation; distributed deployments would use
/// a networked implementation behind the same [`MessageBus`] trait.
pub struct InMemoryBus {
    registry: Arc<RwLock<Registry>>,
    next_id: AtomicU64,
    messages_published: AtomicU64,
}

impl InMemoryBus {
    /// Create a new in-memory bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            next_id: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
        }
    }

    /// Total messages accepted for delivery.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// Number of subscription targets a publish to `subject` would reach
    /// (matching plain subscriptions plus one per non-empty queue group).
    #[must_use]
    pub fn responder_count(&self, subject: &str) -> usize {
        let Ok(reg) = self.registry.read() else {
            return 0;
        };
        let plain: usize = reg
            .plain
            .iter()
            .filter(|(pattern, _)| pattern_matches(pattern, subject))
            .map(|(_, entries)| entries.len())
            .sum();
        let grouped = reg
            .groups
            .get(subject)
            .map_or(0, |groups| groups.values().filter(|g| !g.members.is_empty()).count());
        plain + grouped
    }

    fn register(&self, key: SubKey) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            if let Ok(mut reg) = self.registry.write() {
                match &key {
                    SubKey::Plain { pattern } => {
                        reg.plain
                            .entry(pattern.clone())
                            .or_default()
                            .push(Entry { id, sender });
                    }
                    SubKey::Group { subject, group } => {
                        reg.groups
                            .entry(subject.clone())
                            .or_default()
                            .entry(group.clone())
                            .or_default()
                            .members
                            .push(Entry { id, sender });
                    }
                }
            }
        }
        debug!(?key, id, "subscription created");
        Subscription::new(receiver, Arc::clone(&self.registry), key, id)
    }

    fn deliver(&self, message: Message) -> Result<(), BusError> {
        let Ok(mut reg) = self.registry.write() else {
            return Err(BusError::Closed);
        };

        let subject = message.subject.clone();
        let mut delivered = 0usize;

        // Plain subscriptions: every matching subscriber gets a copy.
        for (pattern, entries) in reg.plain.iter_mut() {
            if !pattern_matches(pattern, &subject) {
                continue;
            }
            entries.retain(|entry| match entry.sender.send(message.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            });
        }

        // Queue groups: exactly one live member per group, rotated.
        if let Some(groups) = reg.groups.get_mut(&subject) {
            for qg in groups.values_mut() {
                let len = qg.members.len();
                for offset in 0..len {
                    let idx = (qg.cursor + offset) % len;
                    if qg.members[idx].sender.send(message.clone()).is_ok() {
                        qg.cursor = (idx + 1) % len;
                        delivered += 1;
                        break;
                    }
                }
                qg.members.retain(|e| !e.sender.is_closed());
            }
        }

        if delivered == 0 {
            warn!(subject = %subject, "publish reached no responders");
            return Err(BusError::NoResponders { subject });
        }
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        debug!(subject = %subject, receivers = delivered, "message delivered");
        Ok(())
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.deliver(Message::new(subject, payload))
    }

    async fn publish_with_reply(
        &self,
        subject: &str,
        reply: &str,
        payload: Vec<u8>,
    ) -> Result<(), BusError> {
        self.deliver(Message::with_reply(subject, reply, payload))
    }

    fn subscribe(&self, subject: &str) -> Subscription {
        self.register(SubKey::Plain {
            pattern: subject.to_string(),
        })
    }

    fn queue_subscribe(&self, subject: &str, group: &str) -> Subscription {
        self.register(SubKey::Group {
            subject: subject.to_string(),
            group: group.to_string(),
        })
    }
}
