//! # Subject Addressing
//!
//! Deterministic derivation of bus addresses from an expert identity.

use uuid::Uuid;

/// Prefix under which all reply inboxes live.
pub const INBOX_PREFIX: &str = "_inbox";

/// Subject an expert's requests are published to: `models.<model_id>`.
#[must_use]
pub fn request_subject(model_id: &str) -> String {
    format!("models.{model_id}")
}

/// Queue group all replicas of one expert join: `ditq.<model_id>`.
///
/// Queue-group membership load-balances requests across replicas hosting the
/// same `model_id`; each request is delivered to exactly one member.
#[must_use]
pub fn queue_group(model_id: &str) -> String {
    format!("ditq.{model_id}")
}

/// Fresh per-client inbox prefix. Reply subjects are formed by appending one
/// correlation token: `<prefix>.<token>`.
#[must_use]
pub fn inbox_prefix() -> String {
    format!("{INBOX_PREFIX}.{}", Uuid::new_v4().simple())
}
