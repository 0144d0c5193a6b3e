//! # DIT Proto - Request/Reply Envelope
//!
//! Defines the two message shapes that cross the bus (`Request`, `Response`)
//! and their compact binary codec, plus the subject-addressing convention.
//!
//! ## Addressing Convention
//!
//! - Request subject: `models.<model_id>` (exact case)
//! - Queue group: `ditq.<model_id>`
//! - Reply inboxes: subjects under `_inbox.`
//!
//! ## Codec
//!
//! Encoding is deterministic: encoding the same logical value twice yields
//! byte-identical output. Decoding malformed bytes fails with [`DecodeError`],
//! never a panic.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod envelope;
pub mod subjects;

// Re-export main types
pub use envelope::{DecodeError, EncodeError, Request, Response, Status};
pub use subjects::{inbox_prefix, queue_group, request_subject, INBOX_PREFIX};
