//! # DIT Transport - Ask/Reply over the Bus
//!
//! Two halves of the request/reply protocol:
//!
//! - [`TransportClient`]: owns one bus connection and one background reply
//!   demultiplexer; exposes `ask(model_id, payload)` which publishes a
//!   request and awaits the correlated reply under a timeout/retry budget.
//! - [`Responder`]: runs inside an expert process; consumes requests from
//!   `models.<model_id>` as a queue-group member, invokes the bound expert
//!   callable, and replies unconditionally.
//!
//! The pending-call table inside the client is the only mutable shared
//! state; every call registers a one-shot result slot keyed by a fresh
//! correlation token and is resolved exactly once (reply, decode failure,
//! or timeout). Replies arriving after a call was deregistered are stale
//! and discarded with a debug log.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod callable;
pub mod client;
pub mod responder;

// Re-export main types
pub use callable::{ExpertCallable, ExpertError};
pub use client::{AskError, AskOptions, TransportClient};
pub use responder::{Responder, ResponderConfig};
