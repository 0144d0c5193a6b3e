//! # DIT Bus - Request/Reply Message Bus
//!
//! The transport substrate for the routing core: subject-based
//! publish/subscribe with reply destinations, queue-group (competing
//! consumers) subscriptions, and a distinguishable no-responders condition.
//!
//! ```text
//! ┌──────────────┐                          ┌──────────────┐
//! │  Publisher   │  publish(subject, msg)   │  Responder   │
//! │              │ ───────────┐             │  (queue grp) │
//! └──────────────┘            ▼             └──────────────┘
//!        ▲              ┌───────────┐              │
//!        │              │    Bus    │ ─────────────┘
//!        └──────────────│           │   one member per group
//!     reply inbox       └───────────┘
//! ```
//!
//! The broker itself is an external dependency of the system; [`MessageBus`]
//! is the seam. [`InMemoryBus`] is the single-process implementation used by
//! the runtime and the test suite; distributed deployments substitute a
//! networked implementation behind the same trait.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod message;
pub mod subscription;

// Re-export main types
pub use bus::{BusError, InMemoryBus, MessageBus};
pub use message::Message;
pub use subscription::Subscription;
