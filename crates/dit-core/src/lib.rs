//! # DIT Core - Dispatch Table
//!
//! Composes routing and transport into a single entry point:
//!
//! ```text
//! caller ─→ DispatchTable::execute ─→ Router::select ─→ ExpertHandle::invoke
//!             │                                              │
//!             │                                   TransportClient::ask
//!             │                                              │
//!             └───────────── aggregated result ←── (bus) ←───┘
//! ```
//!
//! Also provides the expert callable capability in its two forms: a local
//! in-process function ([`LocalExpert`]) and a remote-transport variant
//! ([`RemoteExpert`]), selected at construction rather than by runtime type
//! inspection.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dispatch;
pub mod expert;
pub mod handle;
pub mod orchestrator;

// Re-export main types
pub use dispatch::{
    CandidateFailure, DispatchError, DispatchPolicy, DispatchReport, DispatchTable,
};
pub use expert::{LocalExpert, RemoteExpert, TrackedRemoteExpert};
pub use handle::ExpertHandle;
pub use orchestrator::{Orchestrator, OrchestratorError};

// The capability trait lives next to the responder that binds it.
pub use dit_transport::{ExpertCallable, ExpertError};
