//! # DIT Router - Candidate Selection
//!
//! A [`Router`] turns a query plus the registered expert identities into an
//! ordered candidate list (primary first). Strategies:
//!
//! - [`RoundRobinRouter`]: naive rotation, the default.
//! - [`StaticRouter`]: pins every query to one expert.
//! - [`DomainRouter`]: keyword/descriptor matching with ambiguity removal,
//!   tallying or first-match.
//! - [`LoadAwareRouter`]: reorders an inner router's candidates using live
//!   per-expert health from an [`ExpertStatsTracker`].

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod load_aware;
pub mod router;
pub mod stats;

// Re-export main types
pub use domain::DomainRouter;
pub use load_aware::LoadAwareRouter;
pub use router::{RoundRobinRouter, RouteError, Router, StaticRouter};
pub use stats::{ExpertStatsSnapshot, ExpertStatsTracker};
