//! # DIT Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Cross-crate choreography
//!     ├── flows.rs      # Full caller-to-expert request/reply flows
//!     └── resilience.rs # Timeouts, dead experts, balancing, budgets
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p dit-tests
//!
//! # By category
//! cargo test -p dit-tests integration::flows
//! cargo test -p dit-tests integration::resilience
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
