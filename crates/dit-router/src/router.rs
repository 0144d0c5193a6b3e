//! # Router Trait and Basic Strategies

use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Errors from candidate selection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No experts registered.
    #[error("no experts registered")]
    NoExperts,

    /// A strategy referenced an expert outside the registered set.
    #[error("unknown expert: {model_id}")]
    UnknownExpert {
        /// The identity that is not registered.
        model_id: String,
    },
}

/// Strategy for ordering dispatch candidates.
///
/// `select` returns a non-empty ordered sequence (primary candidate first)
/// drawn from `experts`, or fails with [`RouteError::NoExperts`].
pub trait Router: Send + Sync {
    /// Order the registered experts for one query.
    fn select(&self, query: &str, experts: &[String]) -> Result<Vec<String>, RouteError>;
}

/// Naive round-robin rotation across experts. Ignores the query.
pub struct RoundRobinRouter {
    cursor: AtomicUsize,
}

impl RoundRobinRouter {
    /// Create a router starting at the first registered expert.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobinRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for RoundRobinRouter {
    fn select(&self, _query: &str, experts: &[String]) -> Result<Vec<String>, RouteError> {
        if experts.is_empty() {
            return Err(RouteError::NoExperts);
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % experts.len();
        Ok((0..experts.len())
            .map(|i| experts[(start + i) % experts.len()].clone())
            .collect())
    }
}

/// Pins every query to a single expert.
pub struct StaticRouter {
    model_id: String,
}

impl StaticRouter {
    /// Route everything to `model_id`.
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
        }
    }
}

impl Router for StaticRouter {
    fn select(&self, _query: &str, experts: &[String]) -> Result<Vec<String>, RouteError> {
        if experts.is_empty() {
            return Err(RouteError::NoExperts);
        }
        if !experts.contains(&self.model_id) {
            return Err(RouteError::UnknownExpert {
                model_id: self.model_id.clone(),
            });
        }
        // Pinned expert first; the rest keep registration order as fallback.
        let mut ordered = vec![self.model_id.clone()];
        ordered.extend(experts.iter().filter(|e| **e != self.model_id).cloned());
        Ok(ordered)
    }
}
