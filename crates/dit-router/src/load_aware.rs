//! # Load-Aware Router
//!
//! Wraps a base router and reorders its candidates using live expert stats:
//! healthy experts (not rate-limited, error rate under the threshold) keep
//! their relative order ahead of degraded ones. When every expert is
//! degraded, the order is randomized rather than hammering the same
//! overloaded expert first.

use crate::router::{RouteError, Router};
use crate::stats::ExpertStatsTracker;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::debug;

/// Default error-rate threshold above which an expert counts as degraded.
pub const DEFAULT_ERROR_RATE_THRESHOLD: f64 = 0.5;

/// Health-based reordering over an inner routing strategy.
pub struct LoadAwareRouter {
    inner: Box<dyn Router>,
    stats: Arc<ExpertStatsTracker>,
    error_rate_threshold: f64,
}

impl LoadAwareRouter {
    /// Wrap `inner`, consulting `stats` on every selection.
    #[must_use]
    pub fn new(inner: Box<dyn Router>, stats: Arc<ExpertStatsTracker>) -> Self {
        Self {
            inner,
            stats,
            error_rate_threshold: DEFAULT_ERROR_RATE_THRESHOLD,
        }
    }

    /// Override the error-rate threshold.
    #[must_use]
    pub fn with_error_rate_threshold(mut self, threshold: f64) -> Self {
        self.error_rate_threshold = threshold;
        self
    }

    fn is_healthy(&self, expert: &str) -> bool {
        !self.stats.is_rate_limited(expert)
            && self.stats.error_rate(expert) < self.error_rate_threshold
    }
}

impl Router for LoadAwareRouter {
    fn select(&self, query: &str, experts: &[String]) -> Result<Vec<String>, RouteError> {
        let ranked = self.inner.select(query, experts)?;

        let (healthy, mut degraded): (Vec<String>, Vec<String>) =
            ranked.into_iter().partition(|e| self.is_healthy(e));

        if healthy.is_empty() {
            debug!("all experts degraded, falling back to random order");
            degraded.shuffle(&mut rand::thread_rng());
            return Ok(degraded);
        }

        let mut ordered = healthy;
        ordered.extend(degraded);
        Ok(ordered)
    }
}
