//! # Expert Stats Tracker
//!
//! Live per-expert latency/error/rate metrics, shared between the routing
//! side (reader) and the dispatching side (writer). The expert set is fixed
//! at construction, so the outer map is immutable and only the per-expert
//! records are locked.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Instant;

/// Smoothing factor for the latency exponential moving average.
const EMA_ALPHA: f64 = 0.3;

#[derive(Debug, Default)]
struct ExpertStats {
    latency_ema_ms: f64,
    error_count: u64,
    request_count: u64,
    /// Timestamps of recent requests for rate-limit detection. Tracked only
    /// while a rate limit is set, so the window stays bounded.
    request_times: VecDeque<Instant>,
    rate_limit_rps: Option<f64>,
}

impl ExpertStats {
    fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        if self.rate_limit_rps.is_none() {
            return;
        }
        self.purge_window(now);
        self.request_times.push_back(now);
    }

    fn record_result(&mut self, latency_ms: f64, success: bool) {
        if self.latency_ema_ms == 0.0 {
            self.latency_ema_ms = latency_ms;
        } else {
            self.latency_ema_ms = EMA_ALPHA * latency_ms + (1.0 - EMA_ALPHA) * self.latency_ema_ms;
        }
        if !success {
            self.error_count += 1;
        }
    }

    fn error_rate(&self) -> f64 {
        if self.request_count == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.request_count as f64
    }

    fn is_rate_limited(&mut self, now: Instant) -> bool {
        let Some(rps) = self.rate_limit_rps else {
            return false;
        };
        self.purge_window(now);
        self.request_times.len() as f64 >= rps
    }

    /// Drop window entries older than one second.
    fn purge_window(&mut self, now: Instant) {
        while let Some(front) = self.request_times.front() {
            if now.duration_since(*front).as_secs_f64() > 1.0 {
                self.request_times.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Point-in-time view of one expert's stats, shaped for external consumers
/// (CSV/logging of results is outside the core).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpertStatsSnapshot {
    /// Smoothed observed latency.
    pub latency_ema_ms: f64,
    /// Fraction of requests that failed.
    pub error_rate: f64,
    /// Total requests recorded.
    pub request_count: u64,
    /// Whether the expert is currently over its request-rate limit.
    pub is_rate_limited: bool,
}

/// Holds per-expert stats for a fixed expert set.
pub struct ExpertStatsTracker {
    stats: HashMap<String, Mutex<ExpertStats>>,
}

impl ExpertStatsTracker {
    /// Track the given experts. Unknown identities are ignored by the
    /// recording methods.
    #[must_use]
    pub fn new(experts: &[String]) -> Self {
        Self {
            stats: experts
                .iter()
                .map(|e| (e.clone(), Mutex::new(ExpertStats::default())))
                .collect(),
        }
    }

    /// Record that a request was issued to `expert`.
    pub fn record_request(&self, expert: &str) {
        if let Some(stats) = self.stats.get(expert) {
            if let Ok(mut stats) = stats.lock() {
                stats.record_request(Instant::now());
            }
        }
    }

    /// Record the outcome of a request to `expert`.
    pub fn record_result(&self, expert: &str, latency_ms: f64, success: bool) {
        if let Some(stats) = self.stats.get(expert) {
            if let Ok(mut stats) = stats.lock() {
                stats.record_result(latency_ms, success);
            }
        }
    }

    /// Set (or clear) a requests-per-second limit for `expert`.
    pub fn set_rate_limit(&self, expert: &str, rps: Option<f64>) {
        if let Some(stats) = self.stats.get(expert) {
            if let Ok(mut stats) = stats.lock() {
                stats.rate_limit_rps = rps;
                if rps.is_none() {
                    stats.request_times.clear();
                }
            }
        }
    }

    /// Current error rate for `expert` (0.0 when unknown).
    #[must_use]
    pub fn error_rate(&self, expert: &str) -> f64 {
        self.stats
            .get(expert)
            .and_then(|s| s.lock().ok().map(|s| s.error_rate()))
            .unwrap_or(0.0)
    }

    /// Whether `expert` is currently over its rate limit.
    #[must_use]
    pub fn is_rate_limited(&self, expert: &str) -> bool {
        self.stats
            .get(expert)
            .and_then(|s| {
                s.lock()
                    .ok()
                    .map(|mut s| s.is_rate_limited(Instant::now()))
            })
            .unwrap_or(false)
    }

    /// Snapshot all expert stats.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, ExpertStatsSnapshot> {
        let now = Instant::now();
        self.stats
            .iter()
            .filter_map(|(name, stats)| {
                let mut stats = stats.lock().ok()?;
                Some((
                    name.clone(),
                    ExpertStatsSnapshot {
                        latency_ema_ms: stats.latency_ema_ms,
                        error_rate: stats.error_rate(),
                        request_count: stats.request_count,
                        is_rate_limited: stats.is_rate_limited(now),
                    },
                ))
            })
            .collect()
    }
}
