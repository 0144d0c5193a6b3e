//! # Dispatch Table
//!
//! Composes a router and the expert handles into one `execute(query)` entry
//! point. The configured policy decides how far down the candidate list a
//! query travels:
//!
//! - `FirstSuccess { max_candidates }` (default, one candidate): try
//!   candidates in order; a transport-level failure (timeout, no
//!   responders, decode) moves on to the next candidate, while any reply
//!   ends the scan. An `Error`-status reply counts as a delivered answer,
//!   since it is an expert-logic failure rather than a transport fault.
//! - `All`: dispatch to every candidate concurrently and collect every
//!   outcome.
//!
//! When every tried candidate fails at the transport level, the error
//! aggregates all per-candidate reasons, not just the last one.

use crate::handle::ExpertHandle;
use dit_proto::Response;
use dit_router::{RouteError, Router};
use dit_transport::{AskError, TransportClient};
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// How many candidates a query may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Try candidates in routed order until one replies, up to
    /// `max_candidates`.
    FirstSuccess {
        /// Upper bound on candidates tried (at least 1).
        max_candidates: usize,
    },
    /// Dispatch to every routed candidate concurrently, collecting all
    /// outcomes.
    All,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        // Exactly one expert is tried unless the policy opts in to more.
        Self::FirstSuccess { max_candidates: 1 }
    }
}

/// One candidate's transport-level failure, preserved for final reporting.
#[derive(Debug, Error)]
#[error("{model_id}: {error}")]
pub struct CandidateFailure {
    /// The candidate that failed.
    pub model_id: String,
    /// Why it failed.
    #[source]
    pub error: AskError,
}

fn fmt_failures(failures: &[CandidateFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure of a dispatch as a whole.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Routing produced no candidates.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// Every tried candidate failed at the transport level.
    #[error("all candidates failed: {}", fmt_failures(.0))]
    AllCandidatesFailed(Vec<CandidateFailure>),
}

/// Outcome of one `execute` call.
#[derive(Debug)]
pub struct DispatchReport {
    /// The reply the caller should act on: the first (or only) reply under
    /// `FirstSuccess`, the first `Success`-status reply under `All`.
    pub winner: Response,
    /// Every reply collected (length 1 under `FirstSuccess`).
    pub replies: Vec<Response>,
    /// Transport-level failures of candidates that did not reply, recorded
    /// even when a later candidate won.
    pub failures: Vec<CandidateFailure>,
}

/// Routing + transport behind a single `execute` entry point.
///
/// The expert table is fixed at construction; the routing strategy can be
/// swapped at runtime, reusing the table.
pub struct DispatchTable {
    experts: Vec<String>,
    table: HashMap<String, ExpertHandle>,
    router: RwLock<Box<dyn Router>>,
    policy: DispatchPolicy,
}

impl DispatchTable {
    /// Build handles for `experts` over a shared transport client.
    #[must_use]
    pub fn new(client: Arc<TransportClient>, experts: Vec<String>, router: Box<dyn Router>) -> Self {
        let table = experts
            .iter()
            .map(|e| (e.clone(), ExpertHandle::new(e.clone(), Arc::clone(&client))))
            .collect();
        Self {
            experts,
            table,
            router: RwLock::new(router),
            policy: DispatchPolicy::default(),
        }
    }

    /// Set the dispatch policy.
    #[must_use]
    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Registered expert identities, in registration order.
    #[must_use]
    pub fn experts(&self) -> &[String] {
        &self.experts
    }

    /// Swap the routing strategy at runtime. The expert table is reused.
    pub fn set_router(&self, router: Box<dyn Router>) {
        *self.router.write() = router;
    }

    /// Route a query and dispatch it per the configured policy.
    pub async fn execute(&self, query: &str) -> Result<DispatchReport, DispatchError> {
        let ranked = self.router.read().select(query, &self.experts)?;
        debug!(candidates = ?ranked, policy = ?self.policy, "query routed");

        match self.policy {
            DispatchPolicy::FirstSuccess { max_candidates } => {
                self.execute_first_success(query, ranked, max_candidates)
                    .await
            }
            DispatchPolicy::All => self.execute_all(query, ranked).await,
        }
    }

    async fn execute_first_success(
        &self,
        query: &str,
        ranked: Vec<String>,
        max_candidates: usize,
    ) -> Result<DispatchReport, DispatchError> {
        let limit = max_candidates.max(1);
        let mut failures = Vec::new();

        for model_id in ranked.into_iter().take(limit) {
            let Some(handle) = self.table.get(&model_id) else {
                continue;
            };
            match handle.invoke(query).await {
                Ok(response) => {
                    return Ok(DispatchReport {
                        replies: vec![response.clone()],
                        winner: response,
                        failures,
                    });
                }
                Err(error) => {
                    // Routing-level failure: record it and move to the next
                    // candidate.
                    warn!(model_id = %model_id, error = %error, "candidate failed, trying next");
                    failures.push(CandidateFailure { model_id, error });
                }
            }
        }

        Err(DispatchError::AllCandidatesFailed(failures))
    }

    async fn execute_all(
        &self,
        query: &str,
        ranked: Vec<String>,
    ) -> Result<DispatchReport, DispatchError> {
        let invocations = ranked.iter().filter_map(|model_id| {
            self.table.get(model_id).map(|handle| async move {
                (model_id.clone(), handle.invoke(query).await)
            })
        });

        let mut replies = Vec::new();
        let mut failures = Vec::new();
        for (model_id, outcome) in join_all(invocations).await {
            match outcome {
                Ok(response) => replies.push(response),
                Err(error) => failures.push(CandidateFailure { model_id, error }),
            }
        }

        let winner = replies
            .iter()
            .find(|r| r.is_success())
            .or_else(|| replies.first())
            .cloned();
        match winner {
            Some(winner) => Ok(DispatchReport {
                winner,
                replies,
                failures,
            }),
            None => Err(DispatchError::AllCandidatesFailed(failures)),
        }
    }
}
