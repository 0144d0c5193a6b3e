//! # Batch Orchestrator
//!
//! Runs a batch of queries through a dispatch table, respecting a
//! wall-clock time budget: once the budget is spent, remaining queries are
//! not issued.

use crate::dispatch::{DispatchError, DispatchReport, DispatchTable};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

/// Errors from batch orchestration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The query batch was empty.
    #[error("query batch is empty")]
    EmptyBatch,
}

/// Time-budgeted batch runner over a [`DispatchTable`].
pub struct Orchestrator {
    table: Arc<DispatchTable>,
}

impl Orchestrator {
    /// Run batches through `table`.
    #[must_use]
    pub fn new(table: Arc<DispatchTable>) -> Self {
        Self { table }
    }

    /// Execute queries in order until done or the budget is exhausted.
    ///
    /// Returns one outcome per issued query; queries skipped for budget
    /// reasons produce no entry.
    pub async fn run(
        &self,
        queries: &[String],
        budget: Duration,
    ) -> Result<Vec<Result<DispatchReport, DispatchError>>, OrchestratorError> {
        if queries.is_empty() {
            return Err(OrchestratorError::EmptyBatch);
        }

        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(queries.len());
        for query in queries {
            if started.elapsed() > budget {
                info!(
                    issued = outcomes.len(),
                    total = queries.len(),
                    "time budget exhausted, stopping batch"
                );
                break;
            }
            outcomes.push(self.table.execute(query).await);
        }
        Ok(outcomes)
    }
}
