//! # DIT Node
//!
//! Single-process demonstration runtime: one in-memory bus, a responder
//! per configured expert, and a dispatch table on top. Queries arrive one
//! per line on stdin and each produces one JSON result line on stdout.
//! EOF or ctrl-c triggers a graceful drain before exit.

mod config;

use crate::config::NodeConfig;
use anyhow::Context;
use dit_bus::{InMemoryBus, MessageBus};
use dit_core::{DispatchReport, DispatchTable, LocalExpert};
use dit_proto::Status;
use dit_router::RoundRobinRouter;
use dit_transport::{AskOptions, ExpertCallable, Responder, ResponderConfig, TransportClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("DIT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = NodeConfig::from_env().context("reading configuration")?;
    config.validate().context("validating configuration")?;
    info!(
        experts = ?config.experts,
        timeout_ms = config.timeout_ms,
        retries = config.retries,
        max_inflight = config.max_inflight,
        "dit-node starting"
    );

    let bus: Arc<InMemoryBus> = Arc::new(InMemoryBus::new());

    let mut responders = Vec::with_capacity(config.experts.len());
    for model_id in &config.experts {
        let responder = Arc::new(Responder::with_config(
            Arc::clone(&bus) as Arc<dyn MessageBus>,
            model_id.clone(),
            demo_expert(model_id),
            ResponderConfig {
                queue_group: None,
                max_inflight: config.max_inflight,
            },
        ));
        tokio::spawn(Arc::clone(&responder).run());
        responders.push(responder);
    }
    // Let every subscription land before the first query.
    tokio::task::yield_now().await;

    let client = Arc::new(TransportClient::with_options(
        Arc::clone(&bus) as Arc<dyn MessageBus>,
        AskOptions {
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.retries,
        },
    ));
    let table = DispatchTable::new(client, config.experts.clone(), Box::new(RoundRobinRouter::new()));

    info!("reading queries from stdin, one per line");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                match table.execute(query).await {
                    Ok(report) => println!("{}", result_line(&report)),
                    Err(e) => {
                        warn!(error = %e, "dispatch failed");
                        println!("{}", serde_json::json!({ "error": e.to_string() }));
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
        }
    }

    info!("draining responders");
    for responder in &responders {
        responder.shutdown();
    }
    info!("dit-node stopped");
    Ok(())
}

/// A stand-in expert: uppercases the query and tags it with its identity.
fn demo_expert(model_id: &str) -> Arc<dyn ExpertCallable> {
    let tag = model_id.to_string();
    Arc::new(LocalExpert::new(move |payload: &str| {
        Ok(format!("{tag}::{}", payload.to_uppercase()))
    }))
}

fn result_line(report: &DispatchReport) -> String {
    let winner = &report.winner;
    serde_json::json!({
        "response": winner.payload,
        "expert": winner.model_id,
        "status": match winner.status {
            Status::Success => "SUCCESS",
            Status::Error => "ERROR",
        },
        "latency_ms": winner.latency_ms,
        "error": winner.error_message,
        "request_id": winner.request_id,
    })
    .to_string()
}
