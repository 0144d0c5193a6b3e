//! # Integration Test Flows
//!
//! Full caller-to-expert request/reply paths over one in-memory bus:
//! dispatch table, router, transport client, and responder working
//! together the way a deployed node wires them.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use dit_bus::{InMemoryBus, MessageBus};
    use dit_core::{
        DispatchPolicy, DispatchTable, LocalExpert, RemoteExpert, TrackedRemoteExpert,
    };
    use dit_proto::Status;
    use dit_router::{DomainRouter, ExpertStatsTracker, RoundRobinRouter, StaticRouter};
    use dit_transport::{
        AskOptions, ExpertCallable, ExpertError, Responder, TransportClient,
    };

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    /// Spawn a responder whose expert tags its identity onto the payload.
    async fn spawn_tagging_expert(bus: &Arc<InMemoryBus>, model_id: &str) -> Arc<Responder> {
        let tag = model_id.to_string();
        let responder = Arc::new(Responder::new(
            Arc::clone(bus) as Arc<dyn MessageBus>,
            model_id,
            Arc::new(LocalExpert::new(move |p: &str| Ok(format!("{tag}:{p}")))),
        ));
        tokio::spawn(Arc::clone(&responder).run());
        tokio::task::yield_now().await;
        responder
    }

    fn client(bus: &Arc<InMemoryBus>, timeout_ms: u64, retries: u32) -> Arc<TransportClient> {
        Arc::new(TransportClient::with_options(
            Arc::clone(bus) as Arc<dyn MessageBus>,
            AskOptions {
                timeout: Duration::from_millis(timeout_ms),
                max_retries: retries,
            },
        ))
    }

    fn descriptor_map(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(e, ds)| {
                (
                    e.to_string(),
                    ds.iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }

    // =========================================================================
    // FLOWS: DISPATCH TABLE → ROUTER → TRANSPORT → RESPONDER
    // =========================================================================

    #[tokio::test]
    async fn test_single_expert_query_round_trip() {
        let bus = Arc::new(InMemoryBus::new());
        let _payments = spawn_tagging_expert(&bus, "Payments").await;

        let table = DispatchTable::new(
            client(&bus, 800, 1),
            vec!["Payments".to_string()],
            Box::new(RoundRobinRouter::new()),
        );

        let report = table.execute("classify wire transfer").await.unwrap();
        assert_eq!(report.winner.status, Status::Success);
        assert_eq!(report.winner.model_id, "Payments");
        assert_eq!(report.winner.payload, "Payments:classify wire transfer");
        assert!(!report.winner.request_id.is_empty());
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_round_robin_alternates_experts() {
        let bus = Arc::new(InMemoryBus::new());
        let _a = spawn_tagging_expert(&bus, "A").await;
        let _b = spawn_tagging_expert(&bus, "B").await;

        let table = DispatchTable::new(
            client(&bus, 800, 0),
            vec!["A".to_string(), "B".to_string()],
            Box::new(RoundRobinRouter::new()),
        );

        let first = table.execute("q1").await.unwrap().winner.model_id;
        let second = table.execute("q2").await.unwrap().winner.model_id;
        let third = table.execute("q3").await.unwrap().winner.model_id;
        assert_ne!(first, second);
        assert_eq!(first, third);
    }

    #[tokio::test]
    async fn test_domain_router_steers_by_descriptor() {
        let bus = Arc::new(InMemoryBus::new());
        let _finance = spawn_tagging_expert(&bus, "Finance").await;
        let _health = spawn_tagging_expert(&bus, "Health").await;

        let mapping = descriptor_map(&[
            ("Finance", &["stocks", "bonds", "market"]),
            ("Health", &["doctor", "medicine"]),
        ]);
        let table = DispatchTable::new(
            client(&bus, 800, 0),
            vec!["Finance".to_string(), "Health".to_string()],
            Box::new(DomainRouter::new(&mapping)),
        );

        let report = table.execute("stocks and the bonds market").await.unwrap();
        assert_eq!(report.winner.model_id, "Finance");

        let report = table.execute("ask a doctor about medicine").await.unwrap();
        assert_eq!(report.winner.model_id, "Health");
    }

    #[tokio::test]
    async fn test_expert_logic_failure_is_a_delivered_reply() {
        let bus: Arc<InMemoryBus> = Arc::new(InMemoryBus::new());
        let broken = Arc::new(Responder::new(
            Arc::clone(&bus) as Arc<dyn MessageBus>,
            "Broken",
            Arc::new(LocalExpert::new(|_: &str| {
                Err(ExpertError::Execution("bad input".to_string()))
            })),
        ));
        tokio::spawn(Arc::clone(&broken).run());
        tokio::task::yield_now().await;

        let table = DispatchTable::new(
            client(&bus, 800, 0),
            vec!["Broken".to_string()],
            Box::new(RoundRobinRouter::new()),
        );

        // The dispatch succeeds at the transport level; the failure is in
        // the reply body, not the error channel.
        let report = table.execute("q").await.unwrap();
        assert_eq!(report.winner.status, Status::Error);
        assert!(report.winner.error_message.contains("bad input"));
        assert!(report.winner.payload.is_empty());
    }

    #[tokio::test]
    async fn test_all_policy_fans_out_to_every_expert() {
        let bus = Arc::new(InMemoryBus::new());
        let _a = spawn_tagging_expert(&bus, "A").await;
        let _b = spawn_tagging_expert(&bus, "B").await;
        let _c = spawn_tagging_expert(&bus, "C").await;

        let table = DispatchTable::new(
            client(&bus, 800, 0),
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            Box::new(RoundRobinRouter::new()),
        )
        .with_policy(DispatchPolicy::All);

        let report = table.execute("fanout").await.unwrap();
        assert_eq!(report.replies.len(), 3);
        assert!(report.failures.is_empty());
        let mut responders: Vec<&str> =
            report.replies.iter().map(|r| r.model_id.as_str()).collect();
        responders.sort_unstable();
        assert_eq!(responders, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_router_swap_takes_effect_mid_stream() {
        let bus = Arc::new(InMemoryBus::new());
        let _a = spawn_tagging_expert(&bus, "A").await;
        let _b = spawn_tagging_expert(&bus, "B").await;

        let table = DispatchTable::new(
            client(&bus, 800, 0),
            vec!["A".to_string(), "B".to_string()],
            Box::new(RoundRobinRouter::new()),
        );
        table.execute("warmup").await.unwrap();

        table.set_router(Box::new(StaticRouter::new("A")));
        for q in ["q1", "q2", "q3"] {
            assert_eq!(table.execute(q).await.unwrap().winner.model_id, "A");
        }
    }

    // =========================================================================
    // FLOWS: REMOTE EXPERTS AS CALLABLES
    // =========================================================================

    #[tokio::test]
    async fn test_remote_expert_chains_through_a_second_hop() {
        let bus: Arc<InMemoryBus> = Arc::new(InMemoryBus::new());
        let _upper = spawn_tagging_expert(&bus, "Upper").await;

        // A gateway expert whose callable is itself a remote call.
        let gateway_expert = Arc::new(RemoteExpert::new(client(&bus, 800, 0), "Upper"));
        let gateway = Arc::new(Responder::new(
            Arc::clone(&bus) as Arc<dyn MessageBus>,
            "Gateway",
            gateway_expert,
        ));
        tokio::spawn(Arc::clone(&gateway).run());
        tokio::task::yield_now().await;

        let caller = client(&bus, 800, 0);
        let response = caller.ask("Gateway", "hop").await.unwrap();
        assert_eq!(response.status, Status::Success);
        assert_eq!(response.payload, "Upper:hop");
    }

    #[tokio::test]
    async fn test_tracked_expert_feeds_the_stats_tracker() {
        let bus: Arc<InMemoryBus> = Arc::new(InMemoryBus::new());
        let _echo = spawn_tagging_expert(&bus, "Echo").await;

        let experts = vec!["Echo".to_string()];
        let stats = Arc::new(ExpertStatsTracker::new(&experts));
        let tracked =
            TrackedRemoteExpert::new(client(&bus, 800, 0), "Echo", Arc::clone(&stats));

        for i in 0..3 {
            tracked.invoke(&format!("q{i}")).await.unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap["Echo"].request_count, 3);
        assert_eq!(snap["Echo"].error_rate, 0.0);
        assert!(!snap["Echo"].is_rate_limited);
    }
}
