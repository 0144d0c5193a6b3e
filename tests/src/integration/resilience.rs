//! # Resilience Scenarios
//!
//! Failure-path behavior of the full stack: absent experts, silent
//! experts, retry budgets, replica balancing, health-based rerouting, and
//! time-budgeted batches.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use dit_bus::{InMemoryBus, MessageBus};
    use dit_core::{
        DispatchError, DispatchPolicy, DispatchTable, LocalExpert, Orchestrator,
    };
    use dit_router::{ExpertStatsTracker, LoadAwareRouter, RoundRobinRouter, StaticRouter};
    use dit_transport::{
        AskError, AskOptions, ExpertCallable, ExpertError, Responder, TransportClient,
    };

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

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

    /// Sleeps before answering; used to burn timeout and budget clocks.
    struct SlowExpert {
        delay: Duration,
    }

    #[async_trait]
    impl ExpertCallable for SlowExpert {
        async fn invoke(&self, payload: &str) -> Result<String, ExpertError> {
            tokio::time::sleep(self.delay).await;
            Ok(payload.to_string())
        }
    }

    // =========================================================================
    // ABSENT AND SILENT EXPERTS
    // =========================================================================

    #[tokio::test]
    async fn test_absent_expert_fails_fast() {
        let bus = Arc::new(InMemoryBus::new());
        let table = DispatchTable::new(
            client(&bus, 800, 2),
            vec!["Ghost".to_string()],
            Box::new(RoundRobinRouter::new()),
        );

        // Nothing subscribed: the failure is detected at publish time and
        // never retried, so it returns well inside the timeout budget.
        let started = Instant::now();
        let err = table.execute("anyone there").await.unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(100));
        match err {
            DispatchError::AllCandidatesFailed(failures) => {
                assert_eq!(failures.len(), 1);
                assert!(matches!(
                    failures[0].error,
                    AskError::NoResponders { .. }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_silent_expert_times_out_then_fallback_wins() {
        let bus: Arc<InMemoryBus> = Arc::new(InMemoryBus::new());
        // A subscribes but never replies; B is healthy.
        let _silent = bus.subscribe("models.A");
        let _b = spawn_tagging_expert(&bus, "B").await;

        let table = DispatchTable::new(
            client(&bus, 100, 0),
            vec!["A".to_string(), "B".to_string()],
            Box::new(StaticRouter::new("A")),
        )
        .with_policy(DispatchPolicy::FirstSuccess { max_candidates: 2 });

        let report = table.execute("q").await.unwrap();
        assert_eq!(report.winner.model_id, "B");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].model_id, "A");
        assert!(matches!(
            report.failures[0].error,
            AskError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_every_candidate_down_aggregates_all_reasons() {
        let bus: Arc<InMemoryBus> = Arc::new(InMemoryBus::new());
        // A times out; B has no responders at all.
        let _silent = bus.subscribe("models.A");

        let table = DispatchTable::new(
            client(&bus, 100, 0),
            vec!["A".to_string(), "B".to_string()],
            Box::new(StaticRouter::new("A")),
        )
        .with_policy(DispatchPolicy::FirstSuccess { max_candidates: 2 });

        let err = table.execute("q").await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("A:"));
        assert!(text.contains("B:"));
    }

    // =========================================================================
    // CORRELATION AND BALANCING UNDER CONCURRENCY
    // =========================================================================

    #[tokio::test]
    async fn test_concurrent_queries_to_distinct_experts_stay_correlated() {
        let bus = Arc::new(InMemoryBus::new());
        let _a = spawn_tagging_expert(&bus, "A").await;
        let _b = spawn_tagging_expert(&bus, "B").await;

        let caller = client(&bus, 800, 0);
        let mut handles = Vec::new();
        for i in 0..24 {
            let caller = Arc::clone(&caller);
            let target = if i % 2 == 0 { "A" } else { "B" };
            handles.push(tokio::spawn(async move {
                let response = caller.ask(target, &format!("q{i}")).await.unwrap();
                // Each reply carries its own expert's tag and payload.
                assert_eq!(response.model_id, target);
                assert_eq!(response.payload, format!("{target}:q{i}"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(caller.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_replicas_share_one_queue_group() {
        let bus: Arc<InMemoryBus> = Arc::new(InMemoryBus::new());
        let served_a = Arc::new(AtomicUsize::new(0));
        let served_b = Arc::new(AtomicUsize::new(0));

        for counter in [&served_a, &served_b] {
            let counter = Arc::clone(counter);
            let responder = Arc::new(Responder::new(
                Arc::clone(&bus) as Arc<dyn MessageBus>,
                "Shared",
                Arc::new(LocalExpert::new(move |p: &str| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(p.to_string())
                })),
            ));
            tokio::spawn(Arc::clone(&responder).run());
            tokio::task::yield_now().await;
        }

        let table = DispatchTable::new(
            client(&bus, 800, 0),
            vec!["Shared".to_string()],
            Box::new(RoundRobinRouter::new()),
        );
        for i in 0..12 {
            table.execute(&format!("q{i}")).await.unwrap();
        }

        let a = served_a.load(Ordering::SeqCst);
        let b = served_b.load(Ordering::SeqCst);
        assert_eq!(a + b, 12);
        assert!(a > 0 && b > 0, "both replicas should serve: {a}/{b}");
    }

    // =========================================================================
    // HEALTH-BASED REROUTING
    // =========================================================================

    #[tokio::test]
    async fn test_load_aware_router_steers_away_from_failing_expert() {
        let bus = Arc::new(InMemoryBus::new());
        // Only B actually runs; A exists in the table but is degraded.
        let _b = spawn_tagging_expert(&bus, "B").await;

        let experts = vec!["A".to_string(), "B".to_string()];
        let stats = Arc::new(ExpertStatsTracker::new(&experts));
        for _ in 0..4 {
            stats.record_request("A");
            stats.record_result("A", 50.0, false);
        }

        let router = LoadAwareRouter::new(Box::new(StaticRouter::new("A")), stats);
        let table = DispatchTable::new(client(&bus, 800, 0), experts, Box::new(router));

        // Even with one candidate allowed, the degraded primary is demoted
        // and the healthy expert answers.
        let report = table.execute("q").await.unwrap();
        assert_eq!(report.winner.model_id, "B");
        assert!(report.failures.is_empty());
    }

    // =========================================================================
    // RETRY BUDGETS AND TIME BUDGETS
    // =========================================================================

    #[tokio::test]
    async fn test_retry_budget_rescues_a_slow_first_attempt() {
        let bus: Arc<InMemoryBus> = Arc::new(InMemoryBus::new());
        let mut server = bus.subscribe("models.Flaky");

        // Drop the first delivery, answer from the second on.
        let server_bus = Arc::clone(&bus);
        tokio::spawn(async move {
            let _dropped = server.recv().await;
            while let Some(msg) = server.recv().await {
                let req = dit_proto::Request::decode(&msg.payload).unwrap();
                let resp =
                    dit_proto::Response::success(req.request_id, "Flaky", "recovered", 1);
                let reply = msg.reply.expect("reply destination");
                let _ = server_bus.publish(&reply, resp.encode().unwrap()).await;
            }
        });

        let table = DispatchTable::new(
            client(&bus, 150, 2),
            vec!["Flaky".to_string()],
            Box::new(RoundRobinRouter::new()),
        );
        let report = table.execute("q").await.unwrap();
        assert_eq!(report.winner.payload, "recovered");
    }

    #[tokio::test]
    async fn test_orchestrator_stops_issuing_when_budget_runs_out() {
        let bus: Arc<InMemoryBus> = Arc::new(InMemoryBus::new());
        let slow = Arc::new(Responder::new(
            Arc::clone(&bus) as Arc<dyn MessageBus>,
            "Slow",
            Arc::new(SlowExpert {
                delay: Duration::from_millis(60),
            }),
        ));
        tokio::spawn(Arc::clone(&slow).run());
        tokio::task::yield_now().await;

        let table = Arc::new(DispatchTable::new(
            client(&bus, 2000, 0),
            vec!["Slow".to_string()],
            Box::new(RoundRobinRouter::new()),
        ));
        let orchestrator = Orchestrator::new(table);

        let queries: Vec<String> = (0..20).map(|i| format!("q{i}")).collect();
        let outcomes = orchestrator
            .run(&queries, Duration::from_millis(150))
            .await
            .unwrap();

        // Roughly two to three queries fit in the budget; certainly not all.
        assert!(!outcomes.is_empty());
        assert!(outcomes.len() < queries.len());
        for outcome in &outcomes {
            assert!(outcome.is_ok());
        }
    }

    // =========================================================================
    // SHUTDOWN
    // =========================================================================

    #[tokio::test]
    async fn test_drained_responder_leaves_no_responders_behind() {
        let bus = Arc::new(InMemoryBus::new());
        let responder = spawn_tagging_expert(&bus, "Echo").await;

        let table = DispatchTable::new(
            client(&bus, 800, 0),
            vec!["Echo".to_string()],
            Box::new(RoundRobinRouter::new()),
        );
        table.execute("before shutdown").await.unwrap();

        responder.shutdown();
        // Give the run loop a moment to drop its subscription.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = table.execute("after shutdown").await.unwrap_err();
        match err {
            DispatchError::AllCandidatesFailed(failures) => {
                assert!(matches!(
                    failures[0].error,
                    AskError::NoResponders { .. }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
