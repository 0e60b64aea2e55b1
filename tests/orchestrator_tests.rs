// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * End-to-end Tests for the Run Lifecycle
 * Pacing, cancellation, finalization and the scan-and-exploit loop
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;
use std::time::Duration;
use swarmscan::config::EngineConfig;
use swarmscan::http_client::HttpClient;
use swarmscan::persistence::{InMemoryRunStore, RunStore};
use swarmscan::proxy::{ProxyPool, ProxyProtocol, ProxyRecord};
use swarmscan::realtime::{ChannelListener, NoopListener};
use swarmscan::{EngineError, FindingType, Orchestrator, Run, RunConfig, RunStatus};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orchestrator() -> (Orchestrator, Arc<InMemoryRunStore>) {
    let config = EngineConfig::default();
    let http = Arc::new(HttpClient::with_config(&config.http).unwrap());
    let pool = Arc::new(ProxyPool::new(Arc::clone(&http), &config.proxy));
    let store = Arc::new(InMemoryRunStore::new());
    let orchestrator = Orchestrator::new(config, pool, http, store.clone());
    (orchestrator, store)
}

fn run_config(target: &str, users: u32, rps: u32, duration: u64) -> RunConfig {
    RunConfig {
        target_url: target.to_string(),
        concurrent_users: users,
        requests_per_second: rps,
        duration_seconds: duration,
        browser_instances: 0,
        exploit_vulnerabilities: false,
    }
}

async fn ok_target(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(&server)
        .await;
    server
}

/// Poll until `check` accepts the run or the deadline passes
async fn poll_until(orchestrator: &Orchestrator, id: &str, check: impl Fn(&Run) -> bool) -> Run {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    loop {
        let run = orchestrator.status(id).unwrap();
        if check(&run) || tokio::time::Instant::now() > deadline {
            return run;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_paced_run_completes_naturally() {
    let server = ok_target("ok").await;
    let (orchestrator, store) = orchestrator();

    let run = orchestrator
        .start(run_config(&server.uri(), 1, 1, 2), Arc::new(NoopListener))
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Running);
    assert_eq!(orchestrator.active_runs(), vec![run.id.clone()]);

    let finished = orchestrator.wait(&run.id).await.unwrap();

    assert_eq!(finished.status, RunStatus::Completed);
    assert!(
        (1..=3).contains(&finished.results.requests_total),
        "requests_total = {}",
        finished.results.requests_total
    );
    assert_eq!(finished.results.failed, 0);
    assert_eq!(finished.results.successful, finished.results.requests_total);
    assert_eq!(
        finished.results.response_times_ms.len() as u64,
        finished.results.requests_total
    );
    assert!(finished.ended_at.is_some());
    assert!(finished.duration_seconds.unwrap() >= 2.0);
    assert!(orchestrator.active_runs().is_empty());

    let stored = store.get_run(&run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Completed);
    assert_eq!(stored.results, finished.results);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_is_idempotent() {
    let server = ok_target("ok").await;
    let (orchestrator, _store) = orchestrator();

    let run = orchestrator
        .start(run_config(&server.uri(), 2, 5, 60), Arc::new(NoopListener))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let first = orchestrator.stop(&run.id).await.unwrap().expect("first stop finalizes");
    assert_eq!(first.status, RunStatus::Stopped);

    assert!(orchestrator.stop(&run.id).await.unwrap().is_none());

    let status = orchestrator.status(&run.id).unwrap();
    assert_eq!(status.status, RunStatus::Stopped);
    assert_eq!(status.results, first.results);

    // nothing lands after stop returns
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(orchestrator.status(&run.id).unwrap().results, first.results);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_request_is_discarded_after_stop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let (orchestrator, _store) = orchestrator();

    let run = orchestrator
        .start(run_config(&server.uri(), 1, 1, 60), Arc::new(NoopListener))
        .await
        .unwrap();

    // the first tick fires immediately; its request is now waiting on the delay
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!server.received_requests().await.unwrap().is_empty());

    let stopped = orchestrator.stop(&run.id).await.unwrap().unwrap();
    assert_eq!(stopped.results.requests_total, 0);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    let after = orchestrator.status(&run.id).unwrap();
    assert_eq!(after.results.requests_total, 0);
    assert!(after.results.response_times_ms.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scan_loop_reports_and_exploits_vulnerable_library() {
    let server = ok_target("<script src=\"/static/jquery 1.12.4.min.js\"></script>").await;
    let (orchestrator, _store) = orchestrator();
    let (listener, _progress_rx, mut finding_rx) = ChannelListener::new();

    let mut config = run_config(&server.uri(), 1, 1, 60);
    config.exploit_vulnerabilities = true;
    let run = orchestrator.start(config, Arc::new(listener)).await.unwrap();

    let observed = poll_until(&orchestrator, &run.id, |run| {
        !run.results.exploitation_attempts.is_empty()
    })
    .await;

    let library = observed
        .results
        .vulnerabilities
        .iter()
        .find(|f| f.finding_type == FindingType::VulnerableLibrary)
        .expect("vulnerable library finding");
    assert!(library.cves.iter().any(|c| c == "CVE-2021-21349"));

    assert_eq!(observed.results.exploitation_attempts.len(), 1);
    let attempt = &observed.results.exploitation_attempts[0];
    assert_eq!(attempt.target_finding, "CVE-2021-21349");
    assert!(!attempt.success);

    let announced = finding_rx.recv().await.unwrap();
    assert_eq!(announced.run_id, run.id);

    orchestrator.stop(&run.id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_error_status_counts_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (orchestrator, _store) = orchestrator();

    let run = orchestrator
        .start(run_config(&server.uri(), 1, 4, 60), Arc::new(NoopListener))
        .await
        .unwrap();
    let observed = poll_until(&orchestrator, &run.id, |run| run.results.failed >= 2).await;
    orchestrator.stop(&run.id).await.unwrap();

    assert!(observed.results.failed >= 2);
    assert_eq!(observed.results.successful, 0);
    assert_eq!(
        observed.results.response_times_ms.len() as u64,
        observed.results.requests_total
    );
    let error = &observed.results.errors[0];
    assert!(error.message.contains("HTTP 500"), "{}", error.message);
    assert!(error.proxy.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dead_proxy_failures_carry_proxy_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (orchestrator, _store) = orchestrator();
    orchestrator
        .pool()
        .add(ProxyRecord::new("127.0.0.1", 1, ProxyProtocol::Http));

    let run = orchestrator
        .start(run_config(&server.uri(), 1, 4, 60), Arc::new(NoopListener))
        .await
        .unwrap();
    let observed = poll_until(&orchestrator, &run.id, |run| run.results.failed >= 2).await;
    orchestrator.stop(&run.id).await.unwrap();

    assert!(observed.results.failed > 0);
    assert_eq!(observed.results.successful, 0);
    assert_eq!(
        observed.results.response_times_ms.len() as u64,
        observed.results.requests_total
    );
    assert_eq!(observed.results.errors[0].proxy.as_deref(), Some("127.0.0.1:1"));
    // traffic went to the dead proxy, never to the target
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_progress_snapshots_are_cumulative() {
    let server = ok_target("ok").await;
    let (orchestrator, _store) = orchestrator();
    let (listener, mut progress_rx, _finding_rx) = ChannelListener::new();

    let run = orchestrator
        .start(run_config(&server.uri(), 2, 4, 60), Arc::new(listener))
        .await
        .unwrap();

    let mut totals = Vec::new();
    while totals.len() < 5 {
        let update = tokio::time::timeout(Duration::from_secs(5), progress_rx.recv())
            .await
            .unwrap()
            .unwrap();
        totals.push(update.requests_total);
    }
    orchestrator.stop(&run.id).await.unwrap();

    assert!(totals.windows(2).all(|w| w[1] == w[0] + 1), "{:?}", totals);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_creation() {
    let (orchestrator, store) = orchestrator();

    let config = run_config("ftp://files.example.test", 1, 0, 0);

    match orchestrator.start(config, Arc::new(NoopListener)).await {
        Err(EngineError::ConfigValidation { violations }) => assert_eq!(violations.len(), 3),
        other => panic!("expected validation error, got {:?}", other.map(|r| r.id)),
    }

    assert!(orchestrator
        .start(run_config("", 1, 1, 1), Arc::new(NoopListener))
        .await
        .is_err());

    assert!(orchestrator.active_runs().is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
    let (orchestrator, _store) = orchestrator();
    assert!(matches!(
        orchestrator.status("missing"),
        Err(EngineError::RunNotFound(_))
    ));
    assert!(matches!(
        orchestrator.stop("missing").await,
        Err(EngineError::RunNotFound(_))
    ));
}
