//! End-to-end load tests against an in-process server

use std::{net::SocketAddr, time::Duration};
use storefront_bench::{
    runner::{save_results, LoadRunner},
    LoadProfile, LoadTestSummary, Target,
};
use storefront_core::{Mode, WorkloadParams};
use storefront_server::{
    config::ServerConfig,
    profiling::ProfilingHook,
    server::{create_router, ServerState},
};

async fn spawn_server() -> SocketAddr {
    let state = ServerState::with_profiling(ServerConfig::default(), ProfilingHook::disabled());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    addr
}

fn short_profile() -> LoadProfile {
    LoadProfile {
        rate: 20,
        time_unit: Duration::from_secs(1),
        duration: Duration::from_millis(500),
        max_in_flight: 10,
        request_timeout: Duration::from_secs(10),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_after_run_passes_checks_and_hits_cache() {
    let addr = spawn_server().await;
    let runner = LoadRunner::new(short_profile()).unwrap();
    let target = Target::new(
        format!("http://{}", addr),
        WorkloadParams::new(Mode::After, 1000, 4),
    );

    let summary = runner.run(&target).await.unwrap();

    assert_eq!(summary.mode, Mode::After);
    assert_eq!(summary.requests as u64 + summary.dropped, 10);
    assert!(summary.requests > 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.check_rate, 1.0);
    assert!(summary.cached > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_before_run_is_never_cached() {
    let addr = spawn_server().await;
    let runner = LoadRunner::new(short_profile()).unwrap();
    let target = Target::new(
        format!("http://{}/", addr),
        WorkloadParams::new(Mode::Before, 1000, 2),
    );

    let summary = runner.run(&target).await.unwrap();

    assert_eq!(summary.failed, 0);
    assert_eq!(summary.cached, 0);
}

#[tokio::test]
async fn test_unreachable_target_fails_checks() {
    let profile = LoadProfile {
        rate: 10,
        duration: Duration::from_millis(200),
        request_timeout: Duration::from_secs(2),
        ..LoadProfile::default()
    };
    let runner = LoadRunner::new(profile).unwrap();
    // Port 9 (discard) is closed on test hosts; the connection is refused.
    let target = Target::new("http://127.0.0.1:9", WorkloadParams::default());

    let summary = runner.run(&target).await.unwrap();

    assert_eq!(summary.requests, 2);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.check_rate, 0.0);
}

#[test]
fn test_save_results_writes_json_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let summary = LoadTestSummary::from_samples("after (size=1000, rounds=4)", Mode::After, &[], 0);

    let (json_path, md_path) = save_results(dir.path().join("out"), &[summary]).unwrap();

    let json: Vec<LoadTestSummary> =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(json.len(), 1);
    assert_eq!(json[0].mode, Mode::After);

    let report = std::fs::read_to_string(md_path).unwrap();
    assert!(report.contains("after (size=1000, rounds=4)"));
}
