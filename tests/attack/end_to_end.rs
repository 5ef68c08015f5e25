use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use golden_seat_harness::attack::{AttackPlan, LoadScheduler};
use golden_seat_harness::config::Config;
use golden_seat_harness::domain::Credential;
use golden_seat_harness::error::{HarnessError, ProvisioningError};
use golden_seat_harness::report::Report;
use golden_seat_harness::run_harness;

use super::stub::SeatStub;

fn config(concurrency: u32, duration: Duration, pacing: Duration) -> Config {
    let mut cfg = Config::default();
    cfg.load.concurrency = concurrency;
    cfg.load.duration = duration;
    cfg.load.pacing_delay = pacing;
    cfg
}

/// Ten clients for five seconds against a service with one seat.
#[tokio::test(start_paused = true)]
async fn test_single_seat_is_won_exactly_once() {
    let stub = Arc::new(SeatStub::with_seats(1));
    let cfg = config(10, Duration::from_secs(5), Duration::from_secs(1));

    let report = run_harness(Arc::clone(&stub), &cfg, CancellationToken::new())
        .await
        .expect("run should complete");

    assert_eq!(stub.logins(), 1);
    assert_eq!(report.total_requests, stub.claims());
    assert!(report.total_requests >= 50, "{}", report.total_requests);
    assert_eq!(report.won, 1);
    assert_eq!(report.rejected_expected, report.total_requests - 1);
    assert_eq!(report.rejected_unexpected, 0);
    assert!(report.exclusivity_held);

    let run = report.run.as_ref().unwrap();
    assert_eq!(run.virtual_users, 10);
    assert!(!run.interrupted);
}

/// A buggy service that hands out two seats must be caught.
#[tokio::test(start_paused = true)]
async fn test_double_grant_is_reported_as_violation() {
    let stub = Arc::new(SeatStub::with_seats(2));
    let cfg = config(10, Duration::from_secs(5), Duration::from_secs(1));

    let report = run_harness(Arc::clone(&stub), &cfg, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.won, 2);
    assert_eq!(report.winners.len(), 2);
    assert!(!report.exclusivity_held);
    assert!(report.to_string().contains("VIOLATED"));
}

#[tokio::test(start_paused = true)]
async fn test_seat_capacity_accepts_the_configured_number_of_winners() {
    let stub = Arc::new(SeatStub::with_seats(3));
    let mut cfg = config(10, Duration::from_secs(2), Duration::from_secs(1));
    cfg.load.seat_capacity = 3;

    let report = run_harness(stub, &cfg, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.won, 3);
    assert!(report.exclusivity_held);
}

/// A login response without a token aborts before any claim is sent.
#[tokio::test(start_paused = true)]
async fn test_missing_token_aborts_before_load() {
    let stub = Arc::new(SeatStub::with_seats(1).login_body(json!({"data": {}})));
    let cfg = config(10, Duration::from_secs(5), Duration::from_secs(1));

    let err = run_harness(Arc::clone(&stub), &cfg, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Provisioning(ProvisioningError::MissingToken { .. })
    ));
    assert_eq!(stub.claims(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_never_logs_in() {
    let stub = Arc::new(SeatStub::with_seats(1));
    let cfg = config(0, Duration::from_secs(5), Duration::from_secs(1));

    let err = run_harness(Arc::clone(&stub), &cfg, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::Config(_)));
    assert_eq!(stub.logins(), 0);
    assert_eq!(stub.claims(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_blank_token_aborts_before_load() {
    let stub = Arc::new(SeatStub::with_seats(1).login_body(json!({"data": {"token": "  "}})));
    let cfg = config(3, Duration::from_secs(1), Duration::from_secs(1));

    let err = run_harness(Arc::clone(&stub), &cfg, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HarnessError::Provisioning(ProvisioningError::EmptyToken { .. })
    ));
    assert_eq!(stub.claims(), 0);
}

/// No request starts after the cutoff, and the run ends within
/// duration + one request latency + one pacing delay.
#[tokio::test(start_paused = true)]
async fn test_no_request_starts_after_cutoff() {
    let duration = Duration::from_secs(3);
    let latency = Duration::from_millis(300);
    let pacing = Duration::from_millis(700);

    let stub = Arc::new(SeatStub::with_seats(1).latency(latency));
    let plan = AttackPlan::from_config(&config(8, duration, pacing));
    let scheduler = LoadScheduler::new(Arc::clone(&stub), plan);

    let t0 = Instant::now();
    let run = scheduler.run(Credential::new("stub-jwt").unwrap()).await;
    let wall = t0.elapsed();

    let starts = stub.claim_starts();
    assert!(!starts.is_empty());
    assert!(starts.iter().all(|s| s.duration_since(t0) <= duration));
    assert!(wall <= duration + latency + pacing, "{wall:?}");
    assert_eq!(run.log.len() as u64, stub.claims());

    let report = Report::from_run(&run, 1);
    assert_eq!(report.total_requests, run.total_iterations());
}

/// Ctrl-C style cancellation still yields a report for what was sent.
#[tokio::test(start_paused = true)]
async fn test_interrupted_run_still_reports() {
    let stub = Arc::new(SeatStub::with_seats(1));
    let cfg = config(4, Duration::from_secs(60), Duration::from_secs(1));

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        trigger.cancel();
    });

    let report = run_harness(Arc::clone(&stub), &cfg, shutdown).await.unwrap();

    // requests at t = 0, 1, 2s for each of the 4 clients
    assert_eq!(report.total_requests, 12);
    assert_eq!(report.won, 1);
    assert!(report.run.as_ref().unwrap().interrupted);
}
