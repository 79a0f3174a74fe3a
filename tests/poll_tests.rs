//! Tests for bounded polling

use ecs_terratest::error::EcsTestError;
use ecs_terratest::poll::{poll_until, PollSpec};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn quick(max_attempts: u32) -> PollSpec {
    PollSpec::new(Duration::from_millis(1), max_attempts, "gave up")
}

#[test]
fn test_stock_specs() {
    let hydration = PollSpec::cluster_hydration();
    assert_eq!(hydration.interval, Duration::from_secs(15));
    assert_eq!(hydration.max_attempts, 17);
    assert_eq!(
        hydration.timeout_message,
        "ECS Cluster had no instances after 4 minutes"
    );

    let logs = PollSpec::log_delivery();
    assert_eq!(logs.interval, Duration::from_secs(1));
    assert_eq!(logs.max_attempts, 31);
    assert_eq!(logs.timeout_message, "ECS task had no logs after 30 seconds");
}

#[tokio::test]
async fn test_returns_first_ready_value() {
    let probes = AtomicU32::new(0);

    let value = poll_until(&quick(5), "waiting", || async {
        let n = probes.fetch_add(1, Ordering::SeqCst);
        Ok::<_, EcsTestError>((n == 2).then_some("ready"))
    })
    .await
    .unwrap();

    assert_eq!(value, "ready");
    assert_eq!(probes.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_times_out_with_spec_message() {
    let probes = AtomicU32::new(0);

    let err = poll_until(&quick(4), "waiting", || async {
        probes.fetch_add(1, Ordering::SeqCst);
        Ok::<Option<()>, EcsTestError>(None)
    })
    .await
    .unwrap_err();

    match err {
        EcsTestError::Timeout(message) => assert_eq!(message, "gave up"),
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert_eq!(probes.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_probe_error_is_fatal() {
    let probes = AtomicU32::new(0);

    let err = poll_until(&quick(10), "waiting", || async {
        probes.fetch_add(1, Ordering::SeqCst);
        Err::<Option<()>, _>(EcsTestError::Ecs("ClusterNotFoundException".to_string()))
    })
    .await
    .unwrap_err();

    assert!(matches!(err, EcsTestError::Ecs(_)));
    assert_eq!(probes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_attempts_still_probes_once() {
    let probes = AtomicU32::new(0);

    let value = poll_until(&quick(0), "waiting", || async {
        probes.fetch_add(1, Ordering::SeqCst);
        Ok::<_, EcsTestError>(Some(7))
    })
    .await
    .unwrap();

    assert_eq!(value, 7);
    assert_eq!(probes.load(Ordering::SeqCst), 1);
}
