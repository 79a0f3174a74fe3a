//! Tests for fixed-interval retry logic
//!
//! Tests verify the retry budget, non-retryable short-circuit, and the
//! error returned once retries are exhausted.

use ecs_terratest::error::{EcsTestError, IsRetryable};
use ecs_terratest::retry::{FixedIntervalPolicy, RetryPolicy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

fn transient() -> EcsTestError {
    EcsTestError::Terraform {
        command: "init".to_string(),
        exit_code: Some(1),
        output: "Error: Failed to query available provider packages".to_string(),
        retryable: true,
    }
}

#[test]
fn test_terraform_policy_budget() {
    let policy = FixedIntervalPolicy::for_terraform();
    // 3 retries means 4 attempts
    assert_eq!(policy.max_attempts(), 4);
}

#[tokio::test]
async fn test_retry_succeeds_immediately() {
    let policy = FixedIntervalPolicy::new(3, Duration::from_millis(1));
    let call_count = AtomicU32::new(0);

    let result = policy
        .execute_with_retry(|| async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Ok::<String, EcsTestError>("success".to_string())
        })
        .await;

    assert_eq!(result.unwrap(), "success");
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_succeeds_after_failures() {
    let policy = FixedIntervalPolicy::new(3, Duration::from_millis(1));
    let call_count = AtomicU32::new(0);

    let result = policy
        .execute_with_retry(|| async {
            let count = call_count.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                Err(transient())
            } else {
                Ok::<String, EcsTestError>("success".to_string())
            }
        })
        .await;

    assert_eq!(result.unwrap(), "success");
    assert_eq!(call_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_exhausts_attempts() {
    let policy = FixedIntervalPolicy::new(2, Duration::from_millis(1));
    let call_count = AtomicU32::new(0);

    let result = policy
        .execute_with_retry(|| async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Err::<String, EcsTestError>(transient())
        })
        .await;

    match result {
        Err(EcsTestError::Retryable {
            attempt,
            max_attempts,
            ..
        }) => {
            assert_eq!(attempt, 3);
            assert_eq!(max_attempts, 3);
        }
        other => panic!("expected Retryable, got {:?}", other),
    }
    assert_eq!(call_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_non_retryable_error() {
    let policy = FixedIntervalPolicy::new(3, Duration::from_millis(1));
    let call_count = AtomicU32::new(0);

    let result = policy
        .execute_with_retry(|| async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Err::<String, EcsTestError>(EcsTestError::assertion("status", "ACTIVE", "INACTIVE"))
        })
        .await;

    assert!(matches!(result, Err(EcsTestError::Assertion { .. })));
    // Non-retryable errors should not be retried
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_retries_calls_once() {
    let policy = FixedIntervalPolicy::new(0, Duration::from_millis(1));
    let call_count = AtomicU32::new(0);

    let result = policy
        .execute_with_retry(|| async {
            call_count.fetch_add(1, Ordering::SeqCst);
            Err::<(), EcsTestError>(transient())
        })
        .await;

    assert!(result.is_err());
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_waits_between_attempts() {
    let policy = FixedIntervalPolicy::new(2, Duration::from_millis(30));
    let call_count = AtomicU32::new(0);
    let start = Instant::now();

    let _ = policy
        .execute_with_retry(|| async {
            let count = call_count.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                Err(transient())
            } else {
                Ok::<(), EcsTestError>(())
            }
        })
        .await;

    // Two waits of 30ms each
    assert!(start.elapsed() >= Duration::from_millis(60));
}

#[test]
fn test_is_retryable_trait() {
    assert!(transient().is_retryable());

    let io_error = EcsTestError::Io(std::io::Error::other("test"));
    assert!(io_error.is_retryable());

    assert!(!EcsTestError::Timeout("no logs".to_string()).is_retryable());
    assert!(!EcsTestError::Ecs("AccessDenied".to_string()).is_retryable());
    assert!(!EcsTestError::MissingOutput {
        name: "ecs_cluster_arn".to_string()
    }
    .is_retryable());
}
