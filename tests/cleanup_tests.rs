//! Tests for deferred teardown ordering and failure handling

use ecs_terratest::cleanup::{CleanupMode, Teardown};
use ecs_terratest::error::EcsTestError;
use std::sync::Mutex;

#[tokio::test]
async fn test_steps_run_newest_first() {
    let order = Mutex::new(Vec::new());
    let mut teardown = Teardown::new();

    teardown.defer("destroy", CleanupMode::Required, async {
        order.lock().unwrap().push("destroy");
        Ok(())
    });
    teardown.defer("deregister", CleanupMode::BestEffort, async {
        order.lock().unwrap().push("deregister");
        Ok(())
    });
    assert_eq!(teardown.len(), 2);

    let report = teardown.run().await;
    assert!(report.is_clean());
    assert_eq!(report.completed, vec!["deregister", "destroy"]);
    assert_eq!(*order.lock().unwrap(), vec!["deregister", "destroy"]);
}

#[tokio::test]
async fn test_best_effort_failure_is_ignored() {
    let mut teardown = Teardown::new();
    teardown.defer("destroy", CleanupMode::Required, async { Ok(()) });
    teardown.defer("deregister", CleanupMode::BestEffort, async {
        Err(EcsTestError::Ecs("ClientException".to_string()))
    });

    let report = teardown.run().await;
    assert!(report.is_clean());
    assert_eq!(report.completed, vec!["destroy"]);
    assert_eq!(report.ignored.len(), 1);
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn test_required_failure_does_not_stop_later_steps() {
    let ran_first_registered = Mutex::new(false);
    let mut teardown = Teardown::new();

    teardown.defer("first", CleanupMode::Required, async {
        *ran_first_registered.lock().unwrap() = true;
        Ok(())
    });
    teardown.defer("second", CleanupMode::Required, async {
        Err(EcsTestError::Io(std::io::Error::other("boom")))
    });

    let report = teardown.run().await;
    assert!(*ran_first_registered.lock().unwrap());
    assert!(!report.is_clean());

    let err = report.into_result().unwrap_err();
    assert!(matches!(err, EcsTestError::Cleanup(ref steps) if steps.len() == 1));
    assert!(err.to_string().contains("second"));
}

#[tokio::test]
async fn test_disabled_teardown_drops_steps() {
    let ran = Mutex::new(false);
    let mut teardown = Teardown::disabled();
    assert!(!teardown.is_enabled());

    teardown.defer("destroy", CleanupMode::Required, async {
        *ran.lock().unwrap() = true;
        Ok(())
    });
    assert!(teardown.is_empty());

    let report = teardown.run().await;
    assert!(report.completed.is_empty());
    assert!(!*ran.lock().unwrap());
}
