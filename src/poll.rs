//! Bounded polling for eventually-consistent AWS state
//!
//! A poll is a fixed interval and a fixed number of probes. There is no
//! backoff: the things waited on (an EC2 instance joining the cluster, a log
//! line being indexed) arrive on their own schedule. A probe error ends the
//! poll immediately; only "not yet" is waited out.

use crate::error::{EcsTestError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// How long and how often to probe, and what to say when giving up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSpec {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout_message: String,
}

impl PollSpec {
    pub fn new(interval: Duration, max_attempts: u32, timeout_message: impl Into<String>) -> Self {
        Self {
            interval,
            max_attempts,
            timeout_message: timeout_message.into(),
        }
    }

    /// Waiting for an EC2-backed container instance to register
    pub fn cluster_hydration() -> Self {
        Self::new(
            Duration::from_secs(15),
            17,
            "ECS Cluster had no instances after 4 minutes",
        )
    }

    /// Waiting for the task's output to reach CloudWatch Logs
    pub fn log_delivery() -> Self {
        Self::new(
            Duration::from_secs(1),
            31,
            "ECS task had no logs after 30 seconds",
        )
    }
}

/// Call `probe` until it yields `Some`, sleeping `spec.interval` between
/// probes, for at most `spec.max_attempts` probes
pub async fn poll_until<T, F, Fut>(spec: &PollSpec, what: &str, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let max_attempts = spec.max_attempts.max(1);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("{}...", what));

    for attempt in 1..=max_attempts {
        let outcome = match probe().await {
            Ok(outcome) => outcome,
            Err(e) => {
                pb.finish_with_message(format!("{}: failed", what));
                return Err(e);
            }
        };

        if let Some(value) = outcome {
            pb.finish_with_message(format!("{}: done", what));
            debug!("{} satisfied on probe {}/{}", what, attempt, max_attempts);
            return Ok(value);
        }

        if attempt == max_attempts {
            break;
        }

        pb.set_message(format!("{} (probe {}/{})...", what, attempt, max_attempts));
        sleep(spec.interval).await;
    }

    pb.finish_with_message(format!("{}: timed out", what));
    Err(EcsTestError::Timeout(spec.timeout_message.clone()))
}
