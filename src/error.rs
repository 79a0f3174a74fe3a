//! Error types for ecs-terratest
//!
//! Library code uses `crate::error::Result<T>`, which returns `EcsTestError`.
//! The CLI uses `anyhow::Result<T>` and converts at the boundary, so the
//! structured variant survives for exit-code mapping (see `exit_codes`).
//!
//! ## Retry Awareness
//!
//! Errors implement `IsRetryable`. Only transient failures are retryable:
//! Terraform commands whose output matched a known transient pattern, raw
//! I/O errors, and the `Retryable` wrapper itself. Assertion mismatches and
//! poll timeouts are terminal; a scenario never retries its own checks.
//!
//! ## When to Use Which Error
//!
//! - `Config`: missing `AWS_DEFAULT_REGION`, bad config file, unknown
//!   terraform binary.
//! - `Terraform`: a terraform sub-command exited non-zero.
//! - `MissingOutput`: a required terraform output is null or absent.
//! - `Ecs`/`Logs`/`AutoScaling`: AWS SDK call failures, per service.
//! - `Assertion`: the infrastructure answered, but not with what we expected.
//! - `Timeout`: a bounded poll ran out of attempts.
//! - `Cleanup`: a required teardown step failed.

use thiserror::Error;

/// Main error type for ecs-terratest
#[derive(Error, Debug)]
pub enum EcsTestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("terraform {command} failed (exit code {exit_code:?}): {output}")]
    Terraform {
        command: String,
        exit_code: Option<i32>,
        output: String,
        retryable: bool,
    },

    #[error("Terraform output {name:?} is missing or null")]
    MissingOutput { name: String },

    #[error("ECS error: {0}")]
    Ecs(String),

    #[error("CloudWatch Logs error: {0}")]
    Logs(String),

    #[error("Auto Scaling error: {0}")]
    AutoScaling(String),

    #[error("Assertion failed: {what}: expected {expected:?}, got {actual:?}")]
    Assertion {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Retryable error (attempt {attempt}/{max_attempts}): {reason}")]
    Retryable {
        attempt: u32,
        max_attempts: u32,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cleanup failed: {}", .0.join("; "))]
    Cleanup(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingEnv(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Fixture directory not found: {0}")]
    FixtureNotFound(String),

    #[error("Executable not found on PATH: {0}")]
    BinaryNotFound(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsTestError>;

impl EcsTestError {
    /// Shorthand for an `Assertion` error.
    pub fn assertion(
        what: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        EcsTestError::Assertion {
            what: what.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Trait for determining if an error is retryable
///
/// Used by `RetryPolicy` implementations in `src/retry.rs`.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for EcsTestError {
    fn is_retryable(&self) -> bool {
        match self {
            EcsTestError::Terraform { retryable, .. } => *retryable,
            EcsTestError::Retryable { .. } | EcsTestError::Io(_) => true,
            _ => false,
        }
    }
}
