//! Options for driving a terraform working directory

use crate::retry::FixedIntervalPolicy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::retryable::default_retryable_errors;

/// A compiled transient-error pattern and the reason logged when it matches
#[derive(Debug, Clone)]
pub struct RetryableError {
    pub pattern: Regex,
    pub reason: String,
}

/// How to run terraform against one fixture directory
#[derive(Debug, Clone)]
pub struct TerraformOptions {
    /// Directory holding the fixture configuration and its state
    pub terraform_dir: PathBuf,
    /// Input variables, passed as `-var` arguments
    pub vars: BTreeMap<String, Value>,
    /// Extra environment for the terraform process
    pub env_vars: BTreeMap<String, String>,
    pub retryable_errors: Vec<RetryableError>,
    pub max_retries: u32,
    pub time_between_retries: Duration,
    /// Executable to run, `terraform` unless overridden
    pub binary: String,
    pub no_color: bool,
}

impl TerraformOptions {
    pub fn new(terraform_dir: impl Into<PathBuf>) -> Self {
        Self {
            terraform_dir: terraform_dir.into(),
            vars: BTreeMap::new(),
            env_vars: BTreeMap::new(),
            retryable_errors: Vec::new(),
            max_retries: 0,
            time_between_retries: Duration::ZERO,
            binary: "terraform".to_string(),
            no_color: true,
        }
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(name.into(), value.into());
        self
    }

    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Install the known transient terraform errors and the default retry
    /// budget (3 retries, 5 seconds apart), keeping any patterns or budget
    /// already configured.
    pub fn with_default_retryable_errors(mut self) -> Self {
        if self.retryable_errors.is_empty() {
            self.retryable_errors = default_retryable_errors();
        }
        if self.max_retries == 0 {
            self.max_retries = 3;
        }
        if self.time_between_retries.is_zero() {
            self.time_between_retries = Duration::from_secs(5);
        }
        self
    }

    pub fn with_retries(mut self, max_retries: u32, time_between_retries: Duration) -> Self {
        self.max_retries = max_retries;
        self.time_between_retries = time_between_retries;
        self
    }

    /// First retryable pattern matching the given command output
    pub fn match_retryable(&self, output: &str) -> Option<&RetryableError> {
        self.retryable_errors
            .iter()
            .find(|e| e.pattern.is_match(output))
    }

    pub(crate) fn retry_policy(&self) -> FixedIntervalPolicy {
        FixedIntervalPolicy::new(self.max_retries, self.time_between_retries)
    }
}
