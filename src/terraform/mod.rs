//! Terraform CLI driver
//!
//! Wraps the `terraform` executable for the lifecycle the scenario needs:
//! init, refresh, apply, destroy, and output lookup. Each command runs in the
//! fixture directory with the configured environment and is retried when its
//! output matches a known transient failure.
//!
//! The scenario talks to terraform through the `Terraform` trait so it can be
//! exercised without a real binary or cloud account.

mod args;
mod options;
mod retryable;

pub use args::{format_args, to_hcl_string};
pub use options::{RetryableError, TerraformOptions};

use crate::error::{ConfigError, EcsTestError, Result};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Terraform lifecycle operations used by the scenario
#[async_trait]
pub trait Terraform: Send + Sync {
    /// `terraform init`
    async fn init(&self) -> Result<()>;

    /// `terraform refresh`, picking up changes made outside terraform
    async fn refresh(&self) -> Result<()>;

    /// `terraform apply`
    async fn apply(&self) -> Result<()>;

    /// `terraform destroy`
    async fn destroy(&self) -> Result<()>;

    /// Value of an output, or `None` when it is null, undeclared, or there
    /// is no state yet
    async fn output_optional(&self, name: &str) -> Result<Option<String>>;

    /// Value of an output that must exist
    async fn output(&self, name: &str) -> Result<String> {
        self.output_optional(name)
            .await?
            .ok_or_else(|| EcsTestError::MissingOutput {
                name: name.to_string(),
            })
    }
}

/// Process-backed terraform driver
#[derive(Debug, Clone)]
pub struct TerraformCli {
    options: TerraformOptions,
}

impl TerraformCli {
    /// Create a driver, checking that the binary is on PATH and the fixture
    /// directory exists
    pub fn new(options: TerraformOptions) -> Result<Self> {
        which::which(&options.binary)
            .map_err(|_| ConfigError::BinaryNotFound(options.binary.clone()))?;

        if !options.terraform_dir.is_dir() {
            return Err(ConfigError::FixtureNotFound(
                options.terraform_dir.display().to_string(),
            )
            .into());
        }

        Ok(Self { options })
    }

    pub fn options(&self) -> &TerraformOptions {
        &self.options
    }

    /// Run a terraform sub-command with retries, returning its stdout
    pub async fn run_command(&self, args: &[&str]) -> Result<String> {
        let formatted = format_args(&self.options, args);
        let policy = self.options.retry_policy();

        policy
            .execute_with_retry(|| self.run_once(&formatted))
            .await
            .map_err(|e| match e {
                // Surface the last terraform failure rather than the wrapper
                EcsTestError::Retryable {
                    source: Some(source),
                    ..
                } => match source.downcast::<EcsTestError>() {
                    Ok(inner) => *inner,
                    Err(other) => EcsTestError::Retryable {
                        attempt: policy.max_attempts(),
                        max_attempts: policy.max_attempts(),
                        reason: other.to_string(),
                        source: Some(other),
                    },
                },
                other => other,
            })
    }

    async fn run_once(&self, args: &[String]) -> Result<String> {
        let command = args.first().cloned().unwrap_or_default();
        info!(
            "Running terraform {} in {}",
            command,
            self.options.terraform_dir.display()
        );
        debug!("terraform args: {:?}", args);

        let output = Command::new(&self.options.binary)
            .args(args)
            .current_dir(&self.options.terraform_dir)
            .envs(&self.options.env_vars)
            .output()
            .await
            .map_err(|e| {
                EcsTestError::Io(std::io::Error::other(format!(
                    "Failed to execute {} {}: {}",
                    self.options.binary, command, e
                )))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = if stderr.is_empty() {
            stdout
        } else {
            format!("{}\n{}", stdout, stderr)
        };

        let retryable = match self.options.match_retryable(&combined) {
            Some(matched) => {
                warn!(
                    "terraform {} hit a transient error: {}",
                    command, matched.reason
                );
                true
            }
            None => false,
        };

        Err(EcsTestError::Terraform {
            command,
            exit_code: output.status.code(),
            output: combined.trim().to_string(),
            retryable,
        })
    }
}

#[async_trait]
impl Terraform for TerraformCli {
    async fn init(&self) -> Result<()> {
        self.run_command(&["init", "-upgrade=false"]).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.run_command(&["refresh", "-input=false", "-lock=false"])
            .await?;
        Ok(())
    }

    async fn apply(&self) -> Result<()> {
        self.run_command(&["apply", "-input=false", "-auto-approve"])
            .await?;
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.run_command(&["destroy", "-auto-approve", "-input=false"])
            .await?;
        Ok(())
    }

    async fn output_optional(&self, name: &str) -> Result<Option<String>> {
        match self.run_command(&["output", "-json", name]).await {
            Ok(stdout) => parse_output_value(&stdout),
            Err(EcsTestError::Terraform { output, .. }) if is_missing_output(&output) => {
                debug!("terraform output {} not present", name);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Interpret `terraform output -json <name>` stdout
pub fn parse_output_value(stdout: &str) -> Result<Option<String>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(trimmed)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Ok(Some(other.to_string())),
    }
}

fn is_missing_output(output: &str) -> bool {
    output.contains("No outputs found")
        || output.contains("could not be found")
        || (output.contains("Output") && output.contains("not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_value() {
        assert_eq!(
            parse_output_value("\"arn:aws:ecs:us-west-2:1:cluster/x\"\n").unwrap(),
            Some("arn:aws:ecs:us-west-2:1:cluster/x".to_string())
        );
        assert_eq!(parse_output_value("null\n").unwrap(), None);
        assert_eq!(parse_output_value("").unwrap(), None);
        assert_eq!(
            parse_output_value("[\"a\",\"b\"]").unwrap(),
            Some("[\"a\",\"b\"]".to_string())
        );
        assert!(parse_output_value("not json").is_err());
    }

    #[test]
    fn test_is_missing_output() {
        assert!(is_missing_output(
            "Warning: No outputs found\n\nThe state file either has no outputs defined"
        ));
        assert!(is_missing_output(
            "Error: Output \"autoscaling_group_name\" not found"
        ));
        assert!(!is_missing_output("Error: Failed to load state"));
    }

    #[test]
    fn test_new_rejects_missing_binary() {
        let options = TerraformOptions::new(".").binary("definitely-not-terraform-xyz");
        let err = TerraformCli::new(options).unwrap_err();
        assert!(matches!(
            err,
            EcsTestError::Config(ConfigError::BinaryNotFound(_))
        ));
    }
}
