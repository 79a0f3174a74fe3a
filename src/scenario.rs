//! The simple-cluster scenario
//!
//! Provisions the fixture with terraform, then proves the cluster actually
//! works: it is ACTIVE, an EC2 container instance joins it, a task can be
//! placed on that instance, and the task's output reaches CloudWatch Logs.
//!
//! Cleanup is registered as the flow goes (terraform destroy before init,
//! task definition deregistration right after registration) and runs once
//! the body finishes, pass or fail.

use crate::aws::types::{ClusterSummary, TaskDefinitionRef, TaskDefinitionSpec, TaskRoles};
use crate::aws::{AutoScalingApi, AwsClients, EcsApi, LogsApi};
use crate::cleanup::{CleanupMode, CleanupReport, Teardown};
use crate::config::{Config, RunEnv, ENV_REGION};
use crate::error::{EcsTestError, Result};
use crate::naming::{default_tags, log_message, TestName};
use crate::poll::{poll_until, PollSpec};
use crate::terraform::{Terraform, TerraformCli, TerraformOptions};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Terraform outputs the fixture must expose
pub mod outputs {
    pub const AUTOSCALING_GROUP_NAME: &str = "autoscaling_group_name";
    pub const ECS_CLUSTER_ARN: &str = "ecs_cluster_arn";
    pub const ECS_CLUSTER_NAME: &str = "ecs_cluster_name";
    pub const CLOUDWATCH_LOG_GROUP_NAME: &str = "cloudwatch_log_group_name";
    pub const ECS_TASK_EXECUTION_ROLE_ARN: &str = "ecs_task_execution_role_arn";
    pub const ECS_TASK_ROLE_ARN: &str = "ecs_task_role_arn";
}

/// Timeouts and error tolerance for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioProfile {
    pub hydration: PollSpec,
    pub logs: PollSpec,
    /// Fail when a stale Auto Scaling group cannot be deleted
    pub strict_stale_asg_cleanup: bool,
}

impl Default for ScenarioProfile {
    fn default() -> Self {
        Self {
            hydration: PollSpec::cluster_hydration(),
            logs: PollSpec::log_delivery(),
            strict_stale_asg_cleanup: true,
        }
    }
}

impl ScenarioProfile {
    pub fn from_config(config: &Config) -> Self {
        Self {
            hydration: config.polling.hydration_spec(),
            logs: config.polling.log_spec(),
            strict_stale_asg_cleanup: config.scenario.strict_stale_asg_cleanup,
        }
    }
}

/// Per-run inputs
#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    pub region: String,
    pub test_name: TestName,
    pub tags: Vec<(String, String)>,
    pub skip_destroy: bool,
    pub profile: ScenarioProfile,
}

impl ScenarioSettings {
    /// Settings for a fresh run with a newly generated test name
    pub fn generate(config: &Config, env: &RunEnv) -> Self {
        Self {
            region: env.region.clone(),
            test_name: TestName::generate(&config.fixture.name_prefix),
            tags: default_tags(&config.fixture.test_label),
            skip_destroy: env.skip_destroy,
            profile: ScenarioProfile::from_config(config),
        }
    }
}

/// Terraform options for the fixture: `test_name` and `tags` variables, the
/// region in the environment, the default transient-error patterns, and
/// the configured retry budget
pub fn terraform_options(config: &Config, settings: &ScenarioSettings) -> Result<TerraformOptions> {
    let tags: Map<String, Value> = settings
        .tags
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    Ok(TerraformOptions::new(config.fixture_dir()?)
        .binary(&config.terraform.binary)
        .var("test_name", settings.test_name.as_str())
        .var("tags", Value::Object(tags))
        .env(ENV_REGION, &settings.region)
        .with_default_retryable_errors()
        .with_retries(
            config.terraform.max_retries,
            Duration::from_secs(config.terraform.time_between_retries_secs),
        ))
}

/// Everything the scenario talks to
#[derive(Clone, Copy)]
pub struct ScenarioClients<'a> {
    pub terraform: &'a dyn Terraform,
    pub ecs: &'a dyn EcsApi,
    pub logs: &'a dyn LogsApi,
    pub autoscaling: &'a dyn AutoScalingApi,
}

/// Summary of a passing run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub test_name: String,
    pub region: String,
    pub cluster: ClusterSummary,
    pub task_definition: String,
    pub task_arns: Vec<String>,
    pub container_instances: usize,
    pub log_message: String,
    pub stale_autoscaling_group: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub cleanup_completed: Vec<String>,
    pub cleanup_ignored: Vec<String>,
    pub destroyed: bool,
}

pub struct SimpleClusterScenario<'a> {
    clients: ScenarioClients<'a>,
    settings: ScenarioSettings,
}

impl<'a> SimpleClusterScenario<'a> {
    pub fn new(clients: ScenarioClients<'a>, settings: ScenarioSettings) -> Self {
        Self { clients, settings }
    }

    pub fn settings(&self) -> &ScenarioSettings {
        &self.settings
    }

    /// Run the scenario and its teardown
    ///
    /// A failure in the body is returned even when teardown also fails; the
    /// teardown failure is logged. A teardown failure after a passing body
    /// fails the run.
    pub async fn run(&self) -> Result<ScenarioReport> {
        let mut teardown = if self.settings.skip_destroy {
            Teardown::disabled()
        } else {
            Teardown::new()
        };

        let terraform = self.clients.terraform;
        teardown.defer("terraform destroy", CleanupMode::Required, async move {
            terraform.destroy().await
        });

        let outcome = self.run_body(&mut teardown).await;
        let cleanup = teardown.run().await;

        match outcome {
            Ok(mut report) => {
                let completed = cleanup.completed.clone();
                let ignored = cleanup
                    .ignored
                    .iter()
                    .map(|(step, err)| format!("{}: {}", step, err))
                    .collect();
                cleanup.into_result()?;
                report.destroyed = completed.iter().any(|s| s == "terraform destroy");
                report.cleanup_completed = completed;
                report.cleanup_ignored = ignored;
                Ok(report)
            }
            Err(e) => {
                log_cleanup_after_failure(&cleanup);
                Err(e)
            }
        }
    }

    async fn run_body(&self, teardown: &mut Teardown<'a>) -> Result<ScenarioReport> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let terraform = self.clients.terraform;
        let test_name = &self.settings.test_name;

        info!(
            "Running simple cluster scenario {} in {}",
            test_name, self.settings.region
        );

        terraform.init().await?;
        // Pick up changes made outside terraform since the last run
        terraform.refresh().await?;

        let stale_autoscaling_group = self.delete_stale_autoscaling_group().await?;

        terraform.apply().await?;

        let cluster_arn = terraform.output(outputs::ECS_CLUSTER_ARN).await?;
        let cluster_name = terraform.output(outputs::ECS_CLUSTER_NAME).await?;

        let cluster = self.check_cluster_active(&cluster_arn, &cluster_name).await?;

        let message = log_message(test_name);
        let log_group = terraform.output(outputs::CLOUDWATCH_LOG_GROUP_NAME).await?;
        let roles = TaskRoles {
            execution_role_arn: terraform.output(outputs::ECS_TASK_EXECUTION_ROLE_ARN).await?,
            task_role_arn: terraform.output(outputs::ECS_TASK_ROLE_ARN).await?,
        };

        info!("Registering ECS task definition");
        let spec = TaskDefinitionSpec::echo(
            test_name.as_str(),
            &message,
            &log_group,
            &self.settings.region,
            roles,
            self.settings.tags.clone(),
        );
        let task_definition = self.clients.ecs.register_task_definition(&spec).await?;

        let ecs = self.clients.ecs;
        let to_deregister = task_definition.clone();
        teardown.defer(
            format!("deregister task definition {}", task_definition),
            CleanupMode::BestEffort,
            async move { ecs.deregister_task_definition(&to_deregister).await },
        );

        let container_instances = self.wait_for_hydration(&cluster_name).await?;
        let task_arns = self.run_task(&cluster_name, &task_definition).await?;
        let first_message = self.wait_for_first_log_event(&log_group).await?;

        if first_message != message {
            return Err(EcsTestError::assertion(
                format!("first log event in {}", log_group),
                message,
                first_message,
            ));
        }
        info!("Found expected log message in {}", log_group);

        Ok(ScenarioReport {
            test_name: test_name.to_string(),
            region: self.settings.region.clone(),
            cluster,
            task_definition: task_definition.to_string(),
            task_arns,
            container_instances,
            log_message: message,
            stale_autoscaling_group,
            started_at,
            duration_secs: timer.elapsed().as_secs_f64(),
            cleanup_completed: Vec::new(),
            cleanup_ignored: Vec::new(),
            destroyed: false,
        })
    }

    /// Work around terraform-provider-aws#5278: an Auto Scaling group left
    /// over from a previous run blocks apply, so delete it by hand first.
    async fn delete_stale_autoscaling_group(&self) -> Result<Option<String>> {
        let name = match self
            .clients
            .terraform
            .output_optional(outputs::AUTOSCALING_GROUP_NAME)
            .await
        {
            Ok(Some(name)) if !name.is_empty() && name != "<nil>" => name,
            Ok(_) => return Ok(None),
            Err(e) => {
                warn!("Could not read {} output: {}", outputs::AUTOSCALING_GROUP_NAME, e);
                return Ok(None);
            }
        };

        info!("Deleting EC2 Auto Scaling group {:?}", name);
        match self.clients.autoscaling.force_delete_group(&name).await {
            Ok(()) => Ok(Some(name)),
            Err(e) if self.settings.profile.strict_stale_asg_cleanup => Err(e),
            Err(e) => {
                warn!("Ignoring failure to delete Auto Scaling group {}: {}", name, e);
                Ok(None)
            }
        }
    }

    async fn check_cluster_active(
        &self,
        cluster_arn: &str,
        cluster_name: &str,
    ) -> Result<ClusterSummary> {
        info!("Describing ECS Cluster {:?}", cluster_name);
        let cluster = self.clients.ecs.describe_cluster(cluster_arn).await?;

        if !cluster.is_active() {
            return Err(EcsTestError::assertion(
                format!("status of cluster {}", cluster_name),
                crate::aws::types::CLUSTER_STATUS_ACTIVE,
                cluster.status,
            ));
        }
        Ok(cluster)
    }

    /// Wait for an EC2-backed container instance to join the cluster
    async fn wait_for_hydration(&self, cluster_name: &str) -> Result<usize> {
        info!("Waiting for ECS cluster to hydrate");
        let ecs = self.clients.ecs;
        poll_until(
            &self.settings.profile.hydration,
            "Waiting for ECS cluster to hydrate",
            || async move {
                let arns = ecs.list_active_container_instances(cluster_name).await?;
                Ok::<_, EcsTestError>((!arns.is_empty()).then_some(arns.len()))
            },
        )
        .await
    }

    async fn run_task(
        &self,
        cluster_name: &str,
        task_definition: &TaskDefinitionRef,
    ) -> Result<Vec<String>> {
        info!("Running ECS task");
        let outcome = self
            .clients
            .ecs
            .run_task(cluster_name, task_definition)
            .await?;

        if !outcome.failures.is_empty() {
            let failures: Vec<String> = outcome.failures.iter().map(|f| f.to_string()).collect();
            return Err(EcsTestError::assertion(
                format!("run task failures for {}", task_definition),
                "no failures",
                failures.join("; "),
            ));
        }
        Ok(outcome.task_arns)
    }

    async fn wait_for_first_log_event(&self, log_group: &str) -> Result<String> {
        info!("Waiting for log messages to be saved");
        let logs = self.clients.logs;
        poll_until(
            &self.settings.profile.logs,
            "Waiting for log messages to be saved",
            || async move {
                let messages = logs.filter_log_events(log_group).await?;
                Ok::<_, EcsTestError>(messages.into_iter().next())
            },
        )
        .await
    }
}

fn log_cleanup_after_failure(cleanup: &CleanupReport) {
    for (step, err) in &cleanup.errors {
        warn!("Cleanup step {} also failed: {}", step, err);
    }
}

/// Resolve settings, build the real terraform and AWS clients, and run
pub async fn run_from_env(config: &Config, env: &RunEnv) -> Result<ScenarioReport> {
    let settings = ScenarioSettings::generate(config, env);
    let terraform = TerraformCli::new(terraform_options(config, &settings)?)?;
    let aws = AwsClients::for_region(&settings.region).await;

    let scenario = SimpleClusterScenario::new(
        ScenarioClients {
            terraform: &terraform,
            ecs: &aws.ecs,
            logs: &aws.logs,
            autoscaling: &aws.autoscaling,
        },
        settings,
    );
    scenario.run().await
}
