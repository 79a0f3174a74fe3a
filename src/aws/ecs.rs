//! ECS calls: clusters, task definitions, container instances, tasks

use crate::error::{EcsTestError, Result};
use async_trait::async_trait;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{
    Compatibility, ContainerDefinition, ContainerInstanceStatus, LaunchType, LogConfiguration,
    LogDriver, NetworkMode, PropagateTags, Tag,
};
use aws_sdk_ecs::Client as EcsClient;
use tracing::{debug, info};

use super::types::{
    ClusterSummary, RunTaskOutcome, TaskDefinitionRef, TaskDefinitionSpec, TaskFailure,
};

/// The ECS operations the scenario needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EcsApi: Send + Sync {
    /// Describe exactly one cluster by ARN or name
    async fn describe_cluster(&self, cluster: &str) -> Result<ClusterSummary>;

    async fn register_task_definition(&self, spec: &TaskDefinitionSpec)
        -> Result<TaskDefinitionRef>;

    async fn deregister_task_definition(&self, task_definition: &TaskDefinitionRef)
        -> Result<()>;

    /// ARNs of the cluster's container instances in ACTIVE status
    async fn list_active_container_instances(&self, cluster: &str) -> Result<Vec<String>>;

    /// Run one copy of the task definition on EC2 capacity
    async fn run_task(
        &self,
        cluster: &str,
        task_definition: &TaskDefinitionRef,
    ) -> Result<RunTaskOutcome>;
}

/// ECS via the AWS SDK
#[derive(Debug, Clone)]
pub struct SdkEcs {
    client: EcsClient,
}

impl SdkEcs {
    pub fn new(client: EcsClient) -> Self {
        Self { client }
    }
}

fn container_definition(spec: &TaskDefinitionSpec) -> Result<ContainerDefinition> {
    let mut log_configuration = LogConfiguration::builder().log_driver(LogDriver::Awslogs);
    for (key, value) in spec.logs.options() {
        log_configuration = log_configuration.options(key, value);
    }
    let log_configuration = log_configuration
        .build()
        .map_err(|e| EcsTestError::Ecs(format!("Invalid log configuration: {}", e)))?;

    Ok(ContainerDefinition::builder()
        .name(&spec.container_name)
        .image(&spec.image)
        .set_entry_point(Some(spec.entry_point.clone()))
        .set_command(Some(Vec::new()))
        .cpu(spec.cpu)
        .memory(spec.memory)
        .essential(true)
        .readonly_root_filesystem(spec.readonly_root_filesystem)
        .stop_timeout(spec.stop_timeout)
        .log_configuration(log_configuration)
        .build())
}

#[async_trait]
impl EcsApi for SdkEcs {
    async fn describe_cluster(&self, cluster: &str) -> Result<ClusterSummary> {
        let response = self
            .client
            .describe_clusters()
            .clusters(cluster)
            .send()
            .await
            .map_err(|e| {
                EcsTestError::Ecs(format!(
                    "Failed to describe cluster {}: {}",
                    cluster,
                    DisplayErrorContext(&e)
                ))
            })?;

        let clusters = response.clusters();
        if clusters.len() != 1 {
            return Err(EcsTestError::assertion(
                format!("number of clusters described for {}", cluster),
                "1",
                clusters.len().to_string(),
            ));
        }

        let found = &clusters[0];
        Ok(ClusterSummary {
            arn: found.cluster_arn().unwrap_or_default().to_string(),
            name: found.cluster_name().unwrap_or_default().to_string(),
            status: found.status().unwrap_or_default().to_string(),
        })
    }

    async fn register_task_definition(
        &self,
        spec: &TaskDefinitionSpec,
    ) -> Result<TaskDefinitionRef> {
        let tags: Vec<Tag> = spec
            .tags
            .iter()
            .map(|(k, v)| Tag::builder().key(k).value(v).build())
            .collect();

        let response = self
            .client
            .register_task_definition()
            .family(&spec.family)
            .container_definitions(container_definition(spec)?)
            .execution_role_arn(&spec.execution_role_arn)
            .task_role_arn(&spec.task_role_arn)
            .network_mode(NetworkMode::Bridge)
            .requires_compatibilities(Compatibility::Ec2)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| {
                EcsTestError::Ecs(format!(
                    "Failed to register task definition {}: {}",
                    spec.family,
                    DisplayErrorContext(&e)
                ))
            })?;

        let registered = response
            .task_definition()
            .ok_or_else(|| EcsTestError::Ecs("No task definition in response".to_string()))?;

        let task_definition = TaskDefinitionRef {
            family: registered.family().unwrap_or(&spec.family).to_string(),
            revision: registered.revision(),
        };
        info!("Registered task definition {}", task_definition);
        Ok(task_definition)
    }

    async fn deregister_task_definition(
        &self,
        task_definition: &TaskDefinitionRef,
    ) -> Result<()> {
        self.client
            .deregister_task_definition()
            .task_definition(task_definition.to_string())
            .send()
            .await
            .map_err(|e| {
                EcsTestError::Ecs(format!(
                    "Failed to deregister task definition {}: {}",
                    task_definition,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn list_active_container_instances(&self, cluster: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .list_container_instances()
            .cluster(cluster)
            .status(ContainerInstanceStatus::Active)
            .send()
            .await
            .map_err(|e| {
                EcsTestError::Ecs(format!(
                    "Failed to list container instances in {}: {}",
                    cluster,
                    DisplayErrorContext(&e)
                ))
            })?;

        let arns = response.container_instance_arns().to_vec();
        debug!("{} active container instances in {}", arns.len(), cluster);
        Ok(arns)
    }

    async fn run_task(
        &self,
        cluster: &str,
        task_definition: &TaskDefinitionRef,
    ) -> Result<RunTaskOutcome> {
        let response = self
            .client
            .run_task()
            .cluster(cluster)
            .count(1)
            .launch_type(LaunchType::Ec2)
            .propagate_tags(PropagateTags::TaskDefinition)
            .task_definition(task_definition.to_string())
            .send()
            .await
            .map_err(|e| {
                EcsTestError::Ecs(format!(
                    "Failed to run task {} in {}: {}",
                    task_definition,
                    cluster,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(RunTaskOutcome {
            task_arns: response
                .tasks()
                .iter()
                .filter_map(|t| t.task_arn().map(str::to_string))
                .collect(),
            failures: response
                .failures()
                .iter()
                .map(|f| TaskFailure {
                    arn: f.arn().map(str::to_string),
                    reason: f.reason().map(str::to_string),
                    detail: f.detail().map(str::to_string),
                })
                .collect(),
        })
    }
}
