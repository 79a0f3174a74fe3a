//! Provider-agnostic views of the ECS objects the scenario touches
//!
//! The SDK types carry far more than we look at; these hold just the fields
//! the checks read, which also keeps fakes in tests small.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Status string ECS reports for a usable cluster
pub const CLUSTER_STATUS_ACTIVE: &str = "ACTIVE";

/// One cluster from DescribeClusters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub arn: String,
    pub name: String,
    pub status: String,
}

impl ClusterSummary {
    pub fn is_active(&self) -> bool {
        self.status == CLUSTER_STATUS_ACTIVE
    }
}

/// A registered task definition revision, rendered as `family:revision`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TaskDefinitionRef {
    pub family: String,
    pub revision: i32,
}

impl fmt::Display for TaskDefinitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.revision)
    }
}

/// awslogs driver settings for a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsLogsConfig {
    pub group: String,
    pub region: String,
    pub stream_prefix: String,
}

impl AwsLogsConfig {
    /// Driver options as ECS expects them
    pub fn options(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("awslogs-group".to_string(), self.group.clone()),
            ("awslogs-region".to_string(), self.region.clone()),
            (
                "awslogs-stream-prefix".to_string(),
                self.stream_prefix.clone(),
            ),
        ])
    }
}

/// Single-container, EC2-compatible task definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinitionSpec {
    pub family: String,
    pub container_name: String,
    pub image: String,
    pub entry_point: Vec<String>,
    pub cpu: i32,
    pub memory: i32,
    pub readonly_root_filesystem: bool,
    pub stop_timeout: i32,
    pub logs: AwsLogsConfig,
    pub execution_role_arn: String,
    pub task_role_arn: String,
    pub tags: Vec<(String, String)>,
}

/// IAM roles the fixture creates for tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRoles {
    pub execution_role_arn: String,
    pub task_role_arn: String,
}

impl TaskDefinitionSpec {
    /// A `debian:latest` container whose only job is to echo `message`
    /// into the given log group and exit
    pub fn echo(
        test_name: &str,
        message: &str,
        log_group: &str,
        region: &str,
        roles: TaskRoles,
        tags: Vec<(String, String)>,
    ) -> Self {
        Self {
            family: test_name.to_string(),
            container_name: test_name.to_string(),
            image: "debian:latest".to_string(),
            entry_point: vec!["/bin/echo".to_string(), message.to_string()],
            cpu: 128,
            memory: 128,
            readonly_root_filesystem: true,
            stop_timeout: 5,
            logs: AwsLogsConfig {
                group: log_group.to_string(),
                region: region.to_string(),
                stream_prefix: test_name.to_string(),
            },
            execution_role_arn: roles.execution_role_arn,
            task_role_arn: roles.task_role_arn,
            tags,
        }
    }
}

/// A task ECS could not place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub arn: Option<String>,
    pub reason: Option<String>,
    pub detail: Option<String>,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.reason.as_deref().unwrap_or("unknown reason"),
            self.arn.as_deref().unwrap_or("no arn")
        )?;
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

/// Result of RunTask
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTaskOutcome {
    pub task_arns: Vec<String>,
    pub failures: Vec<TaskFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_definition_ref_display() {
        let r = TaskDefinitionRef {
            family: "terratest-ecs-cluster-simple-abc123".to_string(),
            revision: 3,
        };
        assert_eq!(r.to_string(), "terratest-ecs-cluster-simple-abc123:3");
    }

    #[test]
    fn test_echo_spec() {
        let spec = TaskDefinitionSpec::echo(
            "tn",
            "test message for tn",
            "/ecs/tn",
            "us-west-2",
            TaskRoles {
                execution_role_arn: "arn:exec".to_string(),
                task_role_arn: "arn:task".to_string(),
            },
            vec![("Terratest".to_string(), "yes".to_string())],
        );
        assert_eq!(spec.family, "tn");
        assert_eq!(spec.entry_point, vec!["/bin/echo", "test message for tn"]);
        assert_eq!(spec.cpu, 128);
        assert_eq!(spec.memory, 128);
        assert_eq!(spec.stop_timeout, 5);
        assert!(spec.readonly_root_filesystem);
        let options = spec.logs.options();
        assert_eq!(options["awslogs-group"], "/ecs/tn");
        assert_eq!(options["awslogs-region"], "us-west-2");
        assert_eq!(options["awslogs-stream-prefix"], "tn");
    }

    #[test]
    fn test_cluster_is_active() {
        let mut cluster = ClusterSummary {
            arn: "arn".to_string(),
            name: "c".to_string(),
            status: "ACTIVE".to_string(),
        };
        assert!(cluster.is_active());
        cluster.status = "INACTIVE".to_string();
        assert!(!cluster.is_active());
    }
}
