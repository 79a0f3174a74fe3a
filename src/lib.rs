//! ecs-terratest library
//!
//! Provisions an ECS cluster fixture with terraform and verifies it end to
//! end through the AWS SDK: the cluster is ACTIVE, an EC2 container instance
//! joins it, a task runs on it, and the task's output reaches CloudWatch
//! Logs. Infrastructure is torn down afterwards unless `TT_SKIP_DESTROY=1`.

pub mod aws;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod naming;
pub mod poll;
pub mod retry;
pub mod scenario;
pub mod terraform;

// Re-export commonly used types
pub use error::{EcsTestError, Result};
pub use scenario::{ScenarioReport, SimpleClusterScenario};
