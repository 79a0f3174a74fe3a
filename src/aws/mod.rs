//! AWS service seams
//!
//! The scenario only needs a handful of calls across three services. Each
//! service gets a small trait (`EcsApi`, `LogsApi`, `AutoScalingApi`) with an
//! SDK-backed implementation; tests substitute fakes or mocks.
//!
//! All clients are built from one SDK config pinned to the region under
//! test, so a stray `AWS_REGION` in the caller's shell cannot send half the
//! calls somewhere else.

mod autoscaling;
mod ecs;
mod logs;
pub mod types;

pub use autoscaling::{AutoScalingApi, SdkAutoScaling};
pub use ecs::{EcsApi, SdkEcs};
pub use logs::{LogsApi, SdkLogs};

#[cfg(test)]
pub use autoscaling::MockAutoScalingApi;
#[cfg(test)]
pub use ecs::MockEcsApi;
#[cfg(test)]
pub use logs::MockLogsApi;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::debug;

/// Load the shared SDK config for `region`
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    debug!("Loading AWS SDK config for region {}", region);
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// SDK-backed clients for every service the scenario calls
#[derive(Debug, Clone)]
pub struct AwsClients {
    pub ecs: SdkEcs,
    pub logs: SdkLogs,
    pub autoscaling: SdkAutoScaling,
}

impl AwsClients {
    pub async fn for_region(region: &str) -> Self {
        let config = load_sdk_config(region).await;
        Self::from_config(&config)
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self {
            ecs: SdkEcs::new(aws_sdk_ecs::Client::new(config)),
            logs: SdkLogs::new(aws_sdk_cloudwatchlogs::Client::new(config)),
            autoscaling: SdkAutoScaling::new(aws_sdk_autoscaling::Client::new(config)),
        }
    }
}
