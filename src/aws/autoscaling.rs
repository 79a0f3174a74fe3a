//! EC2 Auto Scaling calls

use crate::error::{EcsTestError, Result};
use async_trait::async_trait;
use aws_sdk_autoscaling::error::DisplayErrorContext;
use aws_sdk_autoscaling::Client as AutoScalingClient;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AutoScalingApi: Send + Sync {
    /// Delete a group and terminate its instances without waiting for them
    async fn force_delete_group(&self, name: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SdkAutoScaling {
    client: AutoScalingClient,
}

impl SdkAutoScaling {
    pub fn new(client: AutoScalingClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AutoScalingApi for SdkAutoScaling {
    async fn force_delete_group(&self, name: &str) -> Result<()> {
        self.client
            .delete_auto_scaling_group()
            .auto_scaling_group_name(name)
            .force_delete(true)
            .send()
            .await
            .map_err(|e| {
                EcsTestError::AutoScaling(format!(
                    "Failed to delete Auto Scaling group {}: {}",
                    name,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}
