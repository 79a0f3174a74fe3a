//! CloudWatch Logs calls

use crate::error::{EcsTestError, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use aws_sdk_cloudwatchlogs::Client as LogsClient;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogsApi: Send + Sync {
    /// Messages of the events in a log group, in the order the API returns
    /// them (first page only)
    async fn filter_log_events(&self, log_group: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct SdkLogs {
    client: LogsClient,
}

impl SdkLogs {
    pub fn new(client: LogsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogsApi for SdkLogs {
    async fn filter_log_events(&self, log_group: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .filter_log_events()
            .log_group_name(log_group)
            .send()
            .await
            .map_err(|e| {
                EcsTestError::Logs(format!(
                    "Failed to filter log events in {}: {}",
                    log_group,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(response
            .events()
            .iter()
            .map(|event| event.message().unwrap_or_default().to_string())
            .collect())
    }
}
