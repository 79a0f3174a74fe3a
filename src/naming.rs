//! Unique test names, tags, and the probe message
//!
//! Every run gets its own name so parallel runs never collide on AWS
//! resource names or task definition families. Re-running against an
//! existing state directory simply overrides the previous run's resources.

use std::fmt;

const BASE62: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const UNIQUE_ID_LEN: usize = 6;

/// Default prefix for generated test names
pub const DEFAULT_NAME_PREFIX: &str = "terratest-ecs-cluster-simple";

/// Default value of the `Test` tag
pub const DEFAULT_TEST_LABEL: &str = "TestTerraformSimpleExample";

/// Six random base-62 characters
pub fn unique_id() -> String {
    (0..UNIQUE_ID_LEN)
        .map(|_| BASE62[fastrand::usize(..BASE62.len())] as char)
        .collect()
}

/// A generated, collision-resistant test name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestName(String);

impl TestName {
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}-{}", prefix, unique_id().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TestName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Tags applied to the fixture and the registered task definition
pub fn default_tags(test_label: &str) -> Vec<(String, String)> {
    vec![
        ("Automation".to_string(), "Terraform".to_string()),
        ("Terratest".to_string(), "yes".to_string()),
        ("Test".to_string(), test_label.to_string()),
    ]
}

/// The line the probe container echoes into CloudWatch Logs
pub fn log_message(test_name: &TestName) -> String {
    format!("test message for {}", test_name)
}
