use crate::error::{ConfigError, EcsTestError, Result};
use crate::naming::{DEFAULT_NAME_PREFIX, DEFAULT_TEST_LABEL};
use crate::poll::PollSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Region every client and the terraform process run against
pub const ENV_REGION: &str = "AWS_DEFAULT_REGION";
/// `1` leaves infrastructure and the task definition in place
pub const ENV_SKIP_DESTROY: &str = "TT_SKIP_DESTROY";
/// Overrides `fixture.dir`
pub const ENV_FIXTURE_DIR: &str = "TT_FIXTURE_DIR";

const CONFIG_FILE_NAME: &str = ".ecs-terratest.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fixture: FixtureConfig,
    pub terraform: TerraformConfig,
    pub polling: PollingConfig,
    pub scenario: ScenarioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Terraform configuration to provision (`~` is expanded)
    pub dir: PathBuf,
    pub name_prefix: String,
    /// Value of the `Test` tag
    pub test_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformConfig {
    pub binary: String,
    pub max_retries: u32,
    pub time_between_retries_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub hydration: PollConfig,
    pub logs: PollConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Fail the run when deleting a stale Auto Scaling group fails
    pub strict_stale_asg_cleanup: bool,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("fixtures/simple"),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            test_label: DEFAULT_TEST_LABEL.to_string(),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            strict_stale_asg_cleanup: true,
        }
    }
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            binary: "terraform".to_string(),
            max_retries: 3,
            time_between_retries_secs: 5,
        }
    }
}

/// Stock cluster hydration timing; a partial `[polling.*]` table fills in
/// from here
impl Default for PollConfig {
    fn default() -> Self {
        let hydration = PollSpec::cluster_hydration();
        Self {
            interval_secs: hydration.interval.as_secs(),
            max_attempts: hydration.max_attempts,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        let hydration = PollSpec::cluster_hydration();
        let logs = PollSpec::log_delivery();
        Self {
            hydration: PollConfig {
                interval_secs: hydration.interval.as_secs(),
                max_attempts: hydration.max_attempts,
            },
            logs: PollConfig {
                interval_secs: logs.interval.as_secs(),
                max_attempts: logs.max_attempts,
            },
        }
    }
}

impl PollingConfig {
    /// Hydration poll; keeps the stock timeout message only when the stock
    /// timing is kept
    pub fn hydration_spec(&self) -> PollSpec {
        to_spec(&self.hydration, PollSpec::cluster_hydration(), "ECS Cluster had no instances")
    }

    pub fn log_spec(&self) -> PollSpec {
        to_spec(&self.logs, PollSpec::log_delivery(), "ECS task had no logs")
    }
}

fn to_spec(poll: &PollConfig, stock: PollSpec, subject: &str) -> PollSpec {
    let interval = Duration::from_secs(poll.interval_secs);
    if interval == stock.interval && poll.max_attempts == stock.max_attempts {
        return stock;
    }
    let waited = interval
        .checked_mul(poll.max_attempts.saturating_sub(1))
        .unwrap_or(Duration::MAX);
    PollSpec::new(
        interval,
        poll.max_attempts,
        format!("{} after {} seconds", subject, waited.as_secs()),
    )
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .ecs-terratest.toml in current dir, then ~/.config/ecs-terratest/config.toml
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("ecs-terratest").join("config.toml"))
                    .unwrap_or(local)
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content).map_err(|e| {
                ConfigError::ParseError(format!("{}: {}", config_path.display(), e))
            })?;
            Ok(config)
        } else {
            if path.is_some() {
                warn!(
                    "Config file not found: {}, using defaults",
                    config_path.display()
                );
            }
            Ok(Config::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ConfigError::ParseError(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fixture directory with `~` and `$VARS` expanded
    pub fn fixture_dir(&self) -> Result<PathBuf> {
        let raw = self.fixture.dir.to_string_lossy();
        let expanded = shellexpand::full(&raw).map_err(|e| ConfigError::InvalidValue {
            field: "fixture.dir".to_string(),
            reason: e.to_string(),
        })?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    /// Apply the environment on top of file values
    pub fn apply_env(&mut self, env: &RunEnv) {
        if let Some(dir) = &env.fixture_dir {
            self.fixture.dir = dir.clone();
        }
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    Config::default().save(output)
}

/// Settings that only ever come from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEnv {
    pub region: String,
    pub skip_destroy: bool,
    pub fixture_dir: Option<PathBuf>,
}

impl RunEnv {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary lookup; an empty region counts as missing
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = lookup(ENV_REGION)
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| EcsTestError::Config(ConfigError::MissingEnv(ENV_REGION.to_string())))?;

        Ok(Self {
            region,
            skip_destroy: lookup(ENV_SKIP_DESTROY).as_deref() == Some("1"),
            fixture_dir: lookup(ENV_FIXTURE_DIR)
                .filter(|d| !d.is_empty())
                .map(PathBuf::from),
        })
    }
}
