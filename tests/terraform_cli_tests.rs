//! Tests for the process-backed terraform driver
//!
//! A shell script stands in for the terraform binary. It records its
//! arguments and environment, and answers `output` from files in the fixture
//! directory.

#![cfg(unix)]

use ecs_terratest::error::{ConfigError, EcsTestError};
use ecs_terratest::terraform::{Terraform, TerraformCli, TerraformOptions};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

const FAKE_TERRAFORM: &str = r#"#!/bin/sh
echo "$@" >> calls.log
echo "region=$AWS_DEFAULT_REGION" >> env.log
case "$1" in
  output)
    if [ -f "outputs/$3" ]; then
      cat "outputs/$3"
    else
      echo "Error: Output \"$3\" not found" >&2
      exit 1
    fi
    ;;
  init)
    if [ -f flaky_init ] && [ ! -f flaky_init.done ]; then
      touch flaky_init.done
      echo "Error: Failed to query available provider packages" >&2
      exit 1
    fi
    ;;
  apply)
    if [ -f broken_apply ]; then
      echo "Error: Reference to undeclared resource" >&2
      exit 1
    fi
    ;;
esac
exit 0
"#;

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    binary: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("fixture");
        fs::create_dir_all(root.join("outputs")).unwrap();

        let binary = dir.path().join("fake-terraform");
        fs::write(&binary, FAKE_TERRAFORM).unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();

        Self {
            _dir: dir,
            root,
            binary,
        }
    }

    fn options(&self) -> TerraformOptions {
        TerraformOptions::new(&self.root)
            .binary(self.binary.to_string_lossy())
            .var("test_name", "tn")
            .env("AWS_DEFAULT_REGION", "eu-west-1")
            .with_retries(2, Duration::from_millis(1))
            .with_default_retryable_errors()
    }

    fn cli(&self) -> TerraformCli {
        TerraformCli::new(self.options()).unwrap()
    }

    fn write_output(&self, name: &str, json: &str) {
        fs::write(self.root.join("outputs").join(name), json).unwrap();
    }

    fn touch(&self, name: &str) {
        fs::write(self.root.join(name), "").unwrap();
    }

    fn calls(&self) -> Vec<String> {
        read_lines(&self.root.join("calls.log"))
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_lifecycle_commands_and_environment() {
    let fixture = Fixture::new();
    let cli = fixture.cli();

    cli.init().await.unwrap();
    cli.refresh().await.unwrap();
    cli.apply().await.unwrap();
    cli.destroy().await.unwrap();

    assert_eq!(
        fixture.calls(),
        vec![
            "init -upgrade=false -no-color",
            "refresh -input=false -lock=false -no-color -var test_name=tn",
            "apply -input=false -auto-approve -no-color -var test_name=tn",
            "destroy -auto-approve -input=false -no-color -var test_name=tn",
        ]
    );
    assert!(read_lines(&fixture.root.join("env.log"))
        .iter()
        .all(|l| l == "region=eu-west-1"));
}

#[tokio::test]
async fn test_outputs() {
    let fixture = Fixture::new();
    fixture.write_output("ecs_cluster_name", "\"terratest-ecs-cluster-simple-abc123\"\n");
    fixture.write_output("autoscaling_group_name", "null\n");
    let cli = fixture.cli();

    assert_eq!(
        cli.output("ecs_cluster_name").await.unwrap(),
        "terratest-ecs-cluster-simple-abc123"
    );
    assert_eq!(cli.output_optional("autoscaling_group_name").await.unwrap(), None);
    assert_eq!(cli.output_optional("never_declared").await.unwrap(), None);

    let err = cli.output("ecs_cluster_arn").await.unwrap_err();
    assert!(matches!(err, EcsTestError::MissingOutput { ref name } if name == "ecs_cluster_arn"));
}

#[tokio::test]
async fn test_transient_init_failure_is_retried() {
    let fixture = Fixture::new();
    fixture.touch("flaky_init");

    fixture.cli().init().await.unwrap();
    assert_eq!(fixture.calls().len(), 2);
}

#[tokio::test]
async fn test_non_retryable_failure_surfaces_output() {
    let fixture = Fixture::new();
    fixture.touch("broken_apply");

    let err = fixture.cli().apply().await.unwrap_err();
    match err {
        EcsTestError::Terraform {
            command,
            exit_code,
            output,
            retryable,
        } => {
            assert_eq!(command, "apply");
            assert_eq!(exit_code, Some(1));
            assert!(output.contains("undeclared resource"));
            assert!(!retryable);
        }
        other => panic!("expected Terraform error, got {:?}", other),
    }
    assert_eq!(fixture.calls().len(), 1);
}

#[test]
fn test_missing_fixture_dir() {
    let fixture = Fixture::new();
    let mut options = fixture.options();
    options.terraform_dir = fixture.root.join("does-not-exist");

    let err = TerraformCli::new(options).unwrap_err();
    assert!(matches!(
        err,
        EcsTestError::Config(ConfigError::FixtureNotFound(_))
    ));
}
