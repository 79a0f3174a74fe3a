use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;
use ecs_terratest::config::{init_config, Config, RunEnv};
use ecs_terratest::exit_codes::exit_code_for_anyhow;
use ecs_terratest::naming::TestName;
use ecs_terratest::scenario::{run_from_env, ScenarioReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ecs-terratest")]
#[command(
    about = "Provision an ECS cluster fixture with terraform and verify it end to end",
    long_about = "ecs-terratest applies a terraform fixture that creates an EC2-backed ECS cluster, then checks it through the AWS SDK:\n\n  - the cluster is ACTIVE\n  - a container instance joins it\n  - a task can be placed on it\n  - the task's output reaches CloudWatch Logs\n\nRequires AWS_DEFAULT_REGION. Set TT_SKIP_DESTROY=1 to keep the infrastructure afterwards."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the fixture, verify the cluster, and tear it down
    Run {
        /// Terraform fixture directory (overrides config and TT_FIXTURE_DIR)
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Leave infrastructure in place (same as TT_SKIP_DESTROY=1)
        #[arg(long)]
        skip_destroy: bool,
        /// Value for the `Test` tag
        #[arg(long)]
        label: Option<String>,
    },
    /// Print a freshly generated test name
    Name {
        /// Name prefix (default from config)
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Write a default configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = ".ecs-terratest.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("error:").red().bold(), e);
        std::process::exit(exit_code_for_anyhow(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            fixture,
            skip_destroy,
            label,
        } => {
            let mut env = RunEnv::from_env()?;
            config.apply_env(&env);
            if let Some(fixture) = fixture {
                config.fixture.dir = fixture;
            }
            if let Some(label) = label {
                config.fixture.test_label = label;
            }
            env.skip_destroy |= skip_destroy;

            let report = run_from_env(&config, &env).await?;
            print_report(&report, cli.output)?;
        }
        Commands::Name { prefix } => {
            let prefix = prefix.unwrap_or(config.fixture.name_prefix);
            println!("{}", TestName::generate(&prefix));
        }
        Commands::Init { output } => {
            init_config(&output)
                .with_context(|| format!("Failed to write config: {}", output.display()))?;
            println!("Created config file: {}", output.display());
        }
    }

    Ok(())
}

fn print_report(report: &ScenarioReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![Cell::new("Check"), Cell::new("Result")]);
    table.add_row(vec![Cell::new("Test name"), Cell::new(&report.test_name)]);
    table.add_row(vec![Cell::new("Region"), Cell::new(&report.region)]);
    table.add_row(vec![
        Cell::new("Cluster"),
        Cell::new(format!("{} ({})", report.cluster.name, report.cluster.status)),
    ]);
    table.add_row(vec![
        Cell::new("Container instances"),
        Cell::new(report.container_instances),
    ]);
    table.add_row(vec![
        Cell::new("Task definition"),
        Cell::new(&report.task_definition),
    ]);
    table.add_row(vec![Cell::new("Log message"), Cell::new(&report.log_message)]);
    if let Some(asg) = &report.stale_autoscaling_group {
        table.add_row(vec![Cell::new("Deleted stale ASG"), Cell::new(asg)]);
    }
    table.add_row(vec![
        Cell::new("Destroyed"),
        Cell::new(if report.destroyed { "yes" } else { "no (skipped)" }),
    ]);
    table.add_row(vec![
        Cell::new("Duration"),
        Cell::new(format!("{:.0}s", report.duration_secs)),
    ]);

    println!("{}", table);
    for ignored in &report.cleanup_ignored {
        println!("{} {}", style("ignored cleanup failure:").yellow(), ignored);
    }
    println!("{}", style("PASS").green().bold());
    Ok(())
}
