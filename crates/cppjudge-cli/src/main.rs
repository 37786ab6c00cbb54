//! cppjudge CLI
//!
//! Grades C++ submissions against JSON test suites in IOI isolate sandboxes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cppjudge::{
    Config, EXAMPLE_CONFIG, GradeError, Grader, IsolateSandbox, ResourceLimits, TestSuite,
    prepare_cgroup,
};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for infrastructure failures, distinct from a failed verdict
const EXIT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "cppjudge")]
#[command(about = "Grade C++ submissions against test suites in a sandbox")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LimitArgs {
    /// CPU time limit in seconds
    #[arg(short, long)]
    time_limit: Option<f64>,

    /// Memory limit in MiB
    #[arg(short, long)]
    memory_limit: Option<u64>,
}

impl LimitArgs {
    fn resolve(&self, defaults: ResourceLimits) -> Result<ResourceLimits> {
        let mut limits = defaults;
        if let Some(seconds) = self.time_limit {
            anyhow::ensure!(seconds > 0.0, "time limit must be positive");
            limits = limits.with_cpu_time(seconds);
        }
        if let Some(mib) = self.memory_limit {
            anyhow::ensure!(mib > 0, "memory limit must be positive");
            let bytes = mib
                .checked_mul(ResourceLimits::MIB)
                .context("memory limit is too large")?;
            limits = limits.with_memory_bytes(bytes);
        }
        Ok(limits)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "cppjudge.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Grade a source file against a test suite and print the verdict as JSON
    Grade {
        /// C++ source file
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// JSON suite of [input, expected_output] pairs
        #[arg(short, long)]
        suite: PathBuf,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Compile and run a source file once, printing its output
    Run {
        /// C++ source file
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Input file (default: empty input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Validate a test suite file without running anything
    CheckSuite {
        #[arg(value_name = "FILE")]
        suite: PathBuf,
    },

    /// List configured toolchain profiles
    Profiles,

    /// Show the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { ref output, force } => {
            init_config(output, force).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Grade {
            ref source,
            ref suite,
            ref limits,
        } => grade(load_config(config_path)?, source, suite, limits).await,
        Commands::Run {
            ref source,
            ref input,
            ref limits,
        } => run_once(load_config(config_path)?, source, input.as_deref(), limits).await,
        Commands::CheckSuite { ref suite } => {
            let suite = read_suite(suite).await?;
            println!("Suite is valid: {} test cases", suite.len());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Profiles => {
            list_profiles(&load_config(config_path)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::ShowConfig => {
            show_config(&load_config(config_path)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            info!(?path, "loading configuration");
            Config::from_file(path).context("failed to load configuration")?
        }
        None => {
            debug!("using default configuration");
            Config::default()
        }
    };

    if config.cgroup {
        match prepare_cgroup(&config.cg_root) {
            Ok(true) => debug!("cgroup hierarchy ready"),
            Ok(false) => {
                warn!(
                    "cgroup support unavailable (memory controller not found), falling back to RLIMIT_AS"
                );
                config.cgroup = false;
            }
            Err(e) => {
                warn!("cgroup setup failed: {e}, falling back to RLIMIT_AS memory limiting");
                config.cgroup = false;
            }
        }
    }

    Ok(config)
}

fn build_grader(config: &Config) -> Result<Grader> {
    let sandbox = IsolateSandbox::new(config.clone()).context("failed to set up sandbox")?;
    Ok(Grader::new(Arc::new(sandbox), config.grading.clone()))
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read source file '{}'", path.display()))
}

async fn read_suite(path: &Path) -> Result<TestSuite> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read suite file '{}'", path.display()))?;
    TestSuite::from_json(&json).with_context(|| format!("invalid suite '{}'", path.display()))
}

async fn grade(config: Config, source: &Path, suite: &Path, limits: &LimitArgs) -> Result<ExitCode> {
    let limits = limits.resolve(config.default_limits)?;
    let suite = read_suite(suite).await?;
    let grader = build_grader(&config)?;
    let submission = grader.submission(read_source(source).await?);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-c received, stopping after the current test case");
            on_interrupt.cancel();
        }
    });

    info!(cases = suite.len(), "grading submission");
    let verdict = match grader
        .evaluate_with_cancel(&submission, &suite, &limits, &cancel)
        .await
    {
        Ok(verdict) => verdict,
        Err(GradeError::Cancelled { completed }) => {
            anyhow::bail!("grading interrupted after {completed} test cases")
        }
        Err(e) => return Err(anyhow::Error::new(e).context("grading failed")),
    };

    println!("{}", serde_json::to_string_pretty(&verdict)?);

    Ok(if verdict.is_pass() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_once(
    config: Config,
    source: &Path,
    input: Option<&Path>,
    limits: &LimitArgs,
) -> Result<ExitCode> {
    let limits = limits.resolve(config.default_limits)?;
    let grader = build_grader(&config)?;
    let submission = grader.submission(read_source(source).await?);

    let stdin = match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .context("failed to read input file")?,
        None => String::new(),
    };

    info!("running program");
    let output = grader
        .run_code(&submission, &stdin, &limits)
        .await
        .context("execution failed")?;

    if !output.stdout.is_empty() {
        println!("{}", output.stdout);
    }
    if !output.stderr.is_empty() {
        eprintln!("{}", output.stderr);
    }

    // Logged to stderr so stdout stays clean for piping
    info!(exit_code = output.exit_code, "execution result");

    Ok(if output.exit_code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_profiles(config: &Config) {
    println!("Available profiles:\n");

    let mut profiles: Vec<_> = config.profiles.iter().collect();
    profiles.sort_by_key(|(id, _)| *id);

    for (id, profile) in profiles {
        let marker = if *id == config.grading.profile {
            " (grading)"
        } else {
            ""
        };
        println!("  {:<15} {}{}", id, profile.name, marker);
    }
}

fn show_config(config: &Config) {
    println!("Default resource limits:");
    println!(
        "  CPU time limit: {}s",
        config.default_limits.cpu_time_seconds
    );
    println!(
        "  Memory limit: {} KB",
        config.default_limits.memory_kb()
    );
    println!();
    println!("Grading:");
    println!("  Profile: {}", config.grading.profile);
    println!("  Command: {}", config.grading.command);
    println!("  Source file: {}", config.grading.source_name);
    println!();
    println!("Isolate binary: {}", config.isolate_binary().display());
    println!(
        "Box pool: ids {}..{}",
        config.box_pool.start_id,
        config.box_pool.start_id.saturating_add(config.box_pool.count)
    );
    println!("cgroup: {}", config.cgroup);
    println!();
    println!("Profiles configured: {}", config.profiles.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
