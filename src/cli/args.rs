//! Command line argument parsing
//!
//! Subcommands:
//! - `plan`: Load a task file and print the claim order for one worker
//! - `simulate`: Drive simulated workers through a task file
//! - `show-config`: Show configuration discovery information
//! - `init-config`: Write a default configuration file

use super::tasks::TaskFormat;
use crate::task::Capabilities;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Plan(PlanConfig),
    Simulate(SimulateConfig),
    ShowConfig,
    InitConfig(PathBuf),
}

#[derive(Debug)]
pub struct PlanConfig {
    pub tasks_file: PathBuf,
    pub format: TaskFormat,
    pub worker: String,
    pub capabilities: Capabilities,
    pub json: bool,
}

#[derive(Debug)]
pub struct SimulateConfig {
    pub tasks_file: PathBuf,
    pub format: TaskFormat,
    pub workers: Option<usize>,
    pub failure_rate: Option<f64>,
    pub capabilities: Capabilities,
}

#[derive(Debug, Parser)]
#[command(name = "corch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Task coordination for parallel coding workers")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
    /// Tracing filter (overrides RUST_LOG), e.g. "corch=debug"
    #[arg(long = "log-level", value_name = "FILTER", global = true)]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the ready order and statistics for a task file
    Plan {
        /// Task file (.toml or .json)
        tasks_file: PathBuf,
        /// Worker capability (can be used multiple times)
        #[arg(long = "capability", value_name = "TAG")]
        capabilities: Vec<String>,
        /// Worker id to plan for
        #[arg(long = "worker", default_value = "planner")]
        worker: String,
        /// Print the orchestrator snapshot as JSON
        #[arg(long = "json")]
        json: bool,
    },
    /// Run simulated workers until no task can be claimed
    Simulate {
        /// Task file (.toml or .json)
        tasks_file: PathBuf,
        /// Number of workers (overrides config)
        #[arg(short = 'w', long = "workers")]
        workers: Option<usize>,
        /// Probability that a task fails, 0.0 to 1.0 (overrides config)
        #[arg(long = "failure-rate")]
        failure_rate: Option<f64>,
        /// Capability given to every worker (defaults to all capabilities the tasks require)
        #[arg(long = "capability", value_name = "TAG")]
        capabilities: Vec<String>,
    },
    /// Show configuration discovery information
    ShowConfig,
    /// Write a default configuration file
    InitConfig {
        /// Destination (defaults to ./.corch/config.toml)
        path: Option<PathBuf>,
    },
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Plan {
                tasks_file,
                capabilities,
                worker,
                json,
            }) => Ok(ExecutionMode::Plan(PlanConfig {
                format: Self::detect_format(tasks_file)?,
                tasks_file: tasks_file.clone(),
                worker: worker.clone(),
                capabilities: capabilities.iter().cloned().collect(),
                json: *json,
            })),
            Some(Commands::Simulate {
                tasks_file,
                workers,
                failure_rate,
                capabilities,
            }) => {
                if let Some(rate) = failure_rate
                    && !(0.0..=1.0).contains(rate)
                {
                    return Err(format!("--failure-rate must be within 0.0..=1.0, got {rate}"));
                }
                if *workers == Some(0) {
                    return Err("--workers must be at least 1".to_string());
                }

                Ok(ExecutionMode::Simulate(SimulateConfig {
                    format: Self::detect_format(tasks_file)?,
                    tasks_file: tasks_file.clone(),
                    workers: *workers,
                    failure_rate: *failure_rate,
                    capabilities: capabilities.iter().cloned().collect(),
                }))
            }
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            Some(Commands::InitConfig { path }) => Ok(ExecutionMode::InitConfig(
                path.clone().unwrap_or_else(|| {
                    PathBuf::from(crate::env::CORCH_DIR_NAME).join(crate::env::CONFIG_FILE_NAME)
                }),
            )),
            None => Err(
                "No command specified. Use 'corch --help' to see available commands.".to_string(),
            ),
        }
    }

    fn detect_format(path: &std::path::Path) -> Result<TaskFormat, String> {
        TaskFormat::detect(path).map_err(|e| e.to_string())
    }
}
