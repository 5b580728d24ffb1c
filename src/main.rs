use anyhow::{Context, Result};
use corch::cli::{
    Args, ConfigDiscovery, ExecutionMode, PlanConfig, SimulateConfig, TaskFormat, TaskLoader,
};
use corch::task::{Readiness, TaskStatus};
use corch::{
    Capabilities, LoggingEventHandler, OrchestratorConfig, Task, TaskFilter, TaskOrchestrator,
    TaskStatistics, WorkerId, WorkerProfile, env, run_simulation,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    match mode {
        ExecutionMode::Plan(plan) => {
            let config = ConfigDiscovery::load(args.config.as_deref())?;
            run_plan(plan, config, args.verbose).await
        }
        ExecutionMode::Simulate(simulate) => {
            let config = ConfigDiscovery::load(args.config.as_deref())?;
            run_simulate(simulate, config, args.verbose).await
        }
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            let config = ConfigDiscovery::load(args.config.as_deref())?;
            println!();
            println!("{}", config.to_toml_string()?);
            Ok(())
        }
        ExecutionMode::InitConfig(path) => {
            ConfigDiscovery::create_default_config(&path)?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}

fn init_tracing(args: &Args) {
    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if args.verbose {
                "corch=debug"
            } else {
                env::DEFAULT_LOG_FILTER
            })
        }),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build an orchestrator and register every task from the file
async fn load_backlog(
    tasks_file: &Path,
    format: TaskFormat,
    config: &OrchestratorConfig,
    verbose: bool,
) -> Result<(TaskOrchestrator, Vec<Task>)> {
    let tasks = TaskLoader::load_tasks_as(tasks_file, format)
        .with_context(|| format!("Failed to load tasks from {}", tasks_file.display()))?;
    info!("Loaded {} task(s) from {:?}", tasks.len(), tasks_file);

    let mut orchestrator = TaskOrchestrator::new(config.orchestrator.clone());
    if verbose {
        orchestrator.add_event_handler(Arc::new(LoggingEventHandler));
    }

    let mut accepted = Vec::with_capacity(tasks.len());
    for (task, result) in tasks
        .iter()
        .zip(orchestrator.add_tasks(tasks.clone()).await)
    {
        match result {
            Ok(_) => accepted.push(task.clone()),
            Err(e) => {
                warn!("Skipping task {}: {}", task.id, e);
                println!("⚠️  Skipped {}: {}", task.id, e);
            }
        }
    }

    Ok((orchestrator, accepted))
}

async fn run_plan(plan: PlanConfig, config: OrchestratorConfig, verbose: bool) -> Result<()> {
    let (orchestrator, _) = load_backlog(&plan.tasks_file, plan.format, &config, verbose).await?;

    if plan.json {
        println!("{}", orchestrator.export_to_json().await?);
        return Ok(());
    }

    let worker = WorkerId::new(plan.worker);
    let ready = orchestrator.list_ready(&worker, &plan.capabilities).await;

    println!("📋 Ready for {} ({} task(s)):", worker, ready.len());
    for (i, task) in ready.iter().enumerate() {
        println!(
            "  {}. {} [{} p{}] {}",
            i + 1,
            task.id,
            task.kind,
            task.priority,
            task.metadata.description
        );
    }

    let pending = orchestrator
        .list_tasks(&TaskFilter::new().with_status(TaskStatus::Pending))
        .await;
    let blocked: Vec<&Task> = pending
        .iter()
        .filter(|task| !ready.iter().any(|r| r.id == task.id))
        .collect();
    if !blocked.is_empty() {
        println!();
        println!("⏳ Not ready:");
        for task in blocked {
            let reason = orchestrator
                .readiness(&task.id, &plan.capabilities)
                .await?;
            println!("  - {}: {}", task.id, describe_readiness(&reason));
        }
    }

    println!();
    print_statistics(&orchestrator.statistics().await);
    Ok(())
}

async fn run_simulate(
    simulate: SimulateConfig,
    mut config: OrchestratorConfig,
    verbose: bool,
) -> Result<()> {
    if let Some(workers) = simulate.workers {
        config.simulation.workers = workers;
    }
    if let Some(failure_rate) = simulate.failure_rate {
        config.simulation.failure_rate = failure_rate;
    }

    let (orchestrator, tasks) =
        load_backlog(&simulate.tasks_file, simulate.format, &config, verbose).await?;

    let capabilities: Capabilities = if simulate.capabilities.is_empty() {
        tasks
            .iter()
            .flat_map(|task| task.required_capabilities.iter().cloned())
            .collect()
    } else {
        simulate.capabilities
    };
    let profiles = WorkerProfile::uniform(config.simulation.workers, &capabilities);

    let report = run_simulation(&orchestrator, profiles, &config.simulation).await?;

    println!("🤖 Simulation finished in {:?}", report.elapsed);
    for worker in &report.workers {
        println!(
            "  {}: {} completed, {} failed, {} refused claim(s)",
            worker.worker, worker.completed, worker.failed, worker.refused_claims
        );
    }

    if report.statistics.pending > 0 {
        println!();
        println!("⏳ Left pending:");
        let pending = orchestrator
            .list_tasks(&TaskFilter::new().with_status(TaskStatus::Pending))
            .await;
        for task in pending {
            let reason = orchestrator.readiness(&task.id, &capabilities).await?;
            println!("  - {}: {}", task.id, describe_readiness(&reason));
        }
    }

    println!();
    print_statistics(&report.statistics);
    Ok(())
}

fn describe_readiness(readiness: &Readiness) -> String {
    match readiness {
        Readiness::Ready => "ready".to_string(),
        Readiness::NotPending { status } => format!("not pending ({})", status),
        Readiness::WaitingOn { dependencies } => {
            let ids: Vec<&str> = dependencies.iter().map(|id| id.as_str()).collect();
            format!("waiting on {}", ids.join(", "))
        }
        Readiness::MissingCapabilities { capabilities } => {
            format!("missing capabilities {}", capabilities.join(", "))
        }
    }
}

fn print_statistics(stats: &TaskStatistics) {
    println!("📊 Statistics:");
    println!("  Total:       {}", stats.total);
    println!("  Pending:     {}", stats.pending);
    println!("  Claimed:     {}", stats.claimed);
    println!("  In progress: {}", stats.in_progress);
    println!("  Completed:   {}", stats.completed);
    println!("  Failed:      {}", stats.failed);
    if stats.finished() > 0 {
        println!("  Success:     {:.0}%", stats.success_rate() * 100.0);
    }
}
