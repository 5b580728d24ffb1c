//! # corch
//!
//! Task coordination core for parallel coding workers. Producers register
//! tasks (issues, PRs, refactors, tests, docs) with priorities, dependencies,
//! capability requirements and resource footprints; workers poll for ready
//! work and claim it atomically. The orchestrator never runs work itself, it
//! only answers "what can I claim" and records transitions.
//!
//! ## Architecture Overview
//!
//! - **[`task`]**: Task registry, readiness, conflict detection, lifecycle
//!   state machine, priority queue and the [`TaskOrchestrator`] facade
//! - **[`simulation`]**: Simulated worker pool driving the orchestrator
//! - **[`cli`]**: Argument parsing, task files and configuration discovery
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use corch::{Priority, Task, TaskKind, TaskOrchestrator, WorkerId};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = TaskOrchestrator::default();
//!     orchestrator
//!         .add_task(Task::new("issue-42", TaskKind::Issue, Priority::HIGHEST)
//!             .with_resource_keys(["src/auth.rs"]))
//!         .await?;
//!
//!     let worker = WorkerId::new("worker-1");
//!     for task in orchestrator.list_ready(&worker, &Default::default()).await {
//!         if let Ok(task) = orchestrator.claim(&worker, &task.id).await {
//!             orchestrator.start(&task.id).await?;
//!             orchestrator.complete(&task.id, true).await?;
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

/// Task coordination core.
///
/// Registry, readiness evaluation, conflict detection, the lifecycle state
/// machine and the priority queue, combined behind [`TaskOrchestrator`].
pub mod task;

/// Simulated workers for exercising an orchestrator end to end.
pub mod simulation;

/// Configuration file model.
pub mod config;

/// Configuration file names and path helpers.
pub mod env;

// CLI module for command-line interface
pub mod cli;

// Re-export main task types
pub use task::{
    Capabilities, LoggingEventHandler, OrchestratorError, OrchestratorEvent,
    OrchestratorEventHandler, OrchestratorSnapshot, Priority, Task, TaskFilter, TaskId, TaskKind,
    TaskOrchestrator, TaskOrchestratorConfig, TaskSpec, TaskStatistics, TaskStatus, WorkerId,
};

pub use config::OrchestratorConfig;
pub use simulation::{SimulationConfig, SimulationReport, WorkerProfile, run_simulation};
