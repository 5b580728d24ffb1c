//! Simulated worker pool.
//!
//! Each worker is a tokio task running the control loop a real worker
//! would: poll `list_ready`, try to claim the head of the list, start it,
//! wait, then report success or failure. No work is executed.

use crate::task::{
    Capabilities, OrchestratorError, TaskOrchestrator, TaskStatistics, WorkerId,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Probability in [0, 1] that a started task fails
    pub failure_rate: f64,
    /// Simulated time spent on each task, and the back-off between idle polls
    pub work_delay_ms: u64,
    /// Consecutive polls without a successful claim before a worker stops
    pub max_idle_polls: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            failure_rate: 0.0,
            work_delay_ms: 10,
            max_idle_polls: 20,
        }
    }
}

impl SimulationConfig {
    /// Reject parameters a run cannot use
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("simulation.workers must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            bail!(
                "simulation.failure_rate must be within 0.0..=1.0, got {}",
                self.failure_rate
            );
        }
        Ok(())
    }
}

/// Identity and capabilities of one simulated worker
#[derive(Debug, Clone)]
pub struct WorkerProfile {
    pub id: WorkerId,
    pub capabilities: Capabilities,
}

impl WorkerProfile {
    pub fn new(id: impl Into<WorkerId>, capabilities: Capabilities) -> Self {
        Self {
            id: id.into(),
            capabilities,
        }
    }

    /// `count` workers named `worker-1..=count` sharing one capability set
    pub fn uniform(count: usize, capabilities: &Capabilities) -> Vec<Self> {
        (1..=count)
            .map(|n| Self::new(format!("worker-{n}"), capabilities.clone()))
            .collect()
    }
}

/// What one worker did during the run
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub worker: WorkerId,
    pub completed: usize,
    pub failed: usize,
    /// Claims lost to another worker or refused for a resource conflict
    pub refused_claims: usize,
}

/// Outcome of a whole simulation
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub workers: Vec<WorkerReport>,
    pub statistics: TaskStatistics,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl SimulationReport {
    /// Tasks finished by the simulated workers
    pub fn processed(&self) -> usize {
        self.workers.iter().map(|w| w.completed + w.failed).sum()
    }
}

/// Handle over the spawned worker loops
pub struct WorkerPool {
    joins: Vec<JoinHandle<Result<WorkerReport, OrchestratorError>>>,
}

impl WorkerPool {
    /// Spawn one tokio task per profile
    pub fn spawn(
        orchestrator: &TaskOrchestrator,
        profiles: Vec<WorkerProfile>,
        config: &SimulationConfig,
    ) -> Self {
        let joins = profiles
            .into_iter()
            .map(|profile| {
                let orchestrator = orchestrator.clone();
                let config = config.clone();
                tokio::spawn(async move { worker_loop(orchestrator, profile, config).await })
            })
            .collect();

        Self { joins }
    }

    /// Wait for every worker to go idle
    pub async fn join(self) -> Result<Vec<WorkerReport>> {
        let mut reports = Vec::with_capacity(self.joins.len());
        for joined in futures::future::join_all(self.joins).await {
            let report = joined.context("Simulated worker panicked")??;
            reports.push(report);
        }
        Ok(reports)
    }
}

/// Run workers against the orchestrator until none of them can make progress
pub async fn run_simulation(
    orchestrator: &TaskOrchestrator,
    profiles: Vec<WorkerProfile>,
    config: &SimulationConfig,
) -> Result<SimulationReport> {
    config.validate()?;
    let started = Instant::now();
    info!("Starting simulation with {} worker(s)", profiles.len());

    let workers = WorkerPool::spawn(orchestrator, profiles, config)
        .join()
        .await?;
    let statistics = orchestrator.statistics().await;
    let report = SimulationReport {
        workers,
        statistics,
        elapsed: started.elapsed(),
    };

    info!(
        "Simulation finished: {} processed, {} still pending ({:?})",
        report.processed(),
        report.statistics.pending,
        report.elapsed
    );
    Ok(report)
}

async fn worker_loop(
    orchestrator: TaskOrchestrator,
    profile: WorkerProfile,
    config: SimulationConfig,
) -> Result<WorkerReport, OrchestratorError> {
    let delay = Duration::from_millis(config.work_delay_ms);
    let mut report = WorkerReport {
        worker: profile.id.clone(),
        completed: 0,
        failed: 0,
        refused_claims: 0,
    };
    let mut idle_polls = 0;

    while idle_polls <= config.max_idle_polls {
        let ready = orchestrator
            .list_ready(&profile.id, &profile.capabilities)
            .await;

        let mut claimed = None;
        for candidate in ready {
            match orchestrator.claim(&profile.id, &candidate.id).await {
                Ok(task) => {
                    claimed = Some(task);
                    break;
                }
                Err(err) if err.is_conflict() || err.is_not_pending() => {
                    debug!("{} skipped {}: {}", profile.id, candidate.id, err);
                    report.refused_claims += 1;
                }
                Err(err) => return Err(err),
            }
        }

        let Some(task) = claimed else {
            idle_polls += 1;
            tokio::time::sleep(delay.max(Duration::from_millis(1))).await;
            continue;
        };
        idle_polls = 0;

        orchestrator.start(&task.id).await?;
        tokio::time::sleep(delay).await;

        let success = !rand::random_bool(config.failure_rate);
        orchestrator.complete(&task.id, success).await?;
        if success {
            report.completed += 1;
        } else {
            report.failed += 1;
        }
    }

    debug!("{} stopping after {} idle polls", profile.id, idle_polls);
    Ok(report)
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u128(duration.as_millis())
    }
}
