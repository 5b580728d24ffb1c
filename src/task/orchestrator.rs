use crate::task::conflict;
use crate::task::error::OrchestratorError;
use crate::task::lifecycle::Operation;
use crate::task::query::{TaskFilter, TaskStatistics};
use crate::task::queue::PriorityQueue;
use crate::task::readiness::{self, Readiness};
use crate::task::registry::TaskRegistry;
use crate::task::types::*;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Central coordinator for parallel workers.
///
/// Cloning is cheap and every clone shares the same registry. All
/// mutations hold the write lock for the whole transition, so a claim's
/// status check, conflict check and state change happen as one step.
#[derive(Clone)]
pub struct TaskOrchestrator {
    state: Arc<RwLock<OrchestratorState>>,
    config: TaskOrchestratorConfig,
    event_handlers: Vec<Arc<dyn OrchestratorEventHandler + Send + Sync>>,
}

#[derive(Debug, Default)]
struct OrchestratorState {
    registry: TaskRegistry,
    queue: PriorityQueue,
}

/// Configuration for the orchestrator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaskOrchestratorConfig {
    /// Reject tasks that would close a dependency cycle (otherwise only warn)
    pub reject_dependency_cycles: bool,
    /// Warn when a task depends on ids that are not registered yet
    pub warn_on_missing_dependencies: bool,
}

impl Default for TaskOrchestratorConfig {
    fn default() -> Self {
        Self {
            reject_dependency_cycles: true,
            warn_on_missing_dependencies: true,
        }
    }
}

/// Events emitted after each successful or refused transition
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    TaskAdded {
        task_id: TaskId,
        priority: Priority,
    },
    TaskClaimed {
        task_id: TaskId,
        worker: WorkerId,
    },
    ClaimRefused {
        task_id: TaskId,
        worker: WorkerId,
        conflicting: Vec<TaskId>,
    },
    TaskStarted {
        task_id: TaskId,
        worker: WorkerId,
    },
    TaskFinished {
        task_id: TaskId,
        status: TaskStatus,
        run_duration: Option<Duration>,
    },
    TaskReleased {
        task_id: TaskId,
        previous_worker: WorkerId,
    },
}

/// Handler for orchestrator events
pub trait OrchestratorEventHandler {
    fn handle_event(&self, event: &OrchestratorEvent) -> anyhow::Result<()>;
}

/// Read-only export of the whole registry for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSnapshot {
    pub taken_at: DateTime<Utc>,
    pub statistics: TaskStatistics,
    pub queue: Vec<TaskId>,
    pub tasks: Vec<Task>,
}

impl TaskOrchestrator {
    /// Create a new orchestrator
    pub fn new(config: TaskOrchestratorConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(OrchestratorState::default())),
            config,
            event_handlers: Vec::new(),
        }
    }

    pub fn config(&self) -> &TaskOrchestratorConfig {
        &self.config
    }

    /// Add event handler. Handlers registered after cloning only see events from this clone.
    pub fn add_event_handler(&mut self, handler: Arc<dyn OrchestratorEventHandler + Send + Sync>) {
        self.event_handlers.push(handler);
    }

    /// Add a new pending task
    pub async fn add_task(&self, task: Task) -> Result<TaskId, OrchestratorError> {
        if !task.is_runnable() {
            return Err(OrchestratorError::InvalidStateTransition {
                task_id: task.id.clone(),
                operation: Operation::Add,
                status: task.status(),
            });
        }

        let task_id = task.id.clone();
        let priority = task.priority;
        {
            let mut state = self.state.write().await;
            let OrchestratorState { registry, queue } = &mut *state;

            registry.validate_new(&task)?;

            if let Some(path) = registry.find_dependency_cycle(&task) {
                let err = OrchestratorError::DependencyCycle {
                    task_id: task_id.clone(),
                    path,
                };
                if self.config.reject_dependency_cycles {
                    warn!("Rejected task {}: {}", task_id, err);
                    return Err(err);
                }
                warn!("Accepted task {} despite dependency cycle: {}", task_id, err);
            }

            if self.config.warn_on_missing_dependencies {
                for dep_id in registry.missing_dependencies(&task) {
                    warn!(
                        "Task {} has dependency {} that doesn't exist yet",
                        task_id, dep_id
                    );
                }
            }

            queue.insert(&task);
            registry.insert(task)?;
        }

        info!("Task {} added (priority: {})", task_id, priority);
        self.emit_event(OrchestratorEvent::TaskAdded {
            task_id: task_id.clone(),
            priority,
        });
        Ok(task_id)
    }

    /// Add several tasks, reporting each outcome in input order
    pub async fn add_tasks(
        &self,
        tasks: impl IntoIterator<Item = Task>,
    ) -> Vec<Result<TaskId, OrchestratorError>> {
        let mut results = Vec::new();
        for task in tasks {
            results.push(self.add_task(task).await);
        }
        results
    }

    /// Pending tasks this worker could claim now, in priority order.
    /// Readiness is recomputed on every call.
    pub async fn list_ready(&self, worker: &WorkerId, capabilities: &Capabilities) -> Vec<Task> {
        let state = self.state.read().await;
        let ready: Vec<Task> = state
            .queue
            .iter()
            .filter_map(|task_id| state.registry.get(task_id).ok())
            .filter(|task| readiness::eligible(task, capabilities, &state.registry))
            .cloned()
            .collect();

        debug!("{} task(s) ready for worker {}", ready.len(), worker);
        ready
    }

    /// Explain whether a task is claimable with the given capabilities
    pub async fn readiness(
        &self,
        task_id: &TaskId,
        capabilities: &Capabilities,
    ) -> Result<Readiness, OrchestratorError> {
        let state = self.state.read().await;
        let task = state.registry.get(task_id)?;
        Ok(readiness::assess(task, capabilities, &state.registry))
    }

    /// Reserve a pending task for a worker
    pub async fn claim(
        &self,
        worker: &WorkerId,
        task_id: &TaskId,
    ) -> Result<Task, OrchestratorError> {
        let outcome = {
            let mut state = self.state.write().await;
            let OrchestratorState { registry, queue } = &mut *state;

            let task = registry.get(task_id)?;
            if !Operation::Claim.is_legal_from(task.status()) {
                debug!(
                    "Task {} is not available to {} (status: {})",
                    task_id,
                    worker,
                    task.status()
                );
                return Err(OrchestratorError::InvalidStateTransition {
                    task_id: task_id.clone(),
                    operation: Operation::Claim,
                    status: task.status(),
                });
            }

            let conflicting: Vec<Task> = conflict::conflicts(task, registry)
                .into_iter()
                .cloned()
                .collect();

            if conflicting.is_empty() {
                let task = registry.get_mut(task_id)?;
                task.apply_claim(worker.clone(), Utc::now())?;
                queue.remove(task_id);
                Ok(task.clone())
            } else {
                Err(conflicting)
            }
        };

        match outcome {
            Ok(task) => {
                info!("Task {} claimed by worker {}", task_id, worker);
                self.emit_event(OrchestratorEvent::TaskClaimed {
                    task_id: task_id.clone(),
                    worker: worker.clone(),
                });
                Ok(task)
            }
            Err(conflicting_tasks) => {
                let conflicting: Vec<TaskId> =
                    conflicting_tasks.iter().map(|t| t.id.clone()).collect();
                warn!(
                    "Claim of task {} by {} refused: resource conflict with {:?}",
                    task_id, worker, conflicting
                );
                self.emit_event(OrchestratorEvent::ClaimRefused {
                    task_id: task_id.clone(),
                    worker: worker.clone(),
                    conflicting,
                });
                Err(OrchestratorError::ResourceConflict {
                    task_id: task_id.clone(),
                    conflicting_tasks,
                })
            }
        }
    }

    /// Begin work on a claimed task
    pub async fn start(&self, task_id: &TaskId) -> Result<Task, OrchestratorError> {
        let started = {
            let mut state = self.state.write().await;
            let task = state.registry.get_mut(task_id)?;
            if let Err(err) = task.apply_start(Utc::now()) {
                error!("Task {} cannot be started (status: {})", task_id, task.status());
                return Err(err);
            }
            task.clone()
        };

        let worker = started.assigned_worker().cloned();
        info!("Task {} started", task_id);
        if let Some(worker) = worker {
            self.emit_event(OrchestratorEvent::TaskStarted {
                task_id: task_id.clone(),
                worker,
            });
        }
        Ok(started)
    }

    /// Finish an in-progress task as completed (`success`) or failed
    pub async fn complete(&self, task_id: &TaskId, success: bool) -> Result<Task, OrchestratorError> {
        let finished = {
            let mut state = self.state.write().await;
            let OrchestratorState { registry, queue } = &mut *state;
            let task = registry.get_mut(task_id).inspect_err(|_| {
                error!("Task {} not found", task_id);
            })?;
            if let Err(err) = task.apply_complete(success, Utc::now()) {
                error!("Task {} cannot complete (status: {})", task_id, task.status());
                return Err(err);
            }
            queue.remove(task_id);
            task.clone()
        };

        let run_duration = finished.run_duration();
        let minutes = run_duration.map_or(0.0, |d| d.num_milliseconds() as f64 / 60_000.0);
        if success {
            info!("Task {} completed ({:.1} min)", task_id, minutes);
        } else {
            warn!("Task {} failed ({:.1} min)", task_id, minutes);
        }
        self.emit_event(OrchestratorEvent::TaskFinished {
            task_id: task_id.clone(),
            status: finished.status(),
            run_duration,
        });
        Ok(finished)
    }

    /// Return a claimed or in-progress task to the pending pool
    pub async fn release(&self, task_id: &TaskId) -> Result<Task, OrchestratorError> {
        let (released, previous_worker) = {
            let mut state = self.state.write().await;
            let OrchestratorState { registry, queue } = &mut *state;
            let task = registry.get_mut(task_id).inspect_err(|_| {
                error!("Task {} not found", task_id);
            })?;
            let previous_worker = task.assigned_worker().cloned();
            if let Err(err) = task.apply_release(Utc::now()) {
                error!("Task {} cannot be released (status: {})", task_id, task.status());
                return Err(err);
            }
            queue.insert(task);
            (task.clone(), previous_worker)
        };

        info!("Task {} released", task_id);
        if let Some(previous_worker) = previous_worker {
            self.emit_event(OrchestratorEvent::TaskReleased {
                task_id: task_id.clone(),
                previous_worker,
            });
        }
        Ok(released)
    }

    /// Get a task by ID
    pub async fn get_task(&self, task_id: &TaskId) -> Result<Task, OrchestratorError> {
        let state = self.state.read().await;
        state.registry.get(task_id).cloned()
    }

    /// Tasks matching the filter, ordered by priority then age
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .registry
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        sort_by_queue_order(&mut tasks);
        tasks
    }

    /// Tasks a worker currently holds (claimed or in progress)
    pub async fn worker_tasks(&self, worker: &WorkerId) -> Vec<Task> {
        self.list_tasks(&TaskFilter::new().with_worker(worker.clone()))
            .await
    }

    /// Active claims older than `age`, for an external supervisor to act on
    pub async fn claims_older_than(&self, age: Duration) -> Vec<Task> {
        // Ages beyond the representable range saturate
        let cutoff = match Utc::now().checked_sub_signed(age) {
            Some(cutoff) => cutoff,
            None if age > Duration::zero() => return Vec::new(),
            None => DateTime::<Utc>::MAX_UTC,
        };
        let state = self.state.read().await;
        let mut stale: Vec<Task> = state
            .registry
            .iter()
            .filter(|task| task.claimed_at().is_some_and(|claimed_at| claimed_at <= cutoff))
            .cloned()
            .collect();
        stale.sort_by_key(|task| task.claimed_at());
        stale
    }

    /// Counts per status
    pub async fn statistics(&self) -> TaskStatistics {
        let state = self.state.read().await;
        TaskStatistics::from_tasks(state.registry.iter())
    }

    /// Consistent copy of the whole registry, taken under one read lock
    pub async fn snapshot(&self) -> OrchestratorSnapshot {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state.registry.iter().cloned().collect();
        sort_by_queue_order(&mut tasks);

        OrchestratorSnapshot {
            taken_at: Utc::now(),
            statistics: TaskStatistics::from_tasks(&tasks),
            queue: state.queue.iter().cloned().collect(),
            tasks,
        }
    }

    /// Export the snapshot as pretty JSON
    pub async fn export_to_json(&self) -> anyhow::Result<String> {
        let snapshot = self.snapshot().await;
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize orchestrator snapshot")
    }

    /// Emit event to all handlers
    fn emit_event(&self, event: OrchestratorEvent) {
        for handler in &self.event_handlers {
            if let Err(e) = handler.handle_event(&event) {
                error!("Event handler error: {}", e);
            }
        }
    }
}

impl Default for TaskOrchestrator {
    fn default() -> Self {
        Self::new(TaskOrchestratorConfig::default())
    }
}

fn sort_by_queue_order(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Simple event handler that logs events
pub struct LoggingEventHandler;

impl OrchestratorEventHandler for LoggingEventHandler {
    fn handle_event(&self, event: &OrchestratorEvent) -> anyhow::Result<()> {
        match event {
            OrchestratorEvent::TaskAdded { task_id, priority } => {
                info!("Task added: {} (priority {})", task_id, priority);
            }
            OrchestratorEvent::TaskClaimed { task_id, worker } => {
                info!("Task claimed: {} by {}", task_id, worker);
            }
            OrchestratorEvent::ClaimRefused {
                task_id,
                worker,
                conflicting,
            } => {
                warn!(
                    "Claim refused: {} for {} (conflicts: {:?})",
                    task_id, worker, conflicting
                );
            }
            OrchestratorEvent::TaskStarted { task_id, worker } => {
                info!("Task started: {} by {}", task_id, worker);
            }
            OrchestratorEvent::TaskFinished {
                task_id, status, ..
            } => {
                info!("Task finished: {} ({})", task_id, status);
            }
            OrchestratorEvent::TaskReleased {
                task_id,
                previous_worker,
            } => {
                info!("Task released: {} (was held by {})", task_id, previous_worker);
            }
        }
        Ok(())
    }
}
