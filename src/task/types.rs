use crate::task::error::OrchestratorError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Opaque task identifier supplied by the producer (e.g. `issue-42`)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random identifier for producers that have no natural key
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque worker identifier
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WorkerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Capability tags advertised by a worker
pub type Capabilities = BTreeSet<String>;

/// Kind of work a task represents. Informational only, never used for scheduling
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    #[default]
    Issue,
    Pr,
    Refactor,
    Test,
    Doc,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskKind::Issue => "issue",
            TaskKind::Pr => "pr",
            TaskKind::Refactor => "refactor",
            TaskKind::Test => "test",
            TaskKind::Doc => "doc",
        };
        f.write_str(name)
    }
}

/// Task priority, 1 (most urgent) through 5 (least urgent)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Priority = Priority(1);
    pub const NORMAL: Priority = Priority(3);
    pub const LOWEST: Priority = Priority(5);

    pub fn new(value: u8) -> Result<Self, OrchestratorError> {
        if (Self::HIGHEST.0..=Self::LOWEST.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(OrchestratorError::InvalidPriority(value))
        }
    }

    /// Get numeric value (lower is more urgent)
    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<u8> for Priority {
    type Error = OrchestratorError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse task status used for filtering and statistics
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Claimed,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Claimed or in progress: the only states that hold a worker and can conflict
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Claimed | TaskStatus::InProgress)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Claimed => "claimed",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Lifecycle state, carrying the data that only exists in that state
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting to be claimed
    Pending,
    /// Reserved by a worker but not started yet
    Claimed {
        worker: WorkerId,
        claimed_at: DateTime<Utc>,
    },
    /// Being worked on
    InProgress {
        worker: WorkerId,
        claimed_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
    },
    /// Finished successfully
    Completed { completed_at: DateTime<Utc> },
    /// Finished unsuccessfully
    Failed { failed_at: DateTime<Utc> },
}

impl TaskState {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskState::Pending => TaskStatus::Pending,
            TaskState::Claimed { .. } => TaskStatus::Claimed,
            TaskState::InProgress { .. } => TaskStatus::InProgress,
            TaskState::Completed { .. } => TaskStatus::Completed,
            TaskState::Failed { .. } => TaskStatus::Failed,
        }
    }

    pub fn worker(&self) -> Option<&WorkerId> {
        match self {
            TaskState::Claimed { worker, .. } | TaskState::InProgress { worker, .. } => {
                Some(worker)
            }
            _ => None,
        }
    }
}

/// Descriptive fields carried over from the issue tracker
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TaskMetadata {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration_minutes: Option<u32>,
}

/// How a claim ended
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Failed,
    Released,
}

/// Audit entry appended every time a claim ends
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RunRecord {
    pub worker: WorkerId,
    pub claimed_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub outcome: RunOutcome,
}

impl RunRecord {
    /// Time spent between start and end, if the run was started
    pub fn run_duration(&self) -> Option<Duration> {
        self.started_at
            .map(|started_at| self.ended_at.signed_duration_since(started_at))
    }
}

/// Task specification used by producers (task files, ingestion)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TaskSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    #[serde(default)]
    pub kind: TaskKind,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    #[serde(default)]
    pub required_capabilities: BTreeSet<String>,
    #[serde(default)]
    pub resource_keys: BTreeSet<String>,
    #[serde(default)]
    pub metadata: TaskMetadata,
    /// When the work was filed upstream; defaults to the time of ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Unit of work tracked by the orchestrator
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub priority: Priority,
    pub dependencies: BTreeSet<TaskId>,
    pub required_capabilities: BTreeSet<String>,
    pub resource_keys: BTreeSet<String>,
    pub metadata: TaskMetadata,
    pub created_at: DateTime<Utc>,
    pub(crate) state: TaskState,
    pub(crate) history: Vec<RunRecord>,
}

impl Task {
    /// Create a new pending task
    pub fn new(id: impl Into<TaskId>, kind: TaskKind, priority: Priority) -> Self {
        Self {
            id: id.into(),
            kind,
            priority,
            dependencies: BTreeSet::new(),
            required_capabilities: BTreeSet::new(),
            resource_keys: BTreeSet::new(),
            metadata: TaskMetadata::default(),
            created_at: Utc::now(),
            state: TaskState::Pending,
            history: Vec::new(),
        }
    }

    /// Create a pending task from a specification, generating an id when absent
    pub fn from_spec(spec: TaskSpec) -> Self {
        Self {
            id: spec.id.unwrap_or_else(TaskId::generate),
            kind: spec.kind,
            priority: spec.priority,
            dependencies: spec.dependencies,
            required_capabilities: spec.required_capabilities,
            resource_keys: spec.resource_keys,
            metadata: spec.metadata,
            created_at: spec.created_at.unwrap_or_else(Utc::now),
            state: TaskState::Pending,
            history: Vec::new(),
        }
    }

    pub fn with_dependencies<I, T>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskId>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_capabilities<I, T>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.required_capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resource_keys<I, T>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.resource_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, metadata: TaskMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Override the creation time (producers may know when the work was filed)
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    /// Worker holding the task; only set while claimed or in progress
    pub fn assigned_worker(&self) -> Option<&WorkerId> {
        self.state.worker()
    }

    pub fn claimed_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            TaskState::Claimed { claimed_at, .. } | TaskState::InProgress { claimed_at, .. } => {
                Some(*claimed_at)
            }
            _ => None,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            TaskState::InProgress { started_at, .. } => Some(*started_at),
            _ => None,
        }
    }

    /// Completion time for both successful and failed tasks
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            TaskState::Completed { completed_at } => Some(*completed_at),
            TaskState::Failed { failed_at } => Some(*failed_at),
            _ => None,
        }
    }

    /// Previous claims of this task, oldest first
    pub fn history(&self) -> &[RunRecord] {
        &self.history
    }

    pub fn is_runnable(&self) -> bool {
        matches!(self.state, TaskState::Pending)
    }

    pub fn is_active(&self) -> bool {
        self.status().is_active()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Get task age since creation
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Runtime of the current run, or of the finishing run for terminal tasks
    pub fn run_duration(&self) -> Option<Duration> {
        match &self.state {
            TaskState::InProgress { started_at, .. } => {
                Some(Utc::now().signed_duration_since(*started_at))
            }
            TaskState::Completed { .. } | TaskState::Failed { .. } => {
                self.history.last().and_then(RunRecord::run_duration)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_bounds() {
        assert!(Priority::new(0).is_err());
        assert!(Priority::new(6).is_err());
        assert_eq!(Priority::new(1).unwrap(), Priority::HIGHEST);
        assert!(Priority::HIGHEST < Priority::LOWEST);
        assert_eq!(Priority::default().value(), 3);
    }

    #[test]
    fn test_priority_serde_rejects_out_of_range() {
        assert_eq!(serde_json::to_string(&Priority::LOWEST).unwrap(), "5");
        assert!(serde_json::from_str::<Priority>("2").is_ok());
        assert!(serde_json::from_str::<Priority>("7").is_err());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_task_from_minimal_spec() {
        let spec: TaskSpec = serde_json::from_str(r#"{"kind": "refactor"}"#).unwrap();
        let task = Task::from_spec(spec);

        assert_eq!(task.kind, TaskKind::Refactor);
        assert_eq!(task.priority, Priority::NORMAL);
        assert!(task.is_runnable());
        assert!(task.history().is_empty());
        assert_eq!(task.assigned_worker(), None);
    }

    #[test]
    fn test_state_serializes_with_status_tag() {
        let state = TaskState::Claimed {
            worker: WorkerId::new("w1"),
            claimed_at: Utc::now(),
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["status"], "claimed");
        assert_eq!(value["worker"], "w1");
        assert_eq!(state.status(), TaskStatus::Claimed);
        assert_eq!(TaskStatus::InProgress.to_string(), "in_progress");
    }
}
