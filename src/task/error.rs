use crate::task::lifecycle::Operation;
use crate::task::types::{Task, TaskId, TaskStatus};
use thiserror::Error;

/// Errors reported by the orchestrator to its immediate caller
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// Referenced task id does not exist in the registry
    #[error("Task {0} not found")]
    NotFound(TaskId),

    /// Operation attempted from a state that forbids it
    #[error("Task {task_id} cannot {operation} while {status}")]
    InvalidStateTransition {
        task_id: TaskId,
        operation: Operation,
        status: TaskStatus,
    },

    /// Claim refused because active tasks share a resource key
    #[error("Task {task_id} conflicts with active task(s): {}", conflict_ids(.conflicting_tasks))]
    ResourceConflict {
        task_id: TaskId,
        conflicting_tasks: Vec<Task>,
    },

    #[error("Task {0} already exists")]
    DuplicateId(TaskId),

    #[error("Priority {0} is outside the 1..=5 range")]
    InvalidPriority(u8),

    #[error("Task {0} depends on itself")]
    SelfDependency(TaskId),

    #[error("Task {task_id} would close a dependency cycle: {}", cycle_path(.path))]
    DependencyCycle { task_id: TaskId, path: Vec<TaskId> },
}

impl OrchestratorError {
    /// True when a claim lost because the task was no longer pending
    pub fn is_not_pending(&self) -> bool {
        matches!(
            self,
            OrchestratorError::InvalidStateTransition {
                operation: Operation::Claim,
                ..
            }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OrchestratorError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, OrchestratorError::ResourceConflict { .. })
    }

    /// Conflicting active tasks carried by a refused claim
    pub fn conflicting_tasks(&self) -> &[Task] {
        match self {
            OrchestratorError::ResourceConflict {
                conflicting_tasks, ..
            } => conflicting_tasks,
            _ => &[],
        }
    }
}

fn conflict_ids(tasks: &[Task]) -> String {
    tasks
        .iter()
        .map(|task| task.id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn cycle_path(path: &[TaskId]) -> String {
    path.iter()
        .map(TaskId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::types::{Priority, TaskKind};

    #[test]
    fn test_error_messages() {
        let err = OrchestratorError::InvalidStateTransition {
            task_id: TaskId::new("t1"),
            operation: Operation::Start,
            status: TaskStatus::Pending,
        };
        assert_eq!(err.to_string(), "Task t1 cannot start while pending");

        let err = OrchestratorError::DependencyCycle {
            task_id: TaskId::new("a"),
            path: vec![TaskId::new("a"), TaskId::new("b"), TaskId::new("a")],
        };
        assert_eq!(
            err.to_string(),
            "Task a would close a dependency cycle: a -> b -> a"
        );
    }

    #[test]
    fn test_conflicting_tasks_accessor() {
        let other = Task::new("other", TaskKind::Refactor, Priority::NORMAL);
        let err = OrchestratorError::ResourceConflict {
            task_id: TaskId::new("mine"),
            conflicting_tasks: vec![other],
        };

        assert!(err.is_conflict());
        assert!(!err.is_not_pending());
        assert_eq!(err.conflicting_tasks().len(), 1);
        assert_eq!(
            OrchestratorError::NotFound(TaskId::new("x")).conflicting_tasks(),
            &[] as &[Task]
        );
    }
}
