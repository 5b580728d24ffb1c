use crate::task::registry::TaskRegistry;
use crate::task::types::*;
use serde::Serialize;

/// Why a task is or is not claimable by a given worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "readiness", rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    /// Not pending; only pending tasks are offered
    NotPending { status: TaskStatus },
    /// Dependencies that are not completed yet (unregistered ids included)
    WaitingOn { dependencies: Vec<TaskId> },
    /// Capabilities the worker lacks
    MissingCapabilities { capabilities: Vec<String> },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Dependencies of `task` that have not reached `completed`.
/// Ids that are not registered count as unmet.
pub fn unmet_dependencies(task: &Task, registry: &TaskRegistry) -> Vec<TaskId> {
    task.dependencies
        .iter()
        .filter(|dep_id| {
            registry
                .get(dep_id)
                .map_or(true, |dep| dep.status() != TaskStatus::Completed)
        })
        .cloned()
        .collect()
}

pub fn dependencies_met(task: &Task, registry: &TaskRegistry) -> bool {
    task.dependencies.iter().all(|dep_id| {
        registry
            .get(dep_id)
            .is_ok_and(|dep| dep.status() == TaskStatus::Completed)
    })
}

pub fn has_capabilities(task: &Task, capabilities: &Capabilities) -> bool {
    task.required_capabilities.is_subset(capabilities)
}

/// Eligible iff pending, all dependencies completed and capabilities covered
pub fn eligible(task: &Task, capabilities: &Capabilities, registry: &TaskRegistry) -> bool {
    task.is_runnable() && dependencies_met(task, registry) && has_capabilities(task, capabilities)
}

/// Detailed form of [`eligible`], reporting the first failing check
pub fn assess(task: &Task, capabilities: &Capabilities, registry: &TaskRegistry) -> Readiness {
    if !task.is_runnable() {
        return Readiness::NotPending {
            status: task.status(),
        };
    }

    let waiting = unmet_dependencies(task, registry);
    if !waiting.is_empty() {
        return Readiness::WaitingOn {
            dependencies: waiting,
        };
    }

    let missing: Vec<String> = task
        .required_capabilities
        .difference(capabilities)
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Readiness::MissingCapabilities {
            capabilities: missing,
        };
    }

    Readiness::Ready
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn caps(tags: &[&str]) -> Capabilities {
        tags.iter().map(|t| t.to_string()).collect()
    }

    fn registry_with(tasks: Vec<Task>) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for task in tasks {
            registry.insert(task).unwrap();
        }
        registry
    }

    #[test]
    fn test_missing_dependency_is_unmet_not_error() {
        let task = Task::new("b", TaskKind::Issue, Priority::NORMAL).with_dependencies(["ghost"]);
        let registry = registry_with(vec![task.clone()]);

        assert!(!eligible(&task, &caps(&[]), &registry));
        assert_eq!(
            assess(&task, &caps(&[]), &registry),
            Readiness::WaitingOn {
                dependencies: vec![TaskId::new("ghost")]
            }
        );
    }

    #[test]
    fn test_dependency_must_be_completed_not_just_finished() {
        let mut dep = Task::new("a", TaskKind::Issue, Priority::NORMAL);
        let now = Utc::now();
        dep.apply_claim(WorkerId::new("w"), now).unwrap();
        dep.apply_start(now).unwrap();
        dep.apply_complete(false, now).unwrap();

        let task = Task::new("b", TaskKind::Issue, Priority::NORMAL).with_dependencies(["a"]);
        let registry = registry_with(vec![dep, task.clone()]);

        assert!(!dependencies_met(&task, &registry));
    }

    #[test]
    fn test_capabilities_subset() {
        let task = Task::new("a", TaskKind::Test, Priority::NORMAL).with_capabilities(["rust", "ci"]);
        let registry = registry_with(vec![task.clone()]);

        assert!(!eligible(&task, &caps(&["rust"]), &registry));
        assert!(eligible(&task, &caps(&["rust", "ci", "docs"]), &registry));
        assert_eq!(
            assess(&task, &caps(&["rust"]), &registry),
            Readiness::MissingCapabilities {
                capabilities: vec!["ci".to_string()]
            }
        );
    }

    #[test]
    fn test_not_pending_reported_first() {
        let mut task = Task::new("a", TaskKind::Issue, Priority::NORMAL).with_dependencies(["x"]);
        task.apply_claim(WorkerId::new("w"), Utc::now()).unwrap();
        let registry = registry_with(vec![]);

        assert_eq!(
            assess(&task, &caps(&[]), &registry),
            Readiness::NotPending {
                status: TaskStatus::Claimed
            }
        );
    }
}
