use crate::task::registry::TaskRegistry;
use crate::task::types::Task;

/// True when two tasks share at least one resource key
pub fn overlaps(a: &Task, b: &Task) -> bool {
    !a.resource_keys.is_disjoint(&b.resource_keys)
}

/// Claimed or in-progress tasks (other than `task`) whose resource keys
/// intersect the candidate's, sorted by id.
///
/// Advisory only: evaluated at claim time, nothing is locked.
pub fn conflicts<'a>(task: &Task, registry: &'a TaskRegistry) -> Vec<&'a Task> {
    if task.resource_keys.is_empty() {
        return Vec::new();
    }

    let mut found: Vec<&Task> = registry
        .iter()
        .filter(|other| other.id != task.id && other.is_active() && overlaps(task, other))
        .collect();
    found.sort_by(|a, b| a.id.cmp(&b.id));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::types::*;
    use chrono::Utc;

    fn claimed(id: &str, keys: &[&str]) -> Task {
        let mut task = Task::new(id, TaskKind::Refactor, Priority::NORMAL)
            .with_resource_keys(keys.iter().copied());
        task.apply_claim(WorkerId::new("w"), Utc::now()).unwrap();
        task
    }

    #[test]
    fn test_only_active_tasks_conflict() {
        let mut registry = TaskRegistry::new();
        registry
            .insert(Task::new("pending", TaskKind::Issue, Priority::NORMAL).with_resource_keys(["a.go"]))
            .unwrap();
        registry.insert(claimed("active", &["a.go", "b.go"])).unwrap();

        let candidate = Task::new("new", TaskKind::Issue, Priority::NORMAL).with_resource_keys(["a.go"]);
        let ids: Vec<_> = conflicts(&candidate, &registry)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["active"]);
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = claimed("a", &["x", "shared"]);
        let b = claimed("b", &["shared", "y"]);
        let c = claimed("c", &["z"]);

        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));
        assert!(!overlaps(&a, &c));
        assert!(!overlaps(&c, &a));
    }

    #[test]
    fn test_task_never_conflicts_with_itself() {
        let mut registry = TaskRegistry::new();
        let task = claimed("self", &["a.go"]);
        registry.insert(task.clone()).unwrap();

        assert!(conflicts(&task, &registry).is_empty());
    }
}
