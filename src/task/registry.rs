use crate::task::error::OrchestratorError;
use crate::task::types::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Canonical task records, keyed by id. Tasks are never removed.
#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    tasks: HashMap<TaskId, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that a task can be inserted: unique id and no self-dependency
    pub fn validate_new(&self, task: &Task) -> Result<(), OrchestratorError> {
        if self.tasks.contains_key(&task.id) {
            return Err(OrchestratorError::DuplicateId(task.id.clone()));
        }
        if task.dependencies.contains(&task.id) {
            return Err(OrchestratorError::SelfDependency(task.id.clone()));
        }
        Ok(())
    }

    /// Insert a new task
    pub fn insert(&mut self, task: Task) -> Result<&Task, OrchestratorError> {
        self.validate_new(&task)?;
        let task_id = task.id.clone();
        debug!("Registered task {}", task_id);
        Ok(self.tasks.entry(task_id).or_insert(task))
    }

    /// Get a task by ID
    pub fn get(&self, task_id: &TaskId) -> Result<&Task, OrchestratorError> {
        self.tasks
            .get(task_id)
            .ok_or_else(|| OrchestratorError::NotFound(task_id.clone()))
    }

    /// Get a mutable reference to a task by ID
    pub fn get_mut(&mut self, task_id: &TaskId) -> Result<&mut Task, OrchestratorError> {
        self.tasks
            .get_mut(task_id)
            .ok_or_else(|| OrchestratorError::NotFound(task_id.clone()))
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Dependency ids of `task` that are not registered yet
    pub fn missing_dependencies<'a>(&self, task: &'a Task) -> Vec<&'a TaskId> {
        task.dependencies
            .iter()
            .filter(|dep_id| !self.tasks.contains_key(*dep_id))
            .collect()
    }

    /// Find a dependency cycle that inserting `task` would close.
    ///
    /// Returns the path `task -> ... -> task` when one of the task's
    /// dependencies (transitively, through registered tasks) depends on it.
    /// Unregistered ids end the walk.
    pub fn find_dependency_cycle(&self, task: &Task) -> Option<Vec<TaskId>> {
        let mut visited = HashSet::new();
        let mut path = vec![task.id.clone()];

        for dep_id in &task.dependencies {
            if self.reaches(dep_id, &task.id, &mut visited, &mut path) {
                return Some(path);
            }
        }

        None
    }

    fn reaches(
        &self,
        current: &TaskId,
        target: &TaskId,
        visited: &mut HashSet<TaskId>,
        path: &mut Vec<TaskId>,
    ) -> bool {
        path.push(current.clone());

        if current == target {
            return true;
        }

        if visited.insert(current.clone()) {
            if let Some(task) = self.tasks.get(current) {
                for dep_id in &task.dependencies {
                    if self.reaches(dep_id, target, visited, path) {
                        return true;
                    }
                }
            }
        }

        path.pop();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> Task {
        Task::new(id, TaskKind::Issue, Priority::NORMAL)
    }

    #[test]
    fn test_insert_and_get() {
        let mut registry = TaskRegistry::new();
        registry.insert(task("a")).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&TaskId::new("a")).unwrap().id.as_str(), "a");
        assert!(registry.get(&TaskId::new("b")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_duplicate_and_self_dependency_rejected() {
        let mut registry = TaskRegistry::new();
        registry.insert(task("a")).unwrap();

        assert!(matches!(
            registry.insert(task("a")),
            Err(OrchestratorError::DuplicateId(_))
        ));
        assert!(matches!(
            registry.insert(task("b").with_dependencies(["b"])),
            Err(OrchestratorError::SelfDependency(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_cycle_detection_through_forward_reference() {
        let mut registry = TaskRegistry::new();
        // a -> b (b not registered yet), b -> c, then c -> a closes the loop
        registry.insert(task("a").with_dependencies(["b"])).unwrap();
        registry.insert(task("b").with_dependencies(["c"])).unwrap();

        let closing = task("c").with_dependencies(["a"]);
        let path = registry.find_dependency_cycle(&closing).unwrap();
        let path: Vec<_> = path.iter().map(TaskId::as_str).collect();
        assert_eq!(path, vec!["c", "a", "b", "c"]);

        let harmless = task("c").with_dependencies(["zzz"]);
        assert!(registry.find_dependency_cycle(&harmless).is_none());
    }

    #[test]
    fn test_missing_dependencies() {
        let mut registry = TaskRegistry::new();
        registry.insert(task("a")).unwrap();

        let t = task("b").with_dependencies(["a", "later"]);
        let missing = registry.missing_dependencies(&t);
        assert_eq!(missing, vec![&TaskId::new("later")]);
    }
}
