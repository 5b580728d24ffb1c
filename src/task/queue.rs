use crate::task::types::{Priority, Task, TaskId};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// Ordering key: priority number, then creation time, then insertion order.
/// Field order matters for the derived `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    priority: Priority,
    created_at: DateTime<Utc>,
    sequence: u64,
    task_id: TaskId,
}

/// Ordered set of not-yet-claimed tasks.
///
/// Holds ids only; readiness is evaluated by the caller on every read.
/// A task keeps its key for the registry's lifetime, so a released task
/// returns to the position it had before it was claimed.
#[derive(Debug, Default, Clone)]
pub struct PriorityQueue {
    ordered: BTreeSet<QueueKey>,
    keys: HashMap<TaskId, QueueKey>,
    next_sequence: u64,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task. Returns false if it was already queued.
    pub fn insert(&mut self, task: &Task) -> bool {
        let key = match self.keys.get(&task.id) {
            Some(key) => key.clone(),
            None => {
                let key = QueueKey {
                    priority: task.priority,
                    created_at: task.created_at,
                    sequence: self.next_sequence,
                    task_id: task.id.clone(),
                };
                self.next_sequence += 1;
                self.keys.insert(task.id.clone(), key.clone());
                key
            }
        };
        self.ordered.insert(key)
    }

    /// Remove a task from the ordering. Returns false if it was not queued.
    pub fn remove(&mut self, task_id: &TaskId) -> bool {
        match self.keys.get(task_id) {
            Some(key) => self.ordered.remove(key),
            None => false,
        }
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.keys
            .get(task_id)
            .is_some_and(|key| self.ordered.contains(key))
    }

    /// Queued ids, highest priority first, oldest first within a priority
    pub fn iter(&self) -> impl Iterator<Item = &TaskId> {
        self.ordered.iter().map(|key| &key.task_id)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::types::TaskKind;
    use chrono::Duration;

    fn task(id: &str, priority: u8, age_minutes: i64) -> Task {
        Task::new(id, TaskKind::Issue, Priority::new(priority).unwrap())
            .with_created_at(Utc::now() - Duration::minutes(age_minutes))
    }

    fn order(queue: &PriorityQueue) -> Vec<&str> {
        queue.iter().map(TaskId::as_str).collect()
    }

    #[test]
    fn test_priority_then_age() {
        let mut queue = PriorityQueue::new();
        queue.insert(&task("low-old", 5, 100));
        queue.insert(&task("high-new", 1, 1));
        queue.insert(&task("mid", 3, 10));
        queue.insert(&task("high-old", 1, 50));

        assert_eq!(order(&queue), vec!["high-old", "high-new", "mid", "low-old"]);
    }

    #[test]
    fn test_identical_timestamps_keep_insertion_order() {
        let created = Utc::now();
        let mut queue = PriorityQueue::new();
        for id in ["first", "second", "third"] {
            queue.insert(
                &Task::new(id, TaskKind::Doc, Priority::NORMAL).with_created_at(created),
            );
        }

        assert_eq!(order(&queue), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_reinsert_restores_original_position() {
        let mut queue = PriorityQueue::new();
        let a = task("a", 2, 30);
        let b = task("b", 2, 20);
        let c = task("c", 2, 10);
        queue.insert(&a);
        queue.insert(&b);
        queue.insert(&c);

        assert!(queue.remove(&b.id));
        assert!(!queue.contains(&b.id));
        assert_eq!(order(&queue), vec!["a", "c"]);

        assert!(queue.insert(&b));
        assert!(!queue.insert(&b));
        assert_eq!(order(&queue), vec!["a", "b", "c"]);
        assert_eq!(queue.len(), 3);
    }
}
