use crate::task::types::*;
use serde::{Deserialize, Serialize};

/// Conjunctive filter over the registry; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub kind: Option<TaskKind>,
    pub priority: Option<Priority>,
    pub worker_id: Option<WorkerId>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Match tasks currently held by this worker
    pub fn with_worker(mut self, worker_id: WorkerId) -> Self {
        self.worker_id = Some(worker_id);
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|status| task.status() == status)
            && self.kind.is_none_or(|kind| task.kind == kind)
            && self.priority.is_none_or(|priority| task.priority == priority)
            && self
                .worker_id
                .as_ref()
                .is_none_or(|worker| task.assigned_worker() == Some(worker))
    }
}

/// Task counts per status for dashboards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total: usize,
    pub pending: usize,
    pub claimed: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskStatistics {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut stats = Self::default();
        for task in tasks {
            stats.record(task.status());
        }
        stats
    }

    fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Claimed => self.claimed += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
        }
    }

    pub fn active(&self) -> usize {
        self.claimed + self.in_progress
    }

    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    /// Per-status counts add up to the total
    pub fn is_consistent(&self) -> bool {
        self.pending + self.active() + self.finished() == self.total
    }

    /// Share of finished tasks that completed successfully, 0.0 when none finished
    pub fn success_rate(&self) -> f64 {
        let finished = self.finished();
        if finished == 0 {
            0.0
        } else {
            self.completed as f64 / finished as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claimed_by(id: &str, worker: &str, kind: TaskKind) -> Task {
        let mut task = Task::new(id, kind, Priority::HIGHEST);
        task.apply_claim(WorkerId::new(worker), Utc::now()).unwrap();
        task
    }

    #[test]
    fn test_filter_conjunction() {
        let tasks = vec![
            claimed_by("a", "w1", TaskKind::Pr),
            claimed_by("b", "w2", TaskKind::Pr),
            Task::new("c", TaskKind::Pr, Priority::LOWEST),
        ];

        let filter = TaskFilter::new()
            .with_kind(TaskKind::Pr)
            .with_worker(WorkerId::new("w1"));
        let hits: Vec<_> = tasks.iter().filter(|t| filter.matches(t)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "a");

        let filter = TaskFilter::new().with_priority(Priority::LOWEST);
        assert_eq!(tasks.iter().filter(|t| filter.matches(t)).count(), 1);

        assert_eq!(tasks.iter().filter(|t| TaskFilter::new().matches(t)).count(), 3);
    }

    #[test]
    fn test_statistics_sum_to_total() {
        let tasks = vec![
            claimed_by("a", "w1", TaskKind::Issue),
            Task::new("b", TaskKind::Issue, Priority::NORMAL),
            Task::new("c", TaskKind::Doc, Priority::NORMAL),
        ];

        let stats = TaskStatistics::from_tasks(&tasks);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.claimed, 1);
        assert!(stats.is_consistent());
        assert_eq!(stats.success_rate(), 0.0);
    }
}
