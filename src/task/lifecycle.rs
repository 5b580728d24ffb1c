//! Task state machine.
//!
//! ```text
//! pending -> claimed -> in_progress -> completed | failed
//!    ^          |            |
//!    +----------+------------+   (release)
//! ```
//!
//! Every transition checks its source state and timestamps the change.
//! Terminal states accept no operation.

use crate::task::error::OrchestratorError;
use crate::task::types::{RunOutcome, RunRecord, Task, TaskState, TaskStatus, WorkerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operations that act on a task record
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Claim,
    Start,
    Complete,
    Release,
}

impl Operation {
    /// Legal source states for this operation
    pub fn is_legal_from(self, status: TaskStatus) -> bool {
        match self {
            Operation::Add | Operation::Claim => status == TaskStatus::Pending,
            Operation::Start => status == TaskStatus::Claimed,
            Operation::Complete => status == TaskStatus::InProgress,
            Operation::Release => status.is_active(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Add => "be added",
            Operation::Claim => "be claimed",
            Operation::Start => "start",
            Operation::Complete => "complete",
            Operation::Release => "be released",
        };
        f.write_str(name)
    }
}

impl Task {
    fn ensure_legal(&self, operation: Operation) -> Result<(), OrchestratorError> {
        let status = self.status();
        if operation.is_legal_from(status) {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidStateTransition {
                task_id: self.id.clone(),
                operation,
                status,
            })
        }
    }

    /// pending -> claimed
    pub(crate) fn apply_claim(
        &mut self,
        worker: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        self.ensure_legal(Operation::Claim)?;
        self.state = TaskState::Claimed {
            worker,
            claimed_at: now,
        };
        Ok(())
    }

    /// claimed -> in_progress
    pub(crate) fn apply_start(&mut self, now: DateTime<Utc>) -> Result<(), OrchestratorError> {
        self.ensure_legal(Operation::Start)?;
        if let TaskState::Claimed { worker, claimed_at } = &self.state {
            self.state = TaskState::InProgress {
                worker: worker.clone(),
                claimed_at: *claimed_at,
                started_at: now,
            };
        }
        Ok(())
    }

    /// in_progress -> completed | failed
    pub(crate) fn apply_complete(
        &mut self,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        self.ensure_legal(Operation::Complete)?;
        let outcome = if success {
            RunOutcome::Completed
        } else {
            RunOutcome::Failed
        };
        self.close_run(outcome, now);
        self.state = if success {
            TaskState::Completed { completed_at: now }
        } else {
            TaskState::Failed { failed_at: now }
        };
        Ok(())
    }

    /// claimed | in_progress -> pending
    pub(crate) fn apply_release(&mut self, now: DateTime<Utc>) -> Result<(), OrchestratorError> {
        self.ensure_legal(Operation::Release)?;
        self.close_run(RunOutcome::Released, now);
        self.state = TaskState::Pending;
        Ok(())
    }

    /// Record the run that is ending before the worker data is dropped from the state
    fn close_run(&mut self, outcome: RunOutcome, ended_at: DateTime<Utc>) {
        let record = match &self.state {
            TaskState::Claimed { worker, claimed_at } => RunRecord {
                worker: worker.clone(),
                claimed_at: *claimed_at,
                started_at: None,
                ended_at,
                outcome,
            },
            TaskState::InProgress {
                worker,
                claimed_at,
                started_at,
            } => RunRecord {
                worker: worker.clone(),
                claimed_at: *claimed_at,
                started_at: Some(*started_at),
                ended_at,
                outcome,
            },
            _ => return,
        };
        self.history.push(record);
    }
}
