//! Units of work submitted to the pool.

use crate::util::{ScanMatchError, ScanMatchResult};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Result of running a task closure.
pub type TaskOutcome = ScanMatchResult<()>;

type Job = Box<dyn FnOnce() -> TaskOutcome + Send + 'static>;

/// An identified closure executed once by a pool worker.
pub struct Task {
    id: u64,
    job: Job,
}

impl Task {
    /// Wraps a closure as a task.
    pub fn new<F>(id: u64, job: F) -> Self
    where
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        Self {
            id,
            job: Box::new(job),
        }
    }

    /// Returns the task id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runs the closure, converting a panic into `TaskFailed`.
    pub(crate) fn execute(self) -> TaskOutcome {
        let task_id = self.id;
        match panic::catch_unwind(AssertUnwindSafe(self.job)) {
            Ok(outcome) => outcome,
            Err(payload) => Err(ScanMatchError::TaskFailed {
                task_id,
                reason: panic_reason(payload.as_ref()),
            }),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("id", &self.id).finish_non_exhaustive()
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}
