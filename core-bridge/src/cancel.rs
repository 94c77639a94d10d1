//! Cancellation registry.
//!
//! Holds the task ids that may still be canceled. Presence means "still
//! running"; absence means canceled, finished or never registered, and
//! handlers polling [`CancellationRegistry::is_canceled`] must stop in every
//! one of those cases. Cancellation never interrupts a running task.

use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct CancellationRegistry {
    tasks: Mutex<HashSet<String>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a task as running and cancelable.
    pub fn register_cancelable(&self, task_id: &str) {
        let inserted = self.tasks.lock().insert(task_id.to_string());
        if !inserted {
            debug!(task_id, "Task already registered as cancelable");
        }
    }

    /// Cancels one task, or every task when `task_id` is `None`.
    ///
    /// Returns how many ids were removed.
    pub fn cancel(&self, task_id: Option<&str>) -> usize {
        let mut tasks = self.tasks.lock();
        match task_id {
            Some(id) => usize::from(tasks.remove(id)),
            None => {
                let count = tasks.len();
                tasks.clear();
                count
            }
        }
    }

    pub fn is_canceled(&self, task_id: &str) -> bool {
        !self.tasks.lock().contains(task_id)
    }

    /// Drops a task that finished on its own.
    pub fn complete(&self, task_id: &str) {
        self.tasks.lock().remove(task_id);
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}
