//! A small pending/data/error holder for UI-driven operations.
//!
//! A [`Task`] wraps one kind of operation (a contribution, a reveal) and
//! records the outcome of its latest run. Only one run may be in flight at a
//! time; a second trigger while pending is refused, which is how a caller
//! gets exactly-once submission per user action.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use crate::error::{CookieJarError, Result};

/// State of a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState<T> {
    Idle,
    InFlight,
    Succeeded(T),
    /// Display form of the error.
    Failed(String),
}

/// Tracks the latest run of an operation.
#[derive(Debug)]
pub struct Task<T> {
    state: Mutex<TaskState<T>>,
}

impl<T> Default for Task<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(TaskState::Idle),
        }
    }
}

impl<T: Clone> Task<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TaskState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> TaskState<T> {
        self.lock().clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.lock(), TaskState::InFlight)
    }

    /// Value of the last successful run, if the last run succeeded.
    pub fn data(&self) -> Option<T> {
        match &*self.lock() {
            TaskState::Succeeded(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Error of the last run, if it failed.
    pub fn error(&self) -> Option<String> {
        match &*self.lock() {
            TaskState::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Run `op`, recording its outcome.
    ///
    /// Refused while another run is in flight.
    pub async fn trigger<F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.begin(|state| !matches!(state, TaskState::InFlight), "task already in flight")?;
        self.run(op).await
    }

    /// Run `op` again after a failure.
    ///
    /// Only legal when the last run failed.
    pub async fn retry<F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.begin(
            |state| matches!(state, TaskState::Failed(_)),
            "only a failed task can be retried",
        )?;
        self.run(op).await
    }

    /// Forget the last outcome.
    pub fn reset(&self) {
        let mut state = self.lock();
        if !matches!(*state, TaskState::InFlight) {
            *state = TaskState::Idle;
        }
    }

    fn begin(&self, allowed: impl FnOnce(&TaskState<T>) -> bool, refusal: &str) -> Result<()> {
        let mut state = self.lock();
        if !allowed(&*state) {
            return Err(CookieJarError::Precondition(refusal.to_string()));
        }
        *state = TaskState::InFlight;
        Ok(())
    }

    async fn run<F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let mut guard = InFlight {
            task: self,
            settled: false,
        };
        let outcome = op.await;

        *self.lock() = match &outcome {
            Ok(value) => TaskState::Succeeded(value.clone()),
            Err(e) => TaskState::Failed(e.to_string()),
        };
        guard.settled = true;
        outcome
    }
}

// Returns an abandoned run to Idle so the task can be triggered again.
struct InFlight<'a, T> {
    task: &'a Task<T>,
    settled: bool,
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            *self.task.state.lock().unwrap_or_else(|e| e.into_inner()) = TaskState::Idle;
        }
    }
}
