//! Bounded fan-out/fan-in over asynchronous tasks.
//!
//! [`BoundedFanOut`] runs one task per work item with a hard cap on how many
//! are in flight at once, waits for every task to finish, and hands the
//! outcomes back in submission order. A task that returns an error, exceeds
//! its wall-clock budget, or panics produces a tagged failure for its own
//! index and nothing else; sibling tasks are never cancelled. Dropping the
//! returned future aborts whatever is still in flight, which is the only way
//! a batch stops early.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Errors rejecting a fan-out run before any task is scheduled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FanOutError {
    /// The concurrency bound was zero.
    #[error("max concurrency must be positive")]
    InvalidConcurrency,
}

/// Failure outcome recorded for a single work item.
#[derive(Debug, Error)]
pub enum TaskError<E> {
    /// The task itself returned an error.
    #[error("{0}")]
    Task(E),
    /// The task exceeded its wall-clock budget.
    #[error("task timed out after {0:?}")]
    TimedOut(Duration),
    /// The task panicked; the payload is the panic message when printable.
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Runner for one bounded fan-out pass.
#[derive(Debug, Clone, Copy)]
pub struct BoundedFanOut {
    max_concurrency: usize,
    task_timeout: Option<Duration>,
}

impl BoundedFanOut {
    /// Create a runner with the given concurrency ceiling.
    ///
    /// A bound larger than the work-item count simply means full parallelism;
    /// a bound of zero is rejected here, before anything is spawned.
    pub fn new(max_concurrency: usize) -> Result<Self, FanOutError> {
        if max_concurrency == 0 {
            return Err(FanOutError::InvalidConcurrency);
        }
        Ok(Self {
            max_concurrency,
            task_timeout: None,
        })
    }

    /// Apply a wall-clock budget to each task. `None` disables the budget.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Run `task` once per work item and collect every outcome.
    ///
    /// Tasks are spawned in input order and throttled by a shared semaphore;
    /// completion order is unconstrained, but the returned vector is indexed
    /// by original position, so `results[i]` always belongs to `items[i]`.
    /// Returns only after every item has either a success or a failure.
    pub async fn run<W, R, E, F, Fut>(&self, items: Vec<W>, task: F) -> Vec<Result<R, TaskError<E>>>
    where
        W: Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        F: Fn(usize, W) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let total = items.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let task_timeout = self.task_timeout;
        let mut join_set = JoinSet::new();
        let mut task_index: HashMap<tokio::task::Id, usize> = HashMap::with_capacity(total);

        for (index, item) in items.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let task = task.clone();
            let handle = join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("fan-out semaphore closed while tasks were pending");
                match task_timeout {
                    Some(limit) => match tokio::time::timeout(limit, task(index, item)).await {
                        Ok(result) => result.map_err(TaskError::Task),
                        Err(_) => Err(TaskError::TimedOut(limit)),
                    },
                    None => task(index, item).await.map_err(TaskError::Task),
                }
            });
            task_index.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<Result<R, TaskError<E>>>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    let index = task_index[&id];
                    slots[index] = Some(outcome);
                }
                Err(join_error) => {
                    let index = task_index[&join_error.id()];
                    slots[index] = Some(Err(TaskError::Panicked(panic_message(join_error))));
                }
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.expect("fan-out drained with an unfilled result slot"))
            .collect()
    }
}

fn panic_message(join_error: tokio::task::JoinError) -> String {
    if !join_error.is_panic() {
        return join_error.to_string();
    }
    let payload = join_error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
