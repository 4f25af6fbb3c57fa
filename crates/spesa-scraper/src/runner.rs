//! Bounded-concurrency task runner with per-task retry.
//!
//! Every task is keyed by a unique id. Tasks run through
//! `buffer_unordered`, so outcomes arrive in completion order; a task that
//! exhausts its retries becomes [`TaskOutcome::Failed`] and the batch keeps
//! going.
//!
//! Clones of a runner share one permit pool, so a batch started from inside
//! another batch's task still counts against the same concurrency limit.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use spesa_core::AppConfig;
use tokio::sync::Semaphore;

use crate::error::ScraperError;
use crate::retry::RetryPolicy;

/// Default number of tasks in flight.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default wall-clock limit for one attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug)]
pub enum TaskOutcome<K, T> {
    Completed { id: K, value: T, attempts: u32 },
    Failed { id: K, attempts: u32, error: ScraperError },
}

impl<K, T> TaskOutcome<K, T> {
    #[must_use]
    pub fn id(&self) -> &K {
        match self {
            TaskOutcome::Completed { id, .. } | TaskOutcome::Failed { id, .. } => id,
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            TaskOutcome::Completed { attempts, .. } | TaskOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Last error of a task that ran out of attempts.
#[derive(Debug)]
pub struct TaskFailure {
    pub attempts: u32,
    pub error: ScraperError,
}

/// Batch results grouped by task id.
#[derive(Debug)]
pub struct TaskReport<K, T> {
    pub completed: BTreeMap<K, T>,
    pub failed: BTreeMap<K, TaskFailure>,
}

impl<K: Ord, T> Default for TaskReport<K, T> {
    fn default() -> Self {
        Self {
            completed: BTreeMap::new(),
            failed: BTreeMap::new(),
        }
    }
}

impl<K: Ord, T> TaskReport<K, T> {
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

impl<K: Ord, T> FromIterator<TaskOutcome<K, T>> for TaskReport<K, T> {
    fn from_iter<I: IntoIterator<Item = TaskOutcome<K, T>>>(iter: I) -> Self {
        let mut report = Self::default();
        for outcome in iter {
            match outcome {
                TaskOutcome::Completed { id, value, .. } => {
                    report.completed.insert(id, value);
                }
                TaskOutcome::Failed {
                    id,
                    attempts,
                    error,
                } => {
                    report.failed.insert(id, TaskFailure { attempts, error });
                }
            }
        }
        report
    }
}

#[derive(Debug, Clone)]
pub struct TaskRunner {
    concurrency: usize,
    policy: RetryPolicy,
    attempt_timeout: Option<Duration>,
    permits: Arc<Semaphore>,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new(
            DEFAULT_CONCURRENCY,
            RetryPolicy::default(),
            Some(DEFAULT_ATTEMPT_TIMEOUT),
        )
    }
}

impl TaskRunner {
    /// `concurrency` is raised to at least 1.
    #[must_use]
    pub fn new(concurrency: usize, policy: RetryPolicy, attempt_timeout: Option<Duration>) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            concurrency,
            policy,
            attempt_timeout,
            permits: Arc::new(Semaphore::new(concurrency)),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.max_concurrency,
            RetryPolicy::from_config(config),
            Some(Duration::from_secs(config.task_timeout_secs)),
        )
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[must_use]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Runs a single operation under the runner's policy and deadline.
    ///
    /// Holds one permit of the shared pool for the whole operation, retries
    /// included. Waiting for the permit does not count against the deadline.
    pub async fn attempt<T, F, Fut>(&self, op: F) -> (Result<T, ScraperError>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        // Errors only on a closed semaphore; this one is never closed.
        let _permit = self.permits.acquire().await.ok();
        self.policy.run(self.attempt_timeout, op).await
    }

    /// Runs `op` once per task id, retrying each under the runner's policy.
    ///
    /// `op` is called afresh for every attempt. Outcomes are returned in
    /// completion order.
    pub async fn run<K, T, F, Fut>(
        &self,
        tasks: impl IntoIterator<Item = K>,
        op: F,
    ) -> Vec<TaskOutcome<K, T>>
    where
        K: fmt::Debug,
        F: Fn(&K) -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        let op = &op;
        stream::iter(tasks)
            .map(|id| async move {
                let (result, attempts) = self.attempt(|| op(&id)).await;
                match result {
                    Ok(value) => TaskOutcome::Completed {
                        id,
                        value,
                        attempts,
                    },
                    Err(error) => {
                        tracing::warn!(
                            task = ?id,
                            attempts,
                            error = %error,
                            "task failed after retries"
                        );
                        TaskOutcome::Failed {
                            id,
                            attempts,
                            error,
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    /// [`TaskRunner::run`], grouped into a [`TaskReport`].
    pub async fn run_report<K, T, F, Fut>(
        &self,
        tasks: impl IntoIterator<Item = K>,
        op: F,
    ) -> TaskReport<K, T>
    where
        K: fmt::Debug + Ord,
        F: Fn(&K) -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        self.run(tasks, op).await.into_iter().collect()
    }
}
