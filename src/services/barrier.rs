//! Completion barrier for submitted batch tasks
//!
//! Owns the registry of outstanding tasks. Work enters only through `submit`
//! and is awaited only through `join_all`. Every task publishes its outcome
//! on its own completion channel, so any number of joiners can wait on the
//! same task and each sees its result.
//!
//! `join_all` is a snapshot barrier: it waits for the tasks registered when
//! it is called and reports failures of those tasks only. Tasks submitted
//! while it is waiting are left for the next join. Successful tasks are
//! pruned on submit; failed ones stay registered until a join collects them.

use crate::error::{Error, Result};
use crate::services::worker_pool::WorkerPool;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// How a submitted task ended
#[derive(Debug, Clone)]
enum Outcome {
    Completed,
    Failed(Arc<Error>),
    Panicked(String),
    Cancelled,
}

struct Registered {
    id: u64,
    abort: AbortHandle,
    done: watch::Receiver<Option<Outcome>>,
}

impl Registered {
    fn completed_ok(&self) -> bool {
        matches!(*self.done.borrow(), Some(Outcome::Completed))
    }

    fn is_finished(&self) -> bool {
        self.done.borrow().is_some()
    }
}

#[derive(Clone, Default)]
pub struct CompletionBarrier {
    tasks: Arc<Mutex<Vec<Registered>>>,
    next_id: Arc<AtomicU64>,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` on `pool` and register it with the barrier
    pub fn submit<F>(&self, pool: &WorkerPool, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let (done_tx, done_rx) = watch::channel(None);

        let worker_pool = pool.clone();
        let worker = tokio::spawn(async move {
            let _permit = worker_pool.acquire().await?;
            task.await
        });
        let abort = worker.abort_handle();

        let pool_name = pool.name();
        tokio::spawn(async move {
            let outcome = match worker.await {
                Ok(Ok(())) => Outcome::Completed,
                Ok(Err(e)) => {
                    warn!(pool = %pool_name, error = %e, "task_failed");
                    Outcome::Failed(Arc::new(e))
                }
                Err(e) if e.is_cancelled() => Outcome::Cancelled,
                Err(e) => {
                    warn!(pool = %pool_name, error = %e, "task_panicked");
                    Outcome::Panicked(e.to_string())
                }
            };
            let _ = done_tx.send(Some(outcome));
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.completed_ok());
        tasks.push(Registered { id, abort, done: done_rx });
    }

    /// Tasks registered and not yet finished
    pub fn pending(&self) -> usize {
        self.tasks.lock().iter().filter(|t| !t.is_finished()).count()
    }

    /// Wait for every currently registered task.
    ///
    /// Returns the number of tasks waited on. Failures of those tasks are
    /// aggregated into `Error::TasksFailed`; if every failure is a
    /// cancellation the result is `Error::Interrupted`.
    pub async fn join_all(&self) -> Result<usize> {
        let snapshot: Vec<(u64, watch::Receiver<Option<Outcome>>)> =
            self.tasks.lock().iter().map(|t| (t.id, t.done.clone())).collect();
        let count = snapshot.len();
        debug!(tasks = %count, "barrier_join_started");

        let mut failures = Vec::new();
        let mut cancelled = 0;
        for (_, mut done) in snapshot.iter().cloned() {
            // A dropped sender means the supervising task never reported
            let outcome = done.wait_for(Option::is_some).await.ok().and_then(|o| o.clone());
            match outcome {
                Some(Outcome::Completed) => {}
                Some(Outcome::Failed(e)) => failures.push(Error::Shared(e)),
                Some(Outcome::Panicked(msg)) => failures.push(Error::TaskPanicked(msg)),
                Some(Outcome::Cancelled) | None => {
                    cancelled += 1;
                    failures.push(Error::Interrupted);
                }
            }
        }

        // Collected; later joins no longer see these
        self.tasks.lock().retain(|t| !snapshot.iter().any(|(id, _)| *id == t.id));

        if failures.is_empty() {
            debug!(tasks = %count, "barrier_join_completed");
            Ok(count)
        } else if cancelled == failures.len() {
            Err(Error::Interrupted)
        } else {
            Err(Error::TasksFailed(failures))
        }
    }

    #[cfg(test)]
    pub(crate) fn abort_all(&self) {
        for task in self.tasks.lock().iter() {
            task.abort.abort();
        }
    }
}
