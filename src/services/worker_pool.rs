//! Bounded worker pool
//!
//! Tasks run on the tokio runtime but at most `size` of them make progress at
//! once: each task holds a semaphore permit for its whole lifetime. Separate
//! pools are sized independently for reward computation and location
//! tracking.

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct WorkerPool {
    name: &'static str,
    size: usize,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(name: &'static str, size: usize) -> Self {
        let size = size.max(1);
        Self { name, size, permits: Arc::new(Semaphore::new(size)) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held by a running task
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a worker slot
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.permits.clone().acquire_owned().await.map_err(|_| Error::PoolClosed(self.name))
    }

    /// Spawn a task that runs once a worker slot is free
    pub fn spawn<F, T>(&self, task: F) -> JoinHandle<Result<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.clone();
        tokio::spawn(async move {
            let _permit = pool.acquire().await?;
            task.await
        })
    }

    /// Reject new work; tasks waiting for a slot fail with `PoolClosed`
    pub fn close(&self) {
        self.permits.close();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("available", &self.available())
            .finish()
    }
}
