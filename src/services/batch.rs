//! Batch coordinator - accumulates users pending reward computation
//!
//! Users land in a single lock-protected pending set. A flush swaps that set
//! for an empty one, so users enqueued while a flush is splitting the
//! snapshot go to the next flush. The snapshot is cut into chunks of at most
//! `chunk_size` users, and each chunk becomes one task on the reward pool,
//! registered with the completion barrier. Flushing never waits for the
//! tasks.

use crate::domain::user::User;
use crate::error::{Error, Result};
use crate::infra::metrics::Metrics;
use crate::services::barrier::CompletionBarrier;
use crate::services::rewards::RewardEngine;
use crate::services::worker_pool::WorkerPool;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Split `items` into consecutive chunks of at most `size` elements
pub fn split_into_chunks<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}

pub struct BatchCoordinator {
    pending: Mutex<Vec<Arc<User>>>,
    chunk_size: usize,
    engine: Arc<RewardEngine>,
    pool: WorkerPool,
    barrier: CompletionBarrier,
    metrics: Arc<Metrics>,
}

impl BatchCoordinator {
    pub fn new(
        engine: Arc<RewardEngine>,
        pool: WorkerPool,
        chunk_size: usize,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            chunk_size: chunk_size.max(1),
            engine,
            pool,
            barrier: CompletionBarrier::new(),
            metrics,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Users waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Batch tasks submitted and not yet finished
    pub fn outstanding_tasks(&self) -> usize {
        self.barrier.pending()
    }

    /// Add a user and flush immediately
    pub fn enqueue(&self, user: Arc<User>) -> usize {
        self.defer(user);
        self.flush()
    }

    /// Add a user without flushing
    pub fn defer(&self, user: Arc<User>) {
        self.pending.lock().push(user);
    }

    /// Add many users and flush once
    pub fn enqueue_all<I>(&self, users: I) -> usize
    where
        I: IntoIterator<Item = Arc<User>>,
    {
        self.pending.lock().extend(users);
        self.flush()
    }

    /// Drain the pending set and submit one task per chunk.
    /// Returns the number of chunks submitted.
    pub fn flush(&self) -> usize {
        let drained = std::mem::take(&mut *self.pending.lock());
        if drained.is_empty() {
            return 0;
        }

        let users = drained.len();
        let chunks = split_into_chunks(drained, self.chunk_size);
        let submitted = chunks.len();
        for chunk in chunks {
            self.metrics.record_batch_submitted(chunk.len());
            let engine = self.engine.clone();
            self.barrier.submit(&self.pool, process_chunk(engine, chunk));
        }

        debug!(users = %users, chunks = %submitted, chunk_size = %self.chunk_size, "batch_flushed");
        submitted
    }

    /// Wait for every batch task submitted so far
    pub async fn join_all(&self) -> Result<usize> {
        self.barrier.join_all().await
    }
}

/// Run the reward engine over each user of a chunk in turn.
///
/// A failing user does not stop the rest of the chunk; the chunk fails if
/// any user failed.
async fn process_chunk(engine: Arc<RewardEngine>, chunk: Vec<Arc<User>>) -> Result<()> {
    let mut failures = Vec::new();
    for user in &chunk {
        if let Err(e) = engine.calculate_rewards(user).await {
            warn!(user = %user.user_name(), error = %e, "reward_pass_failed");
            failures.push(e);
        }
    }

    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0)),
        _ => Err(Error::TasksFailed(failures)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Location, VisitedLocation};
    use crate::infra::Config;
    use crate::testutil::{attraction_north_of, test_user, ConstantOracle, FixedGps};
    use chrono::Utc;

    const HOME: Location = Location { latitude: 35.0, longitude: -90.0 };

    fn coordinator(chunk_size: usize, oracle: Arc<ConstantOracle>) -> (BatchCoordinator, Arc<Metrics>) {
        let catalog = vec![attraction_north_of("Park", HOME, 1.0)];
        let gps = Arc::new(FixedGps::new(HOME, catalog));
        let metrics = Arc::new(Metrics::new());
        let engine = Arc::new(RewardEngine::new(&Config::default(), gps, oracle, metrics.clone()));
        let pool = WorkerPool::new("rewards", 8);
        (BatchCoordinator::new(engine, pool, chunk_size, metrics.clone()), metrics)
    }

    fn visited_user(name: &str) -> Arc<User> {
        let user = test_user(name);
        user.add_visited_location(VisitedLocation::new(user.id(), HOME, Utc::now()));
        user
    }

    #[test]
    fn test_split_450_by_200() {
        let chunks = split_into_chunks((0..450).collect::<Vec<_>>(), 200);
        let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![200, 200, 50]);
    }

    #[test]
    fn test_split_preserves_order_and_count() {
        for (len, size) in [(0, 3), (1, 3), (3, 3), (7, 3), (10, 1), (5, 100)] {
            let items: Vec<usize> = (0..len).collect();
            let chunks = split_into_chunks(items.clone(), size);
            assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size));
            let rejoined: Vec<usize> = chunks.into_iter().flatten().collect();
            assert_eq!(rejoined, items);
        }
    }

    #[tokio::test]
    async fn test_enqueue_all_submits_chunks() {
        let oracle = Arc::new(ConstantOracle::new(100));
        let (coordinator, metrics) = coordinator(200, oracle.clone());
        let users: Vec<_> = (0..450).map(|i| visited_user(&format!("user{i}"))).collect();

        assert_eq!(coordinator.enqueue_all(users.clone()), 3);
        assert_eq!(coordinator.pending_len(), 0);
        assert_eq!(coordinator.outstanding_tasks(), 3);
        assert_eq!(coordinator.join_all().await.unwrap(), 3);
        assert_eq!(coordinator.outstanding_tasks(), 0);

        assert_eq!(metrics.batches_submitted(), 3);
        assert_eq!(metrics.users_batched(), 450);
        assert!(users.iter().all(|u| u.reward_count() == 1));
        assert_eq!(oracle.calls(), 450);
    }

    #[tokio::test]
    async fn test_deferred_users_wait_for_flush() {
        let (coordinator, _) = coordinator(2, Arc::new(ConstantOracle::new(1)));
        let a = visited_user("a");
        let b = visited_user("b");
        let c = visited_user("c");

        coordinator.defer(a.clone());
        coordinator.defer(b.clone());
        assert_eq!(coordinator.pending_len(), 2);
        assert_eq!(a.reward_count(), 0);

        assert_eq!(coordinator.enqueue(c.clone()), 2);
        coordinator.join_all().await.unwrap();
        assert!([a, b, c].iter().all(|u| u.reward_count() == 1));
    }

    #[tokio::test]
    async fn test_flush_of_empty_set_is_noop() {
        let (coordinator, metrics) = coordinator(10, Arc::new(ConstantOracle::new(1)));
        assert_eq!(coordinator.flush(), 0);
        assert_eq!(coordinator.join_all().await.unwrap(), 0);
        assert_eq!(metrics.batches_submitted(), 0);
    }

    #[tokio::test]
    async fn test_failing_user_does_not_block_chunk() {
        let far = Location::new(-20.0, 40.0);
        let park = attraction_north_of("Park", HOME, 1.0);
        let pier = attraction_north_of("Pier", far, 1.0);
        let oracle = Arc::new(ConstantOracle::new(1));
        oracle.fail_for(pier.id);

        let gps = Arc::new(FixedGps::new(HOME, vec![park, pier]));
        let metrics = Arc::new(Metrics::new());
        let engine = Arc::new(RewardEngine::new(&Config::default(), gps, oracle, metrics.clone()));
        let coordinator = BatchCoordinator::new(engine, WorkerPool::new("rewards", 2), 10, metrics);

        let bad = test_user("bad");
        bad.add_visited_location(VisitedLocation::new(bad.id(), far, Utc::now()));
        let good = visited_user("good");

        assert_eq!(coordinator.enqueue_all(vec![bad.clone(), good.clone()]), 1);
        let err = coordinator.join_all().await.unwrap_err();
        assert_eq!(err.failure_count(), 1);
        assert_eq!(bad.reward_count(), 0);
        assert_eq!(good.reward_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_user_in_overlapping_chunks() {
        let oracle = Arc::new(ConstantOracle::new(5).with_delay(std::time::Duration::from_millis(2)));
        let (coordinator, _) = coordinator(1, oracle.clone());
        let user = visited_user("dup");

        coordinator.enqueue_all(vec![user.clone(); 16]);
        coordinator.join_all().await.unwrap();

        assert_eq!(user.reward_count(), 1);
        assert_eq!(oracle.calls(), 1);
    }
}
