//! Admission-controlled task spawning.

use std::{future::Future, sync::Arc};
use tokio::{sync::Semaphore, task::JoinHandle};
use tokio_util::task::TaskTracker;

/// Spawns tasks with at most `size` of them running at once.
///
/// A permit is taken before the task is spawned and released only when the task
/// finishes, so [`WorkerPool::spawn`] blocks the caller while the pool is
/// saturated.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl WorkerPool {
    /// Creates a pool with its own task tracker.
    pub fn new(size: usize) -> Self {
        Self::with_tracker(size, TaskTracker::new())
    }

    /// Creates a pool whose tasks are registered on `tracker`.
    pub fn with_tracker(size: usize, tracker: TaskTracker) -> Self {
        Self { permits: Arc::new(Semaphore::new(size)), tracker }
    }

    /// Returns the number of tasks that could start right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Waits for a free slot, then spawns `task` onto it.
    ///
    /// Returns `None` once the pool has been closed.
    pub async fn spawn<F>(&self, task: F) -> Option<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permit = self.permits.clone().acquire_owned().await.ok()?;
        Some(self.tracker.spawn(async move {
            let output = task.await;
            drop(permit);
            output
        }))
    }

    /// Stops admitting new tasks. Running tasks are unaffected.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Waits until every task spawned through this pool's tracker has finished.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
