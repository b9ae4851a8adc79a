use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use crate::error::RoomError;

/// Default number of generation tasks allowed to run at once.
pub const MAX_WORKERS: usize = 10;

/// Bounded executor for generation tasks.
///
/// `submit` waits for a free slot, then spawns without waiting further. The
/// slot travels with the task and is released when the task ends, waking the
/// longest-waiting submitter. Never more than `capacity` tasks run at once.
#[derive(Debug)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    capacity: usize,
    tracker: TaskTracker,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            tracker: TaskTracker::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Wait for a slot, then start `task`. Fails only once the pool is closed.
    pub async fn submit<F>(&self, task: F) -> Result<(), RoomError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| RoomError::Capacity("Worker pool is shut down.".into()))?;
        self.tracker.spawn(async move {
            task.await;
            drop(slot);
        });
        Ok(())
    }

    /// Refuse new submissions. Blocked submitters fail with `Capacity`;
    /// running tasks are left to finish.
    pub fn close(&self) {
        self.slots.close();
        self.tracker.close();
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    /// Wait until every spawned task has finished. Only returns after `close`.
    pub async fn wait_idle(&self) {
        self.tracker.wait().await;
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(MAX_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn eleventh_submit_waits_for_a_slot() {
        let pool = WorkerPool::new(MAX_WORKERS);
        let gate = Arc::new(Notify::new());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..MAX_WORKERS {
            let gate = Arc::clone(&gate);
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                gate.notified().await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }
        assert_eq!(pool.in_flight(), MAX_WORKERS);

        let blocked = tokio::time::timeout(Duration::from_millis(50), pool.submit(async {})).await;
        assert!(blocked.is_err(), "11th submit should block while the pool is full");

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(5), pool.submit(async {}))
            .await
            .expect("a slot should free up")
            .unwrap();

        gate.notify_waiters();
        pool.close();
        pool.wait_idle().await;
        assert_eq!(peak.load(Ordering::SeqCst), MAX_WORKERS);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn many_tasks_never_exceed_capacity() {
        let pool = Arc::new(WorkerPool::new(3));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..30 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }
        pool.close();
        pool.wait_idle().await;
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn panicking_task_releases_its_slot() {
        let pool = WorkerPool::new(1);
        pool.submit(async { panic!("worker blew up") }).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), pool.submit(async {}))
            .await
            .expect("slot should be released after a panic")
            .unwrap();
    }

    #[tokio::test]
    async fn closed_pool_rejects_submissions() {
        let pool = WorkerPool::new(2);
        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(pool.submit(async {}).await, Err(RoomError::Capacity(_))));
        pool.wait_idle().await;
    }
}
