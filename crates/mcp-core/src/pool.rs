// crates/mcp-core/src/pool.rs
// ============================================================================
// Module: Worker Pool
// Description: Bounded FIFO task queue served by a fixed number of workers.
// Purpose: Give transports a backpressured place to hand off request work.
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

/// Worker pool configuration.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPoolConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Maximum number of queued-but-not-yet-running tasks.
    pub queue_size: usize,
    /// How long `shutdown` waits for the queue to drain before cancelling
    /// whatever remains.
    pub graceful_shutdown: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_size: 1024,
            graceful_shutdown: Duration::from_secs(5),
        }
    }
}

/// Errors returned by [`WorkerPool::submit`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolError {
    /// The queue is at `queue_size` capacity.
    #[error("worker queue is full")]
    QueueFull,
    /// The pool has begun or completed shutdown and no longer accepts work.
    #[error("worker pool is shutting down")]
    ShuttingDown,
}

struct Shared<T> {
    queue: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    accepting: AtomicBool,
    stopped: AtomicBool,
    queue_size: usize,
}

/// A bounded FIFO task queue served by a fixed pool of worker threads.
///
/// # Invariants
/// - The queue never holds more than `queue_size` tasks (I4).
/// - Every submitted task either runs or is explicitly dropped during
///   shutdown; none are silently lost while the pool is alive.
pub struct WorkerPool<T> {
    shared: Arc<Shared<T>>,
    handles: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Starts a new pool, spawning `config.workers` threads that each run
    /// `handler` for every dequeued task.
    pub fn start<F>(config: WorkerPoolConfig, handler: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::with_capacity(config.queue_size.min(256))),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            accepting: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            queue_size: config.queue_size,
        });
        let handler = Arc::new(handler);
        let handles = (0..config.workers.max(1))
            .map(|_| {
                let shared = Arc::clone(&shared);
                let handler = Arc::clone(&handler);
                thread::spawn(move || worker_loop(&shared, handler.as_ref()))
            })
            .collect();
        Self { shared, handles }
    }

    /// Enqueues `task`. Returns immediately.
    ///
    /// # Errors
    /// Returns [`PoolError::ShuttingDown`] once shutdown has begun, or
    /// [`PoolError::QueueFull`] when the queue is at `queue_size` capacity.
    pub fn submit(&self, task: T) -> Result<(), PoolError> {
        if !self.shared.accepting.load(Ordering::Acquire) {
            return Err(PoolError::ShuttingDown);
        }
        let mut queue = self.shared.queue.lock().unwrap_or_else(|poison| poison.into_inner());
        if queue.len() >= self.shared.queue_size {
            return Err(PoolError::QueueFull);
        }
        queue.push_back(task);
        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Returns the number of tasks currently queued (not yet dequeued by a
    /// worker).
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().unwrap_or_else(|poison| poison.into_inner()).len()
    }

    /// Two-phase graceful shutdown: stops accepting new work, waits up to
    /// `graceful_shutdown` for the queue to drain, then drops anything left
    /// and joins every worker thread.
    pub fn shutdown(mut self, graceful_shutdown: Duration) {
        self.shared.accepting.store(false, Ordering::Release);
        let deadline = Instant::now() + graceful_shutdown;
        loop {
            let queue = self.shared.queue.lock().unwrap_or_else(|poison| poison.into_inner());
            if queue.is_empty() || Instant::now() >= deadline {
                break;
            }
            drop(queue);
            thread::sleep(Duration::from_millis(10));
        }
        {
            let mut queue = self.shared.queue.lock().unwrap_or_else(|poison| poison.into_inner());
            queue.clear();
        }
        self.shared.stopped.store(true, Ordering::Release);
        self.shared.not_empty.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop<T>(shared: &Shared<T>, handler: &(dyn Fn(T) + Send + Sync)) {
    loop {
        let task = {
            let mut queue = shared.queue.lock().unwrap_or_else(|poison| poison.into_inner());
            loop {
                if let Some(task) = queue.pop_front() {
                    shared.not_full.notify_one();
                    break Some(task);
                }
                if shared.stopped.load(Ordering::Acquire) {
                    break None;
                }
                let (guard, _timeout) = shared
                    .not_empty
                    .wait_timeout(queue, Duration::from_millis(100))
                    .unwrap_or_else(|poison| poison.into_inner());
                queue = guard;
            }
        };
        match task {
            Some(task) => handler(task),
            None => break,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[test]
    fn submitted_tasks_run() {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);
        let pool = WorkerPool::start(WorkerPoolConfig::default(), move |task: u32| {
            sink.lock().expect("lock").push(task);
        });
        for i in 0..10 {
            pool.submit(i).expect("submit");
        }
        pool.shutdown(Duration::from_secs(2));
        let mut seen = results.lock().expect("lock").clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn queue_full_is_rejected() {
        let gate = Arc::new((Mutex::new(()), std::sync::Condvar::new()));
        let worker_gate = Arc::clone(&gate);
        let config = WorkerPoolConfig {
            workers: 1,
            queue_size: 1,
            graceful_shutdown: Duration::from_millis(50),
        };
        let pool = WorkerPool::start(config, move |_: u32| {
            let (lock, cvar) = &*worker_gate;
            let guard = lock.lock().expect("lock");
            let _ = cvar.wait_timeout(guard, Duration::from_millis(200));
        });
        // First task is immediately picked up by the lone worker and blocks
        // there; the second fills the one-slot queue; the third overflows.
        pool.submit(1).expect("first submit");
        std::thread::sleep(Duration::from_millis(20));
        pool.submit(2).expect("second submit fills queue");
        let err = pool.submit(3).unwrap_err();
        assert_eq!(err, PoolError::QueueFull);
        {
            let (lock, cvar) = &*gate;
            let _guard = lock.lock().expect("lock");
            cvar.notify_all();
        }
        pool.shutdown(Duration::from_millis(200));
    }

    #[test]
    fn submit_after_shutdown_signal_fails() {
        let pool: WorkerPool<u32> = WorkerPool::start(WorkerPoolConfig::default(), |_| {});
        let shared = Arc::clone(&pool.shared);
        shared.accepting.store(false, Ordering::Release);
        let err = pool.submit(1).unwrap_err();
        assert_eq!(err, PoolError::ShuttingDown);
        pool.shutdown(Duration::from_millis(50));
    }
}
