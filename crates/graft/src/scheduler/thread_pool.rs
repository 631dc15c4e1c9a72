// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use crate::{ERR_POISONED_LOCK, Scheduler, WorkItem};

/// A fixed-size pool of worker threads draining a shared FIFO queue.
///
/// Work accepted while the pool is alive is guaranteed to run. Dropping the
/// pool signals shutdown, but every worker keeps draining until the queue is
/// empty - including work enqueued by work that is still draining - and the
/// drop then joins every worker. By the time `drop` returns, no pool thread
/// is left running.
pub struct ThreadPoolScheduler {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

struct PoolShared {
    queue: Mutex<PoolQueue>,
    work_available: Condvar,
}

struct PoolQueue {
    items: VecDeque<WorkItem>,
    is_running: bool,
}

impl ThreadPoolScheduler {
    /// Creates a pool with one worker per available CPU.
    #[must_use]
    pub fn new() -> Self {
        let worker_count = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::with_workers(worker_count)
    }

    /// Creates a pool with exactly `worker_count` workers.
    ///
    /// # Panics
    ///
    /// Panics if `worker_count` is zero.
    #[must_use]
    pub fn with_workers(worker_count: usize) -> Self {
        assert!(worker_count > 0, "a thread pool needs at least one worker");

        let shared = Arc::new(PoolShared {
            queue: Mutex::new(PoolQueue {
                items: VecDeque::new(),
                is_running: true,
            }),
            work_available: Condvar::new(),
        });

        let workers = (0..worker_count)
            .map(|index| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("graft-worker-{index}"))
                    .spawn(move || worker_routine(&shared))
                    .expect("failed to spawn a pool worker thread")
            })
            .collect();

        debug!(worker_count, "thread pool started");

        Self { shared, workers }
    }
}

impl Default for ThreadPoolScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ThreadPoolScheduler {
    fn schedule(&self, work: WorkItem) {
        {
            let mut queue = self.shared.queue.lock().expect(ERR_POISONED_LOCK);
            queue.items.push_back(work);
            trace!(backlog = queue.items.len(), "work queued on thread pool");
        }

        self.shared.work_available.notify_one();
    }
}

impl Drop for ThreadPoolScheduler {
    fn drop(&mut self) {
        {
            let mut queue = self.shared.queue.lock().expect(ERR_POISONED_LOCK);
            queue.is_running = false;
        }
        self.shared.work_available.notify_all();

        for worker in self.workers.drain(..) {
            // A worker only ends with an Err if work it ran panicked; there is
            // nothing useful to add by panicking again during drop.
            _ = worker.join();
        }

        debug!("thread pool shut down");
    }
}

impl fmt::Debug for ThreadPoolScheduler {
    #[cfg_attr(test, mutants::skip)] // We have no contract to test here - can return anything.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPoolScheduler")
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

/// Worker loop: pop under the lock, run outside it. Exits only once shutdown
/// has been signalled *and* the queue is empty, so pending work always runs.
fn worker_routine(shared: &PoolShared) {
    loop {
        let work = {
            let queue = shared.queue.lock().expect(ERR_POISONED_LOCK);
            let mut queue = shared
                .work_available
                .wait_while(queue, |q| q.items.is_empty() && q.is_running)
                .expect(ERR_POISONED_LOCK);

            match queue.items.pop_front() {
                Some(work) => work,
                None => break, // Shut down and drained.
            }
        };

        work();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, mpsc};

    use graft_testing::{TEST_TIMEOUT, execute_or_abandon};

    use super::*;

    #[test]
    fn executes_submitted_work() {
        let pool = ThreadPoolScheduler::with_workers(1);
        let (tx, rx) = mpsc::channel();

        pool.schedule(Box::new(move || tx.send("ran").unwrap()));

        assert_eq!(rx.recv_timeout(TEST_TIMEOUT).unwrap(), "ran");
    }

    #[test]
    #[should_panic(expected = "at least one worker")]
    fn zero_workers_panics() {
        drop(ThreadPoolScheduler::with_workers(0));
    }

    #[test]
    fn drop_drains_pending_work_before_returning() {
        // Whatever is still queued at drop time must run; drop joins the
        // workers, so by the time it returns the counter is final.
        let executed = Arc::new(AtomicUsize::new(0));

        let pool = ThreadPoolScheduler::with_workers(1);
        for _ in 0..10 {
            let executed = Arc::clone(&executed);
            pool.schedule(Box::new(move || {
                executed.fetch_add(1, Ordering::AcqRel);
            }));
        }
        drop(pool);

        assert_eq!(executed.load(Ordering::Acquire), 10);
    }

    #[test]
    fn work_may_schedule_more_work() {
        let pool = Arc::new(ThreadPoolScheduler::with_workers(1));
        let (tx, rx) = mpsc::channel();

        pool.schedule({
            let pool = Arc::clone(&pool);
            Box::new(move || {
                pool.schedule(Box::new(move || tx.send("nested").unwrap()));
            })
        });

        assert_eq!(rx.recv_timeout(TEST_TIMEOUT).unwrap(), "nested");
    }

    #[test]
    fn workers_run_in_parallel() {
        // Two work items meet at a barrier; this only terminates if the pool
        // genuinely runs them on two threads at once.
        let completed = execute_or_abandon(|| {
            let pool = ThreadPoolScheduler::with_workers(2);
            let rendezvous = Arc::new(Barrier::new(2));
            let (tx, rx) = mpsc::channel();

            for _ in 0..2 {
                let rendezvous = Arc::clone(&rendezvous);
                let tx = tx.clone();
                pool.schedule(Box::new(move || {
                    rendezvous.wait();
                    tx.send(()).unwrap();
                }));
            }

            rx.recv_timeout(TEST_TIMEOUT).unwrap();
            rx.recv_timeout(TEST_TIMEOUT).unwrap();
        });

        assert!(completed.is_some());
    }
}
