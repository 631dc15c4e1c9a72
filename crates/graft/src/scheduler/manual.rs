// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use tracing::{debug, warn};

use crate::{ERR_POISONED_LOCK, Error, Scheduler, WorkItem};

/// A scheduler drained by a thread the caller provides.
///
/// Work accumulates in a FIFO queue until some thread calls
/// [`run`](Self::run), which executes items in that thread until
/// [`stop`](Self::stop) is called. Work that is already queued when `stop`
/// arrives - including work enqueued by draining work - still runs before
/// `run` returns.
///
/// `run` re-arms the scheduler on entry, so a stopped scheduler can be driven
/// again by a later call.
pub struct ManualScheduler {
    state: Mutex<ManualState>,
    work_available: Condvar,
    /// A drain loop has a single driver at a time; `run` is not reentrant.
    is_draining: AtomicBool,
}

struct ManualState {
    items: VecDeque<WorkItem>,
    is_running: bool,
    /// Set by `stop`, cleared when the next `run` re-arms. Lets `schedule`
    /// tell "queued before the first run" apart from "queued after a stop".
    was_stopped: bool,
}

impl ManualScheduler {
    /// Creates a scheduler with an empty queue and no driver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                items: VecDeque::new(),
                is_running: false,
                was_stopped: false,
            }),
            work_available: Condvar::new(),
            is_draining: AtomicBool::new(false),
        }
    }

    /// Drains the queue in the calling thread until [`stop`](Self::stop) is
    /// called *and* the queue is empty.
    ///
    /// Blocks while the queue is empty, waiting for more work or for `stop`.
    /// Work may call `schedule` and `stop` on this scheduler freely.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyDriving`] if another thread is inside `run` right now.
    pub fn run(&self) -> crate::Result<()> {
        if self.is_draining.swap(true, Ordering::Acquire) {
            return Err(Error::AlreadyDriving);
        }

        debug!("manual drain started");

        {
            let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
            state.is_running = true;
            state.was_stopped = false;
        }

        loop {
            let work = {
                let state = self.state.lock().expect(ERR_POISONED_LOCK);
                let mut state = self
                    .work_available
                    .wait_while(state, |s| s.items.is_empty() && s.is_running)
                    .expect(ERR_POISONED_LOCK);

                match state.items.pop_front() {
                    Some(work) => work,
                    None => break, // Stopped and drained.
                }
            };

            work();
        }

        debug!("manual drain finished");

        self.is_draining.store(false, Ordering::Release);
        Ok(())
    }

    /// Asks [`run`](Self::run) to return once the queue is drained.
    ///
    /// Idempotent, and safe to call from inside work executing on the drain
    /// thread - that is how a task graph running on this scheduler usually
    /// ends the loop.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
            state.is_running = false;
            state.was_stopped = true;
        }
        self.work_available.notify_all();
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, work: WorkItem) {
        {
            let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

            if state.was_stopped {
                // Tolerated, but the work sits there until somebody drives
                // the scheduler again.
                warn!("work scheduled after stop; it stays queued until the next run()");
            }

            state.items.push_back(work);
        }

        self.work_available.notify_one();
    }
}

impl fmt::Debug for ManualScheduler {
    #[cfg_attr(test, mutants::skip)] // We have no contract to test here - can return anything.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("is_draining", &self.is_draining.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
