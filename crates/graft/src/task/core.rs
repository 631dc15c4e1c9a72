// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::{ERR_POISONED_LOCK, OnceFuture, Scheduler};

pub(crate) type Body<T> = Box<dyn FnOnce() -> T + Send>;

/// The heap node behind a [`Task`](crate::Task) handle.
///
/// Ownership is shared: user-facing handles, the readiness callbacks parked on
/// parent futures and the closure sitting in a scheduler queue all hold an
/// `Arc` to the same node, so the node lives until the last of them lets go.
pub(crate) struct TaskCore<T> {
    future: OnceFuture<T>,
    /// The work closure, taken when the task runs. `None` for proxy and
    /// value-seeded nodes, whose futures are fed from elsewhere.
    body: Mutex<Option<Body<T>>>,
    scheduler: Arc<dyn Scheduler>,
    name: Mutex<String>,
    started: AtomicBool,
}

impl<T> TaskCore<T> {
    pub(crate) fn new(scheduler: Arc<dyn Scheduler>, name: String, body: Body<T>) -> Self {
        Self {
            future: OnceFuture::new(),
            body: Mutex::new(Some(body)),
            scheduler,
            name: Mutex::new(name),
            started: AtomicBool::new(false),
        }
    }

    /// A node whose future is fed by wiring rather than a body of its own.
    /// Born started, so a stray `start()` trips the double-start check.
    pub(crate) fn new_proxy(scheduler: Arc<dyn Scheduler>, name: String) -> Self {
        Self {
            future: OnceFuture::new(),
            body: Mutex::new(None),
            scheduler,
            name: Mutex::new(name),
            started: AtomicBool::new(true),
        }
    }

    /// A node born complete: future pre-published, no body, marked started.
    pub(crate) fn new_ready(scheduler: Arc<dyn Scheduler>, name: String, value: T) -> Self {
        Self {
            future: OnceFuture::ready(value),
            body: Mutex::new(None),
            scheduler,
            name: Mutex::new(name),
            started: AtomicBool::new(true),
        }
    }

    pub(crate) fn future(&self) -> &OnceFuture<T> {
        &self.future
    }

    pub(crate) fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub(crate) fn name(&self) -> String {
        self.name.lock().expect(ERR_POISONED_LOCK).clone()
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.name.lock().expect(ERR_POISONED_LOCK) = name;
    }
}

impl<T: Send + Sync + 'static> TaskCore<T> {
    /// Submits the body to the scheduler. The submitted closure owns this
    /// `Arc`, so the node survives the queue even if every handle is dropped
    /// in the meantime.
    ///
    /// # Panics
    ///
    /// Panics on a second call, and on proxy or value-seeded nodes (which are
    /// born started).
    pub(crate) fn start(self: Arc<Self>) {
        let was_started = self.started.swap(true, Ordering::AcqRel);
        assert!(
            !was_started,
            "task '{}' has already been started",
            self.name()
        );

        trace!(task = %self.name(), "task submitted to its scheduler");

        let scheduler = Arc::clone(&self.scheduler);
        scheduler.schedule(Box::new(move || self.run()));
    }

    /// Runs the body and publishes its result. Scheduler threads only; the
    /// double-start check guarantees at most one call per node.
    fn run(&self) {
        let body = self
            .body
            .lock()
            .expect(ERR_POISONED_LOCK)
            .take()
            .expect("a scheduled task must still have its body");

        let value = body();
        self.future.set(value);

        trace!(task = %self.name(), "task result published");
    }
}
