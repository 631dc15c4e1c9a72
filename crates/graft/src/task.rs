// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Task handles and the dependency graph behind them.

use std::fmt;
use std::sync::Arc;

use crate::{OnceFuture, Scheduler};

mod builder;
mod core;
mod set;

pub use builder::*;
pub use set::*;

pub(crate) use self::core::TaskCore;

/// A shared handle to a deferred computation producing one value of type `T`.
///
/// Handles are cheap to clone and all clones refer to the same underlying
/// task. The task itself lives on the heap, co-owned by its handles, by the
/// readiness callbacks parked on its parents and by the scheduler queue while
/// its body is in flight - so a task keeps its schedule even if the caller
/// drops every handle.
///
/// A default-constructed handle is an empty sentinel: only
/// [`valid`](Self::valid) may be called on it.
pub struct Task<T> {
    core: Option<Arc<TaskCore<T>>>,
}

impl<T> Task<T> {
    pub(crate) fn from_core(core: Arc<TaskCore<T>>) -> Self {
        Self { core: Some(core) }
    }

    fn core(&self) -> &Arc<TaskCore<T>> {
        self.core
            .as_ref()
            .expect("this operation needs a real task, but the handle is the empty sentinel")
    }

    /// Whether this handle refers to a task at all.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.core.is_some()
    }

    /// The future carrying this task's result.
    ///
    /// # Panics
    ///
    /// Panics on an empty handle.
    #[must_use]
    pub fn future(&self) -> &OnceFuture<T> {
        self.core().future()
    }

    /// The scheduler this task submits its body to.
    ///
    /// # Panics
    ///
    /// Panics on an empty handle.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        self.core().scheduler()
    }

    /// The diagnostic label. Empty unless [`set_name`](Self::set_name) or
    /// [`TaskBuilder::named`] assigned one.
    ///
    /// # Panics
    ///
    /// Panics on an empty handle.
    #[must_use]
    pub fn name(&self) -> String {
        self.core().name()
    }

    /// Replaces the diagnostic label.
    ///
    /// # Panics
    ///
    /// Panics on an empty handle.
    pub fn set_name(&self, name: impl Into<String>) {
        self.core().set_name(name.into());
    }
}

impl<T: Send + Sync + 'static> Task<T> {
    /// Submits the task's body to its scheduler.
    ///
    /// Root tasks (built with [`TaskBuilder::build`]) wait for this call.
    /// Dependent tasks start themselves when their last parent publishes, so
    /// calling `start` on one is a double start.
    ///
    /// # Panics
    ///
    /// Panics if the task has already been started, and on an empty handle.
    pub fn start(&self) {
        Arc::clone(self.core()).start();
    }

    /// Builds a task that runs `body` once this task has published, on this
    /// task's scheduler, receiving this handle as its argument.
    pub fn then<U, F>(&self, body: F) -> Task<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(Task<T>) -> U + Send + 'static,
    {
        self.then_on(self.scheduler(), body)
    }

    /// Like [`then`](Self::then), with an explicit scheduler for the new task.
    pub fn then_on<U, F>(&self, scheduler: &Arc<dyn Scheduler>, body: F) -> Task<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(Task<T>) -> U + Send + 'static,
    {
        TaskBuilder::new().on(scheduler).after(self.clone(), body)
    }
}

impl<U> Task<Task<U>>
where
    U: Clone + Send + Sync + 'static,
{
    /// Collapses a task-of-task into a task for the inner value.
    ///
    /// The returned proxy has no body of its own: when this (outer) task
    /// publishes the inner handle, the proxy subscribes to the inner future
    /// and republishes a clone of its value. The proxy records this task's
    /// scheduler, but nothing is ever submitted on the proxy's behalf.
    ///
    /// The wiring keeps the inner task alive until its value has been relayed,
    /// even if every other reference to it is gone by then.
    #[must_use]
    pub fn flatten(&self) -> Task<U> {
        self.flatten_on(self.scheduler())
    }

    /// Like [`flatten`](Self::flatten), with an explicit scheduler recorded on
    /// the proxy.
    #[must_use]
    pub fn flatten_on(&self, scheduler: &Arc<dyn Scheduler>) -> Task<U> {
        let proxy = Arc::new(TaskCore::new_proxy(Arc::clone(scheduler), String::new()));

        self.future().on_ready({
            let proxy = Arc::clone(&proxy);
            move |inner: &Task<U>| {
                let anchor = inner.clone();
                inner.future().on_ready(move |value: &U| {
                    proxy.future().set(value.clone());
                    // Until this fired, the anchor kept the inner task alive.
                    drop(anchor);
                });
            }
        });

        Task::from_core(proxy)
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.as_ref().map(Arc::clone),
        }
    }
}

impl<T> Default for Task<T> {
    /// The empty sentinel handle.
    fn default() -> Self {
        Self { core: None }
    }
}

impl<T> fmt::Debug for Task<T> {
    #[cfg_attr(test, mutants::skip)] // We have no contract to test here - can return anything.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.core {
            Some(core) => f
                .debug_struct("Task")
                .field("name", &core.name())
                .field("is_ready", &core.future().is_ready())
                .finish_non_exhaustive(),
            None => f.write_str("Task(empty)"),
        }
    }
}
