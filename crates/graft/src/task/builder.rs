// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::task::TaskCore;
use crate::{Scheduler, Task, TaskSet, default_scheduler};

/// Assembles a [`Task`].
///
/// The builder carries the optional pieces - a diagnostic name and an explicit
/// scheduler - and offers one terminal method per task flavour:
///
/// - [`build`](Self::build): a root task, started later via [`Task::start`];
/// - [`spawn`](Self::spawn): a root task, started immediately;
/// - [`after`](Self::after): a dependent task that starts itself once every
///   parent has published;
/// - [`ready`](Self::ready): a task born complete.
///
/// Without [`on`](Self::on), the process default scheduler is used; building
/// with neither is a programming error and panics.
#[derive(Default)]
pub struct TaskBuilder {
    name: Option<String>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl TaskBuilder {
    /// Creates a builder with no name and no explicit scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the diagnostic name for the task.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Pins the task to `scheduler` instead of the process default.
    #[must_use]
    pub fn on(mut self, scheduler: &Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(Arc::clone(scheduler));
        self
    }

    fn into_parts(self) -> (Arc<dyn Scheduler>, String) {
        let scheduler = self.scheduler.or_else(default_scheduler).expect(
            "no scheduler given and no default installed - did you forget to call set_default_scheduler()?",
        );

        (scheduler, self.name.unwrap_or_default())
    }

    /// Builds a root task that runs `body` once [`Task::start`] is called.
    pub fn build<T, F>(self, body: F) -> Task<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (scheduler, name) = self.into_parts();

        Task::from_core(Arc::new(TaskCore::new(scheduler, name, Box::new(body))))
    }

    /// Builds a root task and starts it immediately.
    pub fn spawn<T, F>(self, body: F) -> Task<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let task = self.build(body);
        task.start();
        task
    }

    /// Builds a task gated on `parents`. When the last parent publishes, the
    /// task submits itself to its scheduler; `body` then receives the parent
    /// list to pull values from.
    ///
    /// The task owns a clone of the parent handles, so every parent node
    /// outlives the body run even if the caller drops theirs. Until the last
    /// parent publishes, the readiness callbacks parked on the parents keep
    /// the task itself alive likewise - dropping the returned handle does not
    /// stop the task from running.
    ///
    /// Parents that are already complete count immediately; gating a task
    /// entirely on complete parents starts it during this call.
    ///
    /// # Panics
    ///
    /// Panics if `parents` is empty.
    pub fn after<P, T, F>(self, parents: P, body: F) -> Task<T>
    where
        P: TaskSet,
        T: Send + Sync + 'static,
        F: FnOnce(P) -> T + Send + 'static,
    {
        assert!(
            !parents.is_empty(),
            "a dependent task needs at least one parent"
        );

        let (scheduler, name) = self.into_parts();

        // The wrapped body owns the parent list: handles go in, and the user
        // body pulls the values it wants. The list is released when the body
        // closure is dropped, right after this task's own future publishes.
        let core = Arc::new(TaskCore::new(scheduler, name, {
            let parents = parents.clone();
            Box::new(move || body(parents))
        }));

        let remaining = Arc::new(AtomicUsize::new(parents.len()));

        parents.notify_each_ready({
            let core = Arc::clone(&core);
            move || {
                // The callback that brings the count to zero saw the final
                // parent publish; it alone starts the task.
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    Arc::clone(&core).start();
                }
            }
        });

        Task::from_core(core)
    }

    /// Builds a task whose future is already published with `value`. It has no
    /// body and never touches its scheduler; subscribers see it ready
    /// immediately.
    pub fn ready<T>(self, value: T) -> Task<T>
    where
        T: Send + Sync + 'static,
    {
        let (scheduler, name) = self.into_parts();

        Task::from_core(Arc::new(TaskCore::new_ready(scheduler, name, value)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    use graft_testing::TEST_TIMEOUT;

    use crate::{DeferredScheduler, InlineScheduler, MockScheduler};

    use super::*;

    fn inline() -> Arc<dyn Scheduler> {
        Arc::new(InlineScheduler)
    }

    #[test]
    fn build_does_not_touch_the_scheduler() {
        // An un-started task must not schedule anything; the mock has no
        // expectations, so any call would fail the test.
        let scheduler: Arc<dyn Scheduler> = Arc::new(MockScheduler::new());

        let task = TaskBuilder::new().on(&scheduler).build(|| 1);

        assert!(!task.future().is_ready());
    }

    #[test]
    fn start_schedules_exactly_once() {
        let mut mock = MockScheduler::new();
        mock.expect_schedule().times(1).returning(|work| work());
        let scheduler: Arc<dyn Scheduler> = Arc::new(mock);

        let task = TaskBuilder::new().on(&scheduler).build(|| 5);
        task.start();

        assert_eq!(*task.future().get(), 5);
    }

    #[test]
    fn spawn_runs_the_body() {
        let task = TaskBuilder::new().on(&inline()).spawn(|| "done");

        assert_eq!(*task.future().get(), "done");
    }

    #[test]
    #[should_panic(expected = "already been started")]
    fn double_start_panics() {
        let task = TaskBuilder::new().on(&inline()).build(|| 1);

        task.start();
        task.start();
    }

    #[test]
    fn ready_task_never_touches_its_scheduler() {
        // No expectations: the value-seeded task must not schedule anything,
        // not even when subscribed to.
        let scheduler: Arc<dyn Scheduler> = Arc::new(MockScheduler::new());

        let task = TaskBuilder::new().on(&scheduler).ready(11);
        let (tx, rx) = mpsc::channel();
        task.future().on_ready(move |value| tx.send(*value).unwrap());

        assert!(task.future().is_ready());
        assert_eq!(rx.recv_timeout(TEST_TIMEOUT).unwrap(), 11);
    }

    #[test]
    #[should_panic(expected = "already been started")]
    fn starting_a_ready_task_panics() {
        let task = TaskBuilder::new().on(&inline()).ready(1);
        task.start();
    }

    #[test]
    #[should_panic(expected = "at least one parent")]
    fn empty_parent_list_panics() {
        let task = TaskBuilder::new()
            .on(&inline())
            .after(Vec::<Task<u32>>::new(), |_| 0);

        drop(task);
    }

    #[test]
    fn dependent_waits_for_its_last_parent() {
        let deferred = Arc::new(DeferredScheduler::new());
        let scheduler: Arc<dyn Scheduler> = Arc::clone(&deferred) as Arc<dyn Scheduler>;

        let first = TaskBuilder::new().on(&scheduler).build(|| 1);
        let second = TaskBuilder::new().on(&scheduler).build(|| 2);
        first.start();
        second.start();

        let sum = TaskBuilder::new()
            .on(&scheduler)
            .after((first, second), |(a, b)| {
                a.future().get() + b.future().get()
            });

        // One parent done: the dependent must not have been submitted.
        assert!(deferred.run_next());
        assert!(!sum.future().is_ready());
        assert_eq!(deferred.pending(), 1);

        // Second parent done: its readiness callback submits the dependent.
        assert!(deferred.run_next());
        assert_eq!(deferred.pending(), 1);
        assert!(!sum.future().is_ready());

        assert!(deferred.run_next());
        assert_eq!(*sum.future().get(), 3);
    }

    #[test]
    fn dependent_on_complete_parents_starts_during_construction() {
        let scheduler = inline();
        let parent = TaskBuilder::new().on(&scheduler).ready(21);

        let doubled = TaskBuilder::new()
            .on(&scheduler)
            .after(parent, |p| p.future().get() * 2);

        assert_eq!(*doubled.future().get(), 42);
    }

    #[test]
    fn dependent_runs_even_when_every_handle_is_dropped() {
        // The readiness callbacks and the scheduler queue keep the graph
        // alive; user handles are not load-bearing.
        let deferred = Arc::new(DeferredScheduler::new());
        let scheduler: Arc<dyn Scheduler> = Arc::clone(&deferred) as Arc<dyn Scheduler>;
        let (tx, rx) = mpsc::channel();

        let parent = TaskBuilder::new().on(&scheduler).build(|| 4);
        parent.start();

        let child = TaskBuilder::new().on(&scheduler).after(parent, move |p| {
            tx.send(*p.future().get()).unwrap();
        });

        drop(child);
        deferred.run_all();

        assert_eq!(rx.recv_timeout(TEST_TIMEOUT).unwrap(), 4);
    }

    #[test]
    fn heterogeneous_parent_tuple_feeds_the_body() {
        let scheduler = inline();

        let number = TaskBuilder::new().on(&scheduler).spawn(|| 2_i32);
        let fraction = TaskBuilder::new().on(&scheduler).spawn(|| 0.5_f64);
        let unit = TaskBuilder::new().on(&scheduler).spawn(|| {});

        let combined =
            TaskBuilder::new()
                .on(&scheduler)
                .after((number, fraction, unit), |(n, f, u)| {
                    u.future().get();
                    f64::from(*n.future().get()) + *f.future().get()
                });

        assert!((*combined.future().get() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn runtime_sized_parent_list_feeds_the_body() {
        let scheduler = inline();

        let parents: Vec<_> = (0..5)
            .map(|i| TaskBuilder::new().on(&scheduler).spawn(move || i))
            .collect();

        let total = TaskBuilder::new().on(&scheduler).after(parents, |parents| {
            parents.iter().map(|p| *p.future().get()).sum::<i32>()
        });

        assert_eq!(*total.future().get(), 10);
    }

    #[test]
    fn body_runs_at_most_once_per_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let task = TaskBuilder::new().on(&inline()).build({
            let runs = Arc::clone(&runs);
            move || {
                runs.fetch_add(1, Ordering::AcqRel);
            }
        });

        task.start();
        task.future().wait();

        assert_eq!(runs.load(Ordering::Acquire), 1);
    }

    #[test]
    fn builder_names_the_task() {
        let task = TaskBuilder::new()
            .named("ingest")
            .on(&inline())
            .build(|| 0);

        assert_eq!(task.name(), "ingest");
    }
}
