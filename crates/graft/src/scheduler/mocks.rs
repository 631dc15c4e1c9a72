// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::sync::Mutex;

use mockall::mock;

use crate::{ERR_POISONED_LOCK, Scheduler, WorkItem};

mock! {
    pub Scheduler {}

    impl Scheduler for Scheduler {
        fn schedule(&self, work: WorkItem);
    }
}

/// Runs every work item immediately, in the thread that scheduled it. Makes
/// task wiring fully synchronous and therefore easy to assert on.
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn schedule(&self, work: WorkItem) {
        work();
    }
}

/// Collects work items for the test to pump one at a time, so a test can
/// observe the state between any two scheduling steps.
#[derive(Default)]
pub struct DeferredScheduler {
    queue: Mutex<VecDeque<WorkItem>>,
}

impl DeferredScheduler {
    /// Creates a scheduler with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the oldest pending item. Returns whether there was one.
    pub fn run_next(&self) -> bool {
        let work = self.queue.lock().expect(ERR_POISONED_LOCK).pop_front();

        match work {
            Some(work) => {
                work();
                true
            }
            None => false,
        }
    }

    /// Runs pending items - including ones they enqueue - until none remain.
    pub fn run_all(&self) {
        while self.run_next() {}
    }

    /// Number of items waiting to be pumped.
    pub fn pending(&self) -> usize {
        self.queue.lock().expect(ERR_POISONED_LOCK).len()
    }
}

impl Scheduler for DeferredScheduler {
    fn schedule(&self, work: WorkItem) {
        self.queue.lock().expect(ERR_POISONED_LOCK).push_back(work);
    }
}
