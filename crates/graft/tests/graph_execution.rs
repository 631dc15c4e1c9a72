// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! End-to-end task graphs on the thread-pool scheduler.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use graft::{Scheduler, TaskBuilder, ThreadPoolScheduler};
use graft_testing::{TEST_TIMEOUT, execute_or_abandon};

fn pool(workers: usize) -> Arc<dyn Scheduler> {
    Arc::new(ThreadPoolScheduler::with_workers(workers))
}

#[test]
fn heterogeneous_parents_feed_a_then_chain() {
    // Three roots of different value types gate one child; a continuation
    // hangs off the child. Waiting on the continuation proves the whole graph
    // ran in dependency order.
    let completed = execute_or_abandon(|| {
        let pool = pool(4);

        let ticket = TaskBuilder::new().named("ticket").on(&pool).build(|| {
            thread::sleep(Duration::from_millis(10));
            1_i32
        });
        let rate = TaskBuilder::new().named("rate").on(&pool).build(|| {
            thread::sleep(Duration::from_millis(20));
            3.4_f64
        });
        let warmup = TaskBuilder::new().named("warmup").on(&pool).build(|| {
            thread::sleep(Duration::from_millis(5));
        });

        let combined = TaskBuilder::new().named("combined").on(&pool).after(
            (ticket.clone(), rate.clone(), warmup.clone()),
            |(ticket, rate, warmup)| {
                warmup.future().get();
                assert!(f64::from(*ticket.future().get()) < *rate.future().get());
                2_i32
            },
        );
        let last = combined.then(|combined| *combined.future().get());

        ticket.start();
        rate.start();
        warmup.start();

        let result = *last.future().get();

        assert!(ticket.future().is_ready());
        assert!(rate.future().is_ready());
        assert!(warmup.future().is_ready());

        result
    });

    assert_eq!(completed, Some(2));
}

#[test]
fn graph_survives_dropped_handles() {
    // Every user handle is gone before the roots finish; the child still runs
    // and still sees both parent values.
    let completed = execute_or_abandon(|| {
        let pool = pool(2);
        let (tx, rx) = mpsc::channel();

        let left = TaskBuilder::new().on(&pool).build(|| 1);
        let right = TaskBuilder::new().on(&pool).build(|| 2);

        let child = TaskBuilder::new()
            .on(&pool)
            .after((left.clone(), right.clone()), move |(left, right)| {
                tx.send(left.future().get() + right.future().get()).unwrap();
            });
        drop(child);

        left.start();
        right.start();
        drop(left);
        drop(right);

        rx.recv_timeout(TEST_TIMEOUT).unwrap()
    });

    assert_eq!(completed, Some(3));
}

#[test]
fn deep_then_chain_runs_in_order() {
    let completed = execute_or_abandon(|| {
        let pool = pool(2);

        let mut task = TaskBuilder::new().on(&pool).spawn(|| 0_u32);
        for _ in 0..20 {
            task = task.then(|previous| previous.future().get() + 1);
        }

        *task.future().get()
    });

    assert_eq!(completed, Some(20));
}
