// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Minimal task graph: two roots, a join, a continuation, all on a thread
//! pool.
//!
//! Run with `cargo run --example graph_minimal`.

use std::sync::Arc;

use graft::{Scheduler, TaskBuilder, ThreadPoolScheduler};

fn main() {
    let _log_guard = graft_testing::log_to_console();

    let pool: Arc<dyn Scheduler> = Arc::new(ThreadPoolScheduler::new());

    let left = TaskBuilder::new().named("left").on(&pool).spawn(|| 2);
    let right = TaskBuilder::new().named("right").on(&pool).spawn(|| 3);

    let sum = TaskBuilder::new()
        .named("sum")
        .on(&pool)
        .after((left, right), |(a, b)| a.future().get() + b.future().get());

    let doubled = sum.then(|sum| sum.future().get() * 2);

    println!("(2 + 3) * 2 = {}", doubled.future().get());
}
