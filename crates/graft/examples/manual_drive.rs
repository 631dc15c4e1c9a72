// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Drives a small graph cooperatively on the main thread: no pool, no extra
//! threads, just a queue the caller drains.
//!
//! Run with `cargo run --example manual_drive`.

use std::sync::Arc;

use graft::{ManualScheduler, Scheduler, TaskBuilder};

fn main() {
    let _log_guard = graft_testing::log_to_console();

    let manual = Arc::new(ManualScheduler::new());
    let scheduler: Arc<dyn Scheduler> = Arc::clone(&manual) as Arc<dyn Scheduler>;

    let greeting = TaskBuilder::new()
        .named("greeting")
        .on(&scheduler)
        .spawn(|| "hello from the drain loop".to_string());

    // The continuation ends the loop, otherwise `run` would wait for more
    // work forever.
    let _farewell = greeting.then({
        let manual = Arc::clone(&manual);
        move |greeting| {
            println!("{}", greeting.future().get());
            manual.stop();
        }
    });

    manual.run().expect("nothing else is driving this scheduler");
}
