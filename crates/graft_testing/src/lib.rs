// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test support for the graft workspace.
//!
//! Tasks and schedulers synchronize through blocking waits, so a broken test
//! tends to hang rather than fail. The helpers here convert hangs into prompt
//! failures, poll for cross-thread effects that have no completion signal of
//! their own, and wire up log output for tests and examples.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing_appender::non_blocking::WorkerGuard;

/// Upper bound for anything a test waits on. Generous on purpose: this exists
/// to break out of deadlocks and lost wakeups, not to assert performance.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a thread-safe closure on a background thread and gives up on it if it
/// does not finish within [`TEST_TIMEOUT`].
///
/// Returns `None` on timeout and when the closure panics - in both cases the
/// result channel closes without delivering a value. An abandoned thread is
/// left running; the test process exits out from under it.
#[cfg_attr(test, mutants::skip)] // Test scaffolding - mutations only create hangs.
#[must_use]
pub fn execute_or_abandon<F, R>(f: F) -> Option<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        // If `f` panics the sender is dropped without sending and the
        // receiver below reports a closed channel, which we map to None.
        let result = f();
        _ = sender.send(result);
    });

    receiver.recv_timeout(TEST_TIMEOUT).ok()
}

/// Polls `condition` until it holds or [`TEST_TIMEOUT`] elapses, yielding the
/// thread between probes. Returns whether the condition was observed.
///
/// For effects that happen "shortly after" an observable event but have no
/// signal of their own, such as a worker thread releasing its reference to a
/// finished task.
#[cfg_attr(test, mutants::skip)] // Test scaffolding - mutations only create hangs.
#[must_use]
pub fn wait_until<F>(condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + TEST_TIMEOUT;

    loop {
        if condition() {
            return true;
        }

        if Instant::now() >= deadline {
            return false;
        }

        thread::sleep(Duration::from_millis(1));
    }
}

/// Sends log output to stdout for the duration of a test or example.
///
/// Keep the returned guard alive while anything may still log; dropping it
/// flushes buffered output.
///
/// # Panics
///
/// Panics if a global tracing subscriber is already installed. That happens
/// when two tests in the same process both call this - keep such tests in
/// separate integration-test files so each gets its own process, or run them
/// one at a time.
#[cfg_attr(test, mutants::skip)] // Test scaffolding - nothing here to assert on.
pub fn log_to_console() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(writer)
        .try_init()
        .expect("a global tracing subscriber is already installed for this process");

    guard
}
