// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::{Condvar, Mutex, OnceLock};
use std::time::Duration;

use crate::ERR_POISONED_LOCK;

/// The outcome of a bounded wait on a [`OnceFuture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The value was published within the allotted time.
    Ready,

    /// The allotted time elapsed first. Not an error: the producer keeps
    /// running and may still publish later.
    TimedOut,
}

type Subscriber<T> = Box<dyn FnOnce(&T) + Send>;

/// A one-shot slot holding a value of type `T`.
///
/// The slot starts empty and becomes ready exactly once, when the producer
/// calls [`set`](Self::set). Consumers can poll ([`is_ready`](Self::is_ready)),
/// block ([`wait`](Self::wait), [`wait_timeout`](Self::wait_timeout),
/// [`get`](Self::get)) or subscribe ([`on_ready`](Self::on_ready)). The value
/// never moves out of the slot; consumers read it by reference.
///
/// # Thread affinity
///
/// A subscriber registered before publication runs in the publishing thread; a
/// subscriber registered after publication runs in the registering thread,
/// before `on_ready` returns. Callbacks must tolerate either.
///
/// Subscribers always run outside the internal lock, so a callback may freely
/// touch this future again (or any other) without deadlocking.
pub struct OnceFuture<T> {
    /// Write-once storage. Publication is gated by the `waiters` lock, but the
    /// value itself lives outside it so that callbacks and `get()` can hand
    /// out references without holding the lock.
    value: OnceLock<T>,
    waiters: Mutex<Waiters<T>>,
    published: Condvar,
}

struct Waiters<T> {
    is_ready: bool,
    /// Pending one-shot subscribers, fired in registration order.
    subscribers: VecDeque<Subscriber<T>>,
}

impl<T> OnceFuture<T> {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
            waiters: Mutex::new(Waiters {
                is_ready: false,
                subscribers: VecDeque::new(),
            }),
            published: Condvar::new(),
        }
    }

    /// Creates a slot that is born published.
    #[must_use]
    pub fn ready(value: T) -> Self {
        let cell = OnceLock::new();
        if cell.set(value).is_err() {
            unreachable!("a freshly created cell cannot already be occupied");
        }

        Self {
            value: cell,
            waiters: Mutex::new(Waiters {
                is_ready: true,
                subscribers: VecDeque::new(),
            }),
            published: Condvar::new(),
        }
    }

    /// Whether the value has been published. A snapshot: a `false` may be
    /// stale by the time the caller looks at it.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.waiters.lock().expect(ERR_POISONED_LOCK).is_ready
    }

    /// Blocks the calling thread until the value is published.
    pub fn wait(&self) {
        let waiters = self.waiters.lock().expect(ERR_POISONED_LOCK);
        drop(
            self.published
                .wait_while(waiters, |w| !w.is_ready)
                .expect(ERR_POISONED_LOCK),
        );
    }

    /// Blocks until the value is published or `timeout` elapses, whichever
    /// comes first.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> WaitOutcome {
        let waiters = self.waiters.lock().expect(ERR_POISONED_LOCK);
        let (_waiters, result) = self
            .published
            .wait_timeout_while(waiters, timeout, |w| !w.is_ready)
            .expect(ERR_POISONED_LOCK);

        if result.timed_out() {
            WaitOutcome::TimedOut
        } else {
            WaitOutcome::Ready
        }
    }

    /// Blocks until the value is published, then returns a reference to it.
    pub fn get(&self) -> &T {
        self.wait();
        self.value_ref()
    }

    /// Publishes the value: wakes every blocked waiter, then invokes every
    /// pending subscriber in registration order, in the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if the value was already published.
    pub fn set(&self, value: T) {
        let drained = {
            let mut waiters = self.waiters.lock().expect(ERR_POISONED_LOCK);

            assert!(!waiters.is_ready, "value already published");

            if self.value.set(value).is_err() {
                unreachable!("the readiness flag said the cell was unoccupied");
            }
            waiters.is_ready = true;

            self.published.notify_all();

            mem::take(&mut waiters.subscribers)
        };

        // Subscribers run outside the lock so they can touch this future (or
        // block on another one) without deadlocking against us.
        let value = self.value_ref();
        for subscriber in drained {
            subscriber(value);
        }
    }

    /// Registers a one-shot readiness callback.
    ///
    /// If the value is already published, `callback` runs with it in the
    /// calling thread before `on_ready` returns. Otherwise it is queued and
    /// runs in the publishing thread, after waiters have been woken. Either
    /// way it runs exactly once.
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        {
            let mut waiters = self.waiters.lock().expect(ERR_POISONED_LOCK);
            if !waiters.is_ready {
                waiters.subscribers.push_back(Box::new(callback));
                return;
            }
        }

        // Fast path: already published.
        callback(self.value_ref());
    }

    /// Only call after observing `is_ready` - the cell is guaranteed occupied
    /// from then on.
    fn value_ref(&self) -> &T {
        self.value
            .get()
            .expect("the readiness flag said the value was published")
    }
}

impl OnceFuture<()> {
    /// Publishes the unit value. Reads better than `set(())` at call sites
    /// that only signal completion.
    pub fn set_done(&self) {
        self.set(());
    }

    /// Registers a no-argument readiness callback; a unit future carries no
    /// value worth passing along.
    pub fn on_done<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_ready(move |_| callback());
    }
}

impl<T> Default for OnceFuture<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for OnceFuture<T> {
    #[cfg_attr(test, mutants::skip)] // We have no contract to test here - can return anything.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceFuture")
            .field("is_ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}
