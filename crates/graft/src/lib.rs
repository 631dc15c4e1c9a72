// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Typed task graphs over one-shot futures.
//!
//! A [`Task`] wraps a closure producing a value of some type `T`. Tasks may
//! name other tasks as parents; once every parent has published its value, the
//! dependent task submits itself to its [`Scheduler`] automatically. Completed
//! tasks expose their result through a [`OnceFuture`], which supports blocking
//! waits, timed waits and subscription callbacks.
//!
//! Two schedulers ship with the crate: [`ThreadPoolScheduler`] runs work on a
//! fixed set of worker threads, and [`ManualScheduler`] lets the caller drain
//! work on a thread of their choosing.
//!
//! ```
//! use std::sync::Arc;
//!
//! use graft::{Scheduler, TaskBuilder, ThreadPoolScheduler};
//!
//! let pool: Arc<dyn Scheduler> = Arc::new(ThreadPoolScheduler::with_workers(2));
//!
//! let left = TaskBuilder::new().on(&pool).spawn(|| 2);
//! let right = TaskBuilder::new().on(&pool).spawn(|| 3);
//!
//! // The body receives the parent handles and pulls the values itself; by the
//! // time it runs, both parents are guaranteed to have published.
//! let sum = TaskBuilder::new()
//!     .on(&pool)
//!     .after((left, right), |(a, b)| a.future().get() + b.future().get());
//!
//! assert_eq!(*sum.future().get(), 5);
//! ```

// Public API surface.
mod error;
mod once_future;
mod scheduler;
mod task;

pub use error::*;
pub use once_future::*;
pub use scheduler::*;
pub use task::*;

// Internal to the crate but re-exported at crate root for reduced hassle.
mod constants;

pub(crate) use constants::ERR_POISONED_LOCK;
