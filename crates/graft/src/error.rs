// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// A specialized `Result` type for graft operations that return a graft
/// [`Error`][enum@Error] on failure.
pub type Result<T> = std::result::Result<T, Error>;

/// An error originating in the graft runtime.
///
/// Precondition violations - publishing a future twice, starting a task
/// twice, using an empty task handle - are programming errors and panic at
/// the point of detection rather than appearing here. This type covers the
/// conditions a caller can reasonably react to at runtime.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// `run()` was called on a [`ManualScheduler`](crate::ManualScheduler)
    /// that another thread is already driving. A drain loop has a single
    /// driver at a time.
    #[error("the scheduler is already being driven by another thread")]
    AlreadyDriving,
}
