// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::{ERR_POISONED_LOCK, Scheduler};

/// Process-wide fallback used when a task is built without an explicit
/// scheduler.
static DEFAULT_SCHEDULER: RwLock<Option<Arc<dyn Scheduler>>> = RwLock::new(None);

/// Installs the process-wide default scheduler.
///
/// Tasks built without an explicit scheduler use this one. Intended to be
/// called once at startup; installing and replacing the default while tasks
/// are being built concurrently is the embedder's sequencing problem.
pub fn set_default_scheduler(scheduler: Arc<dyn Scheduler>) {
    *DEFAULT_SCHEDULER.write().expect(ERR_POISONED_LOCK) = Some(scheduler);
    debug!("default scheduler installed");
}

/// Removes the process-wide default scheduler. Tasks built afterwards must
/// name a scheduler explicitly.
pub fn clear_default_scheduler() {
    *DEFAULT_SCHEDULER.write().expect(ERR_POISONED_LOCK) = None;
    debug!("default scheduler cleared");
}

/// Returns the installed default scheduler, if any.
#[must_use]
pub fn default_scheduler() -> Option<Arc<dyn Scheduler>> {
    DEFAULT_SCHEDULER.read().expect(ERR_POISONED_LOCK).clone()
}

// The default is process-global state, so its tests live in the
// `default_scheduler` integration test where they get a process to themselves.
