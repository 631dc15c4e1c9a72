// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Expectation message for every lock acquisition in the crate. We do not try
/// to recover from poisoning - a panic while one of our locks was held means
/// the library state may be torn, and limping on would only obscure the
/// original failure.
pub const ERR_POISONED_LOCK: &str = "failed to acquire lock - the lock is poisoned";
