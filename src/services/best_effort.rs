// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fire-and-forget writes.
//!
//! Telemetry-style updates (last-activity timestamps) must never fail the
//! request that triggered them. They run detached and failures are logged.

use crate::error::AppError;
use std::future::Future;
use tokio::task::JoinHandle;

/// Run `write` in the background, logging instead of propagating failure.
///
/// The handle is returned for callers that want to wait (tests); request
/// handlers drop it.
pub fn spawn_logged<F>(task: &'static str, write: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), AppError>> + Send + 'static,
{
    tokio::spawn(async move {
        match write.await {
            Ok(()) => tracing::debug!(task, "Best-effort write done"),
            Err(err) => tracing::warn!(task, error = %err, "Best-effort write failed"),
        }
    })
}
