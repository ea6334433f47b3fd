//! Callback-style invocation.
//!
//! Every dispatcher operation is an `async fn`. This module turns any such
//! future into a callback-style call: the future is spawned on the Tokio
//! runtime and its single outcome is handed to the completion. The
//! completion never runs on the caller's stack, so callers get the same
//! "never completes before returning" guarantee from both styles.

use crate::error::Result;
use std::future::Future;
use tokio::task::JoinHandle;

/// Drive `operation` to completion and deliver its outcome to `completion`.
///
/// The completion is invoked exactly once, from a spawned task. The returned
/// handle resolves after the completion has run.
///
/// Must be called from within a Tokio runtime.
pub fn complete_with<T, Fut, F>(operation: Fut, completion: F) -> JoinHandle<()>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    F: FnOnce(Result<T>) + Send + 'static,
{
    tokio::spawn(async move {
        let outcome = operation.await;
        completion(outcome);
    })
}
