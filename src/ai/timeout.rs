//! Per-call timeout guard
//!
//! The HTTP clients carry their own request timeouts; this guard bounds the
//! whole generator call (search fan-out plus the model call).

use std::future::Future;
use std::time::Duration;

use crate::types::{QuillError, Result};

/// Execute an async operation with a timeout
///
/// Elapsed time becomes [`QuillError::Timeout`], which is transient and
/// therefore retried by section units.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(QuillError::timeout(operation_name, timeout)),
    }
}
