//! Task dispatcher
//!
//! Moves a blocking device call onto tokio's blocking worker pool and
//! delivers the result back on the caller's task, exactly once, with either
//! an error or a value. The caller's task stays responsive between
//! submission and completion.
//!
//! Each await is bounded by the per-operation timeout from
//! [`BridgeTimeouts`]. A timeout stops the caller waiting but does not
//! cancel the blocking call; once submitted, a task runs to completion on
//! the worker (cancellation is layered above this crate).

use std::time::Duration;

use crate::error::{GpError, GpResult};
use crate::BridgeTimeouts;

/// A unit of work: operation-specific inputs bound to the device they
/// target. `execute` runs on the worker context and performs the native
/// calls under the device lock.
pub trait Request: Send + 'static {
    type Output: Send + 'static;

    /// Operation name for logs and error context
    fn operation(&self) -> &'static str;

    /// Deadline for this operation
    fn timeout(&self, timeouts: &BridgeTimeouts) -> Duration;

    /// Blocking body; consumes the request
    fn execute(self) -> GpResult<Self::Output>;
}

/// Dispatches [`Request`]s onto the blocking worker pool
#[derive(Debug, Clone)]
pub struct Dispatcher {
    timeouts: BridgeTimeouts,
}

impl Dispatcher {
    pub fn new(timeouts: BridgeTimeouts) -> Self {
        Self { timeouts }
    }

    pub fn timeouts(&self) -> &BridgeTimeouts {
        &self.timeouts
    }

    /// Run `request` off the caller's task and resolve with its result.
    ///
    /// Resolves exactly once: a value, the request's own error, a
    /// `WorkerGone` if the worker panicked, or an `OperationTimeout` if the
    /// deadline passed first.
    pub async fn submit<R: Request>(&self, request: R) -> GpResult<R::Output> {
        let operation = request.operation();
        let duration = request.timeout(&self.timeouts);
        tracing::debug!("Dispatching '{}' (timeout {:?})", operation, duration);

        let work = tokio::task::spawn_blocking(move || request.execute());
        match tokio::time::timeout(duration, work).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                tracing::warn!("Worker for '{}' died: {}", operation, join_err);
                Err(GpError::WorkerGone(join_err.to_string()))
            }
            Err(_) => Err(GpError::OperationTimeout {
                operation,
                duration,
            }),
        }
    }
}
