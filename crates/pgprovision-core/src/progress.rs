//! Progress events for long-running operations
//!
//! The poller reports each status check through an optional callback so the
//! CLI can drive a spinner. Library callers can pass `None`.

use std::sync::Arc;
use std::time::Duration;

/// Progress events emitted by the sequencer and the operation poller
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The sequencer moved on to a new step
    Step { description: String },
    /// Request accepted, tracking has begun
    Started { operation: String },
    /// One status check
    Polling {
        operation: String,
        status: String,
        elapsed: Duration,
    },
    /// Terminal success
    Completed { operation: String, elapsed: Duration },
    /// Terminal failure
    Failed { operation: String, error: String },
}

/// Callback type for progress updates
///
/// Shared between the sequencer and the task that polls the server operation.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Helper to emit progress events
pub(crate) fn emit(callback: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
