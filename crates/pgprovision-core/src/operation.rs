//! Pending operations and ARM long-running operation tracking
//!
//! A [`PendingOperation`] is a single-resolution handle: the work runs on a
//! spawned task and its result arrives through a oneshot channel. The caller
//! waits on it exactly once.
//!
//! [`track`] follows the Azure Resource Manager asynchronous protocol after
//! the initial request:
//!
//! - `Azure-AsyncOperation` header: poll the status URL until `status` is
//!   terminal, then GET the resource
//! - `201`/`202` with `Location`: poll the location until it stops answering `202`
//! - otherwise: watch `properties.provisioningState` on the resource itself

use crate::client::{ArmClient, ArmResponse, ErrorDetail};
use crate::error::{CoreError, Result};
use crate::progress::{ProgressCallback, ProgressEvent, emit};
use reqwest::StatusCode;
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Handle to an in-flight remote action that resolves exactly once
#[derive(Debug)]
pub struct PendingOperation<T> {
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T: Send + 'static> PendingOperation<T> {
    /// Run `work` on the Tokio runtime and hand back its handle
    ///
    /// Must be called from within a runtime.
    pub fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (sender, operation) = Self::channel();
        tokio::spawn(async move {
            if sender.send(work.await).is_err() {
                debug!("Pending operation handle dropped before completion");
            }
        });
        operation
    }
}

impl<T> PendingOperation<T> {
    /// A handle and the sender that resolves it
    pub fn channel() -> (oneshot::Sender<Result<T>>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    /// An already resolved handle
    pub fn ready(result: Result<T>) -> Self {
        let (sender, operation) = Self::channel();
        // The receiver is alive, so the send cannot fail
        let _ = sender.send(result);
        operation
    }

    /// Wait for the operation to resolve
    ///
    /// If the producer went away without sending, resolves to
    /// [`CoreError::OperationAbandoned`].
    pub async fn wait(self) -> Result<T> {
        self.receiver
            .await
            .unwrap_or(Err(CoreError::OperationAbandoned))
    }
}

/// Where a long-running operation reports its progress
#[derive(Debug, Clone, PartialEq)]
enum Tracking {
    AsyncOperation(String),
    Location(String),
    ProvisioningState,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Succeeded,
    Failed(String),
    InProgress(String),
}

fn classify(status: &str) -> State {
    match status.to_ascii_lowercase().as_str() {
        "succeeded" => State::Succeeded,
        "failed" | "canceled" | "cancelled" => State::Failed(status.to_string()),
        _ => State::InProgress(status.to_string()),
    }
}

fn tracking_for(initial: &ArmResponse) -> Tracking {
    if let Some(url) = &initial.async_operation {
        Tracking::AsyncOperation(url.clone())
    } else if matches!(initial.status, StatusCode::CREATED | StatusCode::ACCEPTED)
        && let Some(url) = &initial.location
    {
        Tracking::Location(url.clone())
    } else {
        Tracking::ProvisioningState
    }
}

fn provisioning_state(body: &Value) -> Option<&str> {
    body.get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(Value::as_str)
}

fn operation_error(status: String, body: &Value) -> CoreError {
    let detail = body
        .get("error")
        .cloned()
        .and_then(|e| serde_json::from_value::<ErrorDetail>(e).ok());
    let (code, message) = match detail {
        Some(detail) => (detail.code, detail.message),
        None => (None, None),
    };
    CoreError::OperationFailed {
        message: message.unwrap_or_else(|| format!("operation ended in state '{}'", status)),
        status,
        code,
    }
}

/// Follow a long-running operation to completion and return the final resource body
///
/// # Arguments
///
/// * `client` - The management client
/// * `operation` - Human readable label used in progress events
/// * `resource_url` - URL of the resource being created
/// * `initial` - Response to the request that started the operation
/// * `interval` - Delay between polls when no `Retry-After` is sent
/// * `on_progress` - Optional callback for progress updates
pub async fn track(
    client: &ArmClient,
    operation: &str,
    resource_url: &str,
    initial: ArmResponse,
    interval: Duration,
    on_progress: &Option<ProgressCallback>,
) -> Result<Value> {
    let start = Instant::now();
    emit(
        on_progress,
        ProgressEvent::Started {
            operation: operation.to_string(),
        },
    );

    let result = follow(
        client,
        operation,
        resource_url,
        initial,
        interval,
        on_progress,
        start,
    )
    .await;

    match &result {
        Ok(_) => emit(
            on_progress,
            ProgressEvent::Completed {
                operation: operation.to_string(),
                elapsed: start.elapsed(),
            },
        ),
        Err(e) => {
            warn!("{} failed: {}", operation, e);
            emit(
                on_progress,
                ProgressEvent::Failed {
                    operation: operation.to_string(),
                    error: e.to_string(),
                },
            )
        }
    }

    result
}

async fn follow(
    client: &ArmClient,
    operation: &str,
    resource_url: &str,
    initial: ArmResponse,
    interval: Duration,
    on_progress: &Option<ProgressCallback>,
    start: Instant,
) -> Result<Value> {
    let polling = |status: &str| {
        emit(
            on_progress,
            ProgressEvent::Polling {
                operation: operation.to_string(),
                status: status.to_string(),
                elapsed: start.elapsed(),
            },
        )
    };

    let mut delay = initial.retry_after.unwrap_or(interval);
    let tracking = tracking_for(&initial);
    debug!("Tracking {} via {:?}", operation, tracking);

    match tracking {
        Tracking::AsyncOperation(status_url) => {
            loop {
                tokio::time::sleep(delay).await;
                let response = client.get(&status_url).await?;
                let status = response
                    .body
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("InProgress")
                    .to_string();
                polling(&status);

                match classify(&status) {
                    State::Succeeded => break,
                    State::Failed(status) => return Err(operation_error(status, &response.body)),
                    State::InProgress(_) => {
                        delay = response.retry_after.unwrap_or(interval);
                    }
                }
            }
            Ok(client.get(resource_url).await?.body)
        }
        Tracking::Location(location) => loop {
            tokio::time::sleep(delay).await;
            let response = client.get(&location).await?;
            if response.status == StatusCode::ACCEPTED {
                polling("InProgress");
                delay = response.retry_after.unwrap_or(interval);
                continue;
            }
            polling("Succeeded");
            if response.body.is_null() {
                return Ok(client.get(resource_url).await?.body);
            }
            return Ok(response.body);
        },
        Tracking::ProvisioningState => {
            // Only a 200 or a later GET is the final resource; a 201/202 body
            // without provisioningState is not a result yet
            let mut settled = initial.status == StatusCode::OK;
            let mut body = initial.body;
            loop {
                let state = match provisioning_state(&body) {
                    None if settled && !body.is_null() => State::Succeeded,
                    None => State::InProgress("Accepted".to_string()),
                    Some(state) => classify(state),
                };
                match state {
                    State::Succeeded => return Ok(body),
                    State::Failed(status) => return Err(operation_error(status, &body)),
                    State::InProgress(status) => polling(&status),
                }

                tokio::time::sleep(delay).await;
                let response = client.get(resource_url).await?;
                delay = response.retry_after.unwrap_or(interval);
                body = response.body;
                settled = true;
            }
        }
    }
}
