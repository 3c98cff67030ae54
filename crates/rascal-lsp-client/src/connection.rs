//! Correlation of outgoing requests with their responses

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::protocol::{JsonRpcResponse, RequestId};

/// A request awaiting its response
pub struct PendingRequest {
    pub method: String,
    pub sent_at: Instant,
    response_tx: oneshot::Sender<Result<Value>>,
}

/// Requests sent on one connection that have not been answered yet
#[derive(Default)]
pub struct PendingRequests {
    requests: Mutex<HashMap<RequestId, PendingRequest>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `id`; the receiver resolves with the response
    pub fn track(&self, id: RequestId, method: impl Into<String>) -> oneshot::Receiver<Result<Value>> {
        let (response_tx, rx) = oneshot::channel();
        self.requests.lock().insert(
            id,
            PendingRequest {
                method: method.into(),
                sent_at: Instant::now(),
                response_tx,
            },
        );
        rx
    }

    /// Route a response to the task waiting on it
    pub fn complete(&self, response: JsonRpcResponse) -> Result<()> {
        let id = response.id.as_u64().ok_or_else(|| {
            BridgeError::Protocol(format!("Response carries a foreign id: {}", response.id))
        })?;

        let pending = self.requests.lock().remove(&id).ok_or_else(|| {
            BridgeError::Protocol(format!("Received response for unknown request ID: {}", id))
        })?;

        debug!(
            id,
            method = %pending.method,
            elapsed_ms = pending.sent_at.elapsed().as_millis() as u64,
            "Response received"
        );

        let result = match response.error {
            Some(error) => Err(BridgeError::request_failure(
                pending.method,
                format!("{}: {}", error.code, error.message),
            )),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };

        // The caller may have timed out and gone away
        let _ = pending.response_tx.send(result);
        Ok(())
    }

    /// Stop tracking `id` without answering it
    pub fn cancel(&self, id: RequestId) -> bool {
        self.requests.lock().remove(&id).is_some()
    }

    /// Fail every outstanding request, e.g. when the transport closes
    pub fn fail_all(&self, reason: &str) -> usize {
        let drained: Vec<PendingRequest> = self.requests.lock().drain().map(|(_, p)| p).collect();
        let count = drained.len();
        for pending in drained {
            let error = BridgeError::request_failure(pending.method, reason);
            let _ = pending.response_tx.send(Err(error));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }
}
