//! JSON-RPC 2.0 message types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{BridgeError, Result};

/// Id of a request this client sends
pub type RequestId = u64;

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID; servers may use numbers or strings
    pub id: Value,
    /// Request method name
    pub method: String,
    /// Request parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Request with a numeric id, as this client sends them
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::from(id),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Response ID (matches request ID)
    pub id: Value,
    /// Response result (mutually exclusive with error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Response error (mutually exclusive with result)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Optional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Method not found (-32601)
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Build an error object without data
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// JSON-RPC 2.0 notification (request without ID)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Notification method name
    pub method: String,
    /// Notification parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Any message travelling over the duplex channel
#[derive(Debug, Clone)]
pub enum JsonRpcMessage {
    /// Request message
    Request(JsonRpcRequest),
    /// Response message
    Response(JsonRpcResponse),
    /// Notification message
    Notification(JsonRpcNotification),
}

impl JsonRpcMessage {
    /// Classify and parse a JSON payload
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| BridgeError::Protocol(format!("Failed to parse JSON: {}", e)))?;

        let has_method = value.get("method").is_some();
        let has_id = value.get("id").map_or(false, |id| !id.is_null());

        if !has_method && (value.get("result").is_some() || value.get("error").is_some()) {
            serde_json::from_value(value)
                .map(JsonRpcMessage::Response)
                .map_err(|e| BridgeError::Protocol(format!("Failed to parse response: {}", e)))
        } else if has_method && has_id {
            serde_json::from_value(value)
                .map(JsonRpcMessage::Request)
                .map_err(|e| BridgeError::Protocol(format!("Failed to parse request: {}", e)))
        } else if has_method {
            serde_json::from_value(value)
                .map(JsonRpcMessage::Notification)
                .map_err(|e| BridgeError::Protocol(format!("Failed to parse notification: {}", e)))
        } else {
            Err(BridgeError::Protocol(
                "Message must be a request, response, or notification".to_string(),
            ))
        }
    }

    /// Serialize message to JSON
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            JsonRpcMessage::Request(req) => serde_json::to_string(req)?,
            JsonRpcMessage::Response(resp) => serde_json::to_string(resp)?,
            JsonRpcMessage::Notification(notif) => serde_json::to_string(notif)?,
        };
        Ok(json)
    }
}

/// Builds outgoing JSON-RPC 2.0 messages
pub struct JsonRpcHandler {
    /// Next request ID to use
    next_id: Arc<AtomicU64>,
}

impl JsonRpcHandler {
    /// Create a new JSON-RPC handler
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Generate the next request ID
    pub fn next_request_id(&self) -> RequestId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Create a JSON-RPC request with a fresh id
    pub fn create_request(&self, method: impl Into<String>, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest::new(self.next_request_id(), method, params)
    }

    /// Create a JSON-RPC notification (no response expected)
    pub fn create_notification(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> JsonRpcNotification {
        JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }

    /// Create a successful response to a server request
    pub fn create_response(id: Value, result: Value) -> JsonRpcResponse {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create a JSON-RPC error response
    pub fn create_error_response(id: Value, code: i32, message: impl Into<String>) -> JsonRpcResponse {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError::new(code, message)),
        }
    }
}

impl Default for JsonRpcHandler {
    fn default() -> Self {
        Self::new()
    }
}
