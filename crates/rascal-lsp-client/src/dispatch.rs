//! Dispatch table for server-pushed notifications

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BridgeError, Result};

/// Callback invoked with the raw notification params
pub type NotificationHandler = Arc<dyn Fn(Option<Value>) -> Result<()> + Send + Sync>;

/// Handlers keyed by method name
#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: HashMap<String, NotificationHandler>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler on raw params, replacing any previous one
    pub fn on(&mut self, method: impl Into<String>, handler: NotificationHandler) -> &mut Self {
        self.handlers.insert(method.into(), handler);
        self
    }

    /// Register a handler that receives deserialized params
    pub fn on_typed<P, F>(&mut self, method: &str, handler: F) -> &mut Self
    where
        P: DeserializeOwned,
        F: Fn(P) -> Result<()> + Send + Sync + 'static,
    {
        let name = method.to_string();
        self.on(
            method,
            Arc::new(move |params: Option<Value>| {
                let params = serde_json::from_value(params.unwrap_or(Value::Null)).map_err(|e| {
                    BridgeError::Protocol(format!("Invalid params for {}: {}", name, e))
                })?;
                handler(params)
            }),
        )
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `method`; `None` when nothing is registered
    pub fn dispatch(&self, method: &str, params: Option<Value>) -> Option<Result<()>> {
        self.handlers.get(method).map(|handler| handler(params))
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.handlers.keys().collect();
        methods.sort();
        f.debug_struct("DispatchTable").field("methods", &methods).finish()
    }
}
