//! Shared fixtures: a scripted language server and a recording editor host

#![allow(dead_code)]

use parking_lot::Mutex;
use rascal_lsp_client::protocol::{read_message, write_message};
use rascal_lsp_client::{BridgeConfig, EditorHost, PanelId, PanelSpec, Result, RetryPolicy, TerminalSpec};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Language server on an ephemeral loopback port
///
/// Answers `initialize`, replies to requests listed in its canned responses,
/// rejects anything else, and records every message the client sends.
pub struct FakeServer {
    pub port: u16,
    received: Arc<Mutex<Vec<Value>>>,
    outgoing: mpsc::UnboundedSender<Value>,
}

impl FakeServer {
    pub async fn start(responses: HashMap<String, Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Value>();

        let log = Arc::clone(&received);
        let replies = outgoing.clone();
        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let (read_half, mut write_half) = stream.into_split();

            tokio::spawn(async move {
                while let Some(message) = outgoing_rx.recv().await {
                    if write_message(&mut write_half, &message.to_string()).await.is_err() {
                        break;
                    }
                }
            });

            let mut reader = BufReader::new(read_half);
            while let Ok(Some(body)) = read_message(&mut reader).await {
                let message: Value = serde_json::from_str(&body).unwrap();
                log.lock().push(message.clone());

                let (Some(method), Some(id)) = (message["method"].as_str(), message.get("id")) else {
                    continue;
                };
                let reply = if method == "initialize" {
                    json!({"jsonrpc": "2.0", "id": id, "result": {"capabilities": {}}})
                } else if let Some(result) = responses.get(method) {
                    json!({"jsonrpc": "2.0", "id": id, "result": result})
                } else {
                    json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32601, "message": "unknown"}})
                };
                let _ = replies.send(reply);
            }
        });

        Self {
            port,
            received,
            outgoing,
        }
    }

    /// Push a notification to the client
    pub fn notify(&self, method: &str, params: Value) {
        let _ = self
            .outgoing
            .send(json!({"jsonrpc": "2.0", "method": method, "params": params}));
    }

    /// Messages received with `method`
    pub fn received(&self, method: &str) -> Vec<Value> {
        self.received
            .lock()
            .iter()
            .filter(|m| m["method"] == method)
            .cloned()
            .collect()
    }

    /// Wait until the client sent `method`, returning the first such message
    pub async fn wait_for(&self, method: &str) -> Value {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(message) = self.received(method).into_iter().next() {
                    return message;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("client never sent {}", method))
    }
}

pub fn responses(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(method, value)| (method.to_string(), value.clone()))
        .collect()
}

/// Dev-mode configuration attaching to the given ports with a short retry budget
pub fn dev_config(base_port: u16, parametric_port: u16) -> BridgeConfig {
    BridgeConfig {
        deploy_mode: false,
        base_dev_port: base_port,
        parametric_dev_port: parametric_port,
        request_timeout_ms: 5_000,
        retry: RetryPolicy {
            max_attempts: 2,
            step_ms: 10,
            max_delay_ms: 10,
            attempt_timeout_ms: 500,
        },
        ..BridgeConfig::default()
    }
}

/// A port nothing listens on
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Editor host that records every call
#[derive(Default)]
pub struct RecordingHost {
    next_panel: AtomicU64,
    pub language_changes: Mutex<Vec<(String, String)>>,
    pub panels: Mutex<Vec<(PanelId, PanelSpec)>>,
    pub disposed: Mutex<Vec<PanelId>>,
    pub terminals: Mutex<Vec<TerminalSpec>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl EditorHost for RecordingHost {
    fn set_document_language(&self, uri: &str, language_id: &str) -> Result<()> {
        self.language_changes
            .lock()
            .push((uri.to_string(), language_id.to_string()));
        Ok(())
    }

    fn create_panel(&self, spec: PanelSpec) -> Result<PanelId> {
        let id = self.next_panel.fetch_add(1, Ordering::SeqCst) + 1;
        self.panels.lock().push((id, spec));
        Ok(id)
    }

    fn dispose_panel(&self, id: PanelId) {
        self.disposed.lock().push(id);
    }

    fn create_terminal(&self, spec: TerminalSpec) -> Result<()> {
        self.terminals.lock().push(spec);
        Ok(())
    }
}

/// Poll `condition` for up to five seconds
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
