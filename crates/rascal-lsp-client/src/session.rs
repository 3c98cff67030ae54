//! One JSON-RPC connection to one language server
//!
//! A [`ClientSession`] owns the write half of its transport behind an async
//! mutex and a reader task that routes everything the server sends:
//! responses go to the [`PendingRequests`] table, notifications to the
//! session's [`DispatchTable`], and server requests are answered inline.

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::connection::PendingRequests;
use crate::dispatch::DispatchTable;
use crate::error::{BridgeError, Result};
use crate::launch::ServerRole;
use crate::protocol::methods::{self, ACKNOWLEDGED_SERVER_REQUESTS};
use crate::protocol::{
    read_message, write_message, JsonRpcError, JsonRpcHandler, JsonRpcMessage,
    JsonRpcNotification, JsonRpcRequest,
};
use crate::transport::{BoxReader, BoxWriter, Transport};
use crate::types::{DocumentSelector, SessionState, TransportKind};
use rascal_process::{ManagedChild, ProcessError};

/// Name reported in `clientInfo` during the handshake
pub const CLIENT_NAME: &str = "rascal-lsp-client";

/// Identity of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    pub role: ServerRole,
    pub language_id: String,
    pub title: String,
}

impl SessionSpec {
    pub fn for_role(role: ServerRole) -> Self {
        Self {
            role,
            language_id: role.language_id().to_string(),
            title: role.title().to_string(),
        }
    }

    /// Documents served by this session: on-disk files of its language
    pub fn selector(&self) -> DocumentSelector {
        DocumentSelector::file(&self.language_id)
    }
}

/// A running client connected to one language server
pub struct ClientSession {
    spec: SessionSpec,
    kind: TransportKind,
    state: RwLock<SessionState>,
    handler: JsonRpcHandler,
    pending: Arc<PendingRequests>,
    writer: tokio::sync::Mutex<BoxWriter>,
    child: tokio::sync::Mutex<Option<ManagedChild>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    request_timeout: Duration,
}

impl ClientSession {
    /// Start the reader, run the LSP handshake and return the ready session
    ///
    /// `dispatch` is installed before the first byte from the server is
    /// read. On failure the transport is torn down and
    /// [`BridgeError::SessionStartupFailure`] is returned.
    pub async fn start(
        spec: SessionSpec,
        transport: Transport,
        dispatch: DispatchTable,
        request_timeout: Duration,
    ) -> Result<Arc<Self>> {
        let Transport {
            kind,
            reader,
            writer,
            child,
        } = transport;

        let session = Arc::new(Self {
            spec,
            kind,
            state: RwLock::new(SessionState::Connecting),
            handler: JsonRpcHandler::new(),
            pending: Arc::new(PendingRequests::new()),
            writer: tokio::sync::Mutex::new(writer),
            child: tokio::sync::Mutex::new(child),
            reader_task: Mutex::new(None),
            request_timeout,
        });

        debug!(
            language = %session.spec.language_id,
            transport = ?kind,
            handlers = ?dispatch,
            "Starting client session"
        );

        let task = tokio::spawn(read_loop(
            Arc::downgrade(&session),
            reader,
            dispatch,
            Arc::clone(&session.pending),
            session.spec.language_id.clone(),
        ));
        *session.reader_task.lock() = Some(task);

        if let Err(e) = session.initialize().await {
            let reason = match session.exited_early().await {
                Some(exited) => exited.to_string(),
                None => e.to_string(),
            };
            warn!(language = %session.spec.language_id, %reason, "Language server handshake failed");
            session.close(SessionState::Failed).await;
            return Err(BridgeError::startup_failure(
                session.spec.language_id.clone(),
                reason,
            ));
        }

        *session.state.write() = SessionState::Ready;
        info!(
            language = %session.spec.language_id,
            title = %session.spec.title,
            transport = ?kind,
            "Client session ready"
        );
        Ok(session)
    }

    async fn initialize(&self) -> Result<()> {
        let params = json!({
            "processId": std::process::id(),
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "rootUri": Value::Null,
            "capabilities": {},
        });

        let _capabilities: Value = self.send_request(methods::INITIALIZE, params).await?;
        self.send_notification(methods::INITIALIZED, json!({})).await
    }

    pub fn spec(&self) -> &SessionSpec {
        &self.spec
    }

    pub fn role(&self) -> ServerRole {
        self.spec.role
    }

    pub fn language_id(&self) -> &str {
        &self.spec.language_id
    }

    pub fn title(&self) -> &str {
        &self.spec.title
    }

    pub fn selector(&self) -> DocumentSelector {
        self.spec.selector()
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.kind
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Send a request and wait for its result
    ///
    /// A `null` params value is sent without a `params` member. Rejections,
    /// timeouts and a closed connection all surface as
    /// [`BridgeError::RequestFailure`].
    pub async fn send_request<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let state = self.state();
        if !state.is_usable() {
            return Err(BridgeError::request_failure(
                method,
                format!("session '{}' is {:?}", self.spec.language_id, state),
            ));
        }

        let params = serde_json::to_value(params)?;
        let id = self.handler.next_request_id();
        let request = JsonRpcRequest::new(id, method, (!params.is_null()).then_some(params));

        let rx = self.pending.track(id, method);
        trace!(id, method, "Sending request");

        if let Err(e) = self.write(&JsonRpcMessage::Request(request)).await {
            self.pending.cancel(id);
            return Err(BridgeError::request_failure(method, e.to_string()));
        }

        let value = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(BridgeError::request_failure(method, "connection closed")),
            Err(_) => {
                self.pending.cancel(id);
                return Err(BridgeError::request_failure(
                    method,
                    format!("timed out after {}ms", self.request_timeout.as_millis()),
                ));
            }
        };

        serde_json::from_value(value).map_err(|e| {
            BridgeError::request_failure(method, format!("unexpected response: {}", e))
        })
    }

    /// Send a notification; no reply is expected
    pub async fn send_notification<P: Serialize>(&self, method: &str, params: P) -> Result<()> {
        let params = serde_json::to_value(params)?;
        let notification = self
            .handler
            .create_notification(method, (!params.is_null()).then_some(params));
        self.write(&JsonRpcMessage::Notification(notification)).await
    }

    async fn write(&self, message: &JsonRpcMessage) -> Result<()> {
        let json = message.to_json()?;
        let mut writer = self.writer.lock().await;
        write_message(&mut *writer, &json).await
    }

    async fn answer_server_request(&self, request: JsonRpcRequest) {
        let response = if ACKNOWLEDGED_SERVER_REQUESTS.contains(&request.method.as_str()) {
            JsonRpcHandler::create_response(request.id, Value::Null)
        } else {
            debug!(
                language = %self.spec.language_id,
                method = %request.method,
                "Rejecting unsupported server request"
            );
            JsonRpcHandler::create_error_response(
                request.id,
                JsonRpcError::METHOD_NOT_FOUND,
                format!("Unhandled method {}", request.method),
            )
        };

        if let Err(e) = self.write(&JsonRpcMessage::Response(response)).await {
            warn!(language = %self.spec.language_id, error = %e, "Failed to answer server request");
        }
    }

    /// Exit of a spawned server that is already gone
    async fn exited_early(&self) -> Option<ProcessError> {
        let mut child = self.child.lock().await;
        child.as_mut().and_then(|c| c.ensure_running().err())
    }

    /// Tear the session down, killing a spawned server outright
    pub async fn terminate(&self) {
        self.close(SessionState::Stopped).await;
    }

    async fn close(&self, state: SessionState) {
        *self.state.write() = state;

        let task = self.reader_task.lock().take();
        if let Some(task) = task {
            task.abort();
        }

        let failed = self.pending.fail_all("session closed");
        if failed > 0 {
            debug!(language = %self.spec.language_id, failed, "Failed outstanding requests");
        }

        // Kill before touching the writer: a write blocked on a server that
        // stopped reading holds the writer lock until the pipe breaks.
        let child = self.child.lock().await.take();
        if let Some(mut child) = child {
            let pid = child.pid();
            match child.force_kill().await {
                Ok(()) => info!(language = %self.spec.language_id, pid, "Language server killed"),
                Err(e) => {
                    error!(language = %self.spec.language_id, pid, error = %e, "Failed to kill language server")
                }
            }
        }

        match self.writer.try_lock() {
            Ok(mut writer) => {
                if let Err(e) = writer.shutdown().await {
                    trace!(error = %e, "Closing write half failed");
                }
            }
            Err(_) => debug!(language = %self.spec.language_id, "Writer busy, leaving write half to drop"),
        }
    }

    /// The transport closed underneath us
    fn mark_failed(&self) {
        let mut state = self.state.write();
        if *state != SessionState::Stopped {
            *state = SessionState::Failed;
        }
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("language", &self.spec.language_id)
            .field("transport", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

async fn read_loop(
    session: Weak<ClientSession>,
    reader: BoxReader,
    dispatch: DispatchTable,
    pending: Arc<PendingRequests>,
    language: String,
) {
    let mut reader = BufReader::new(reader);

    loop {
        let body = match read_message(&mut reader).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                info!(language = %language, "Language server closed the connection");
                break;
            }
            Err(e) => {
                warn!(language = %language, error = %e, "Failed to read from language server");
                break;
            }
        };

        match JsonRpcMessage::from_json(&body) {
            Ok(JsonRpcMessage::Response(response)) => {
                if let Err(e) = pending.complete(response) {
                    debug!(language = %language, error = %e, "Dropping response");
                }
            }
            Ok(JsonRpcMessage::Notification(notification)) => {
                handle_notification(&language, &dispatch, notification);
            }
            Ok(JsonRpcMessage::Request(request)) => match session.upgrade() {
                Some(session) => session.answer_server_request(request).await,
                None => break,
            },
            Err(e) => {
                warn!(language = %language, error = %e, "Ignoring malformed message");
            }
        }
    }

    pending.fail_all("connection closed");
    if let Some(session) = session.upgrade() {
        session.mark_failed();
    }
}

fn handle_notification(language: &str, dispatch: &DispatchTable, notification: JsonRpcNotification) {
    let JsonRpcNotification { method, params, .. } = notification;

    if dispatch.contains(&method) {
        if let Some(Err(e)) = dispatch.dispatch(&method, params) {
            warn!(language = %language, method = %method, error = %e, "Notification handler failed");
        }
        return;
    }

    match method.as_str() {
        methods::LOG_MESSAGE | methods::SHOW_MESSAGE => log_server_message(language, params),
        _ => debug!(language = %language, method = %method, "Unhandled notification"),
    }
}

fn log_server_message(language: &str, params: Option<Value>) {
    let Some(Ok(msg)) = params.map(serde_json::from_value::<Map<String, Value>>) else {
        return;
    };

    let message_type = msg.get("type").and_then(Value::as_i64).unwrap_or(0);
    let message = msg
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("(no message)");

    match message_type {
        1 => error!("LSP ({}): {}", language, message),
        2 => warn!("LSP ({}): {}", language, message),
        3 => info!("LSP ({}): {}", language, message),
        4 => debug!("LSP ({}): {}", language, message),
        _ => trace!("LSP ({}): {}", language, message),
    }
}
