//! Starts and owns the client sessions

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::bridge::{ContentDisplayBridge, LanguageRegistrationBridge};
use crate::config::BridgeConfig;
use crate::dispatch::DispatchTable;
use crate::error::{BridgeError, Result};
use crate::launch::{java_executable, total_memory_bytes, LaunchPlan, ServerRole};
use crate::protocol::methods;
use crate::session::{ClientSession, SessionSpec};
use crate::transport::Transport;
use crate::types::{BrowseParameter, LanguageDescriptor};

/// Starts sessions in the configured transport mode and wires their handlers
pub struct SessionManager {
    config: BridgeConfig,
    content: Arc<ContentDisplayBridge>,
    registration: Arc<LanguageRegistrationBridge>,
    sessions: Mutex<HashMap<ServerRole, Arc<ClientSession>>>,
}

impl SessionManager {
    pub fn new(
        config: BridgeConfig,
        content: Arc<ContentDisplayBridge>,
        registration: Arc<LanguageRegistrationBridge>,
    ) -> Self {
        Self {
            config,
            content,
            registration,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Start the session for `role`
    ///
    /// With a `parametric_peer`, languages the server announces are
    /// forwarded to that peer.
    pub async fn start_session(
        &self,
        role: ServerRole,
        parametric_peer: Option<Arc<ClientSession>>,
    ) -> Result<Arc<ClientSession>> {
        let transport = self.open_transport(role).await?;
        self.start_with_transport(SessionSpec::for_role(role), transport, parametric_peer)
            .await
    }

    /// Start a session over an already established transport
    pub async fn start_with_transport(
        &self,
        spec: SessionSpec,
        transport: Transport,
        parametric_peer: Option<Arc<ClientSession>>,
    ) -> Result<Arc<ClientSession>> {
        let role = spec.role;
        let dispatch = self.dispatch_table(parametric_peer);
        let session =
            ClientSession::start(spec, transport, dispatch, self.config.request_timeout()).await?;

        let replaced = self.sessions.lock().insert(role, Arc::clone(&session));
        if let Some(replaced) = replaced {
            warn!(role = ?role, "Replacing running session");
            replaced.terminate().await;
        }
        Ok(session)
    }

    async fn open_transport(&self, role: ServerRole) -> Result<Transport> {
        if !self.config.deploy_mode {
            let port = self.config.dev_port(role);
            info!(language = role.language_id(), port, "Attaching to development server");
            return Transport::connect(port, &self.config.retry).await;
        }

        let java = java_executable(self.config.java_home.as_deref())?;
        let plan = LaunchPlan::new(
            role,
            java,
            &self.config.extension_root,
            self.config.heap_policy(role),
            total_memory_bytes(),
        );

        Transport::spawn(plan.process_config(), role.language_id())
            .await
            .map_err(|e| match e {
                BridgeError::Process(ref p) if p.is_not_found() => {
                    BridgeError::ExecutableNotFound(plan.executable.display().to_string())
                }
                other => BridgeError::startup_failure(role.language_id(), other),
            })
    }

    fn dispatch_table(&self, parametric_peer: Option<Arc<ClientSession>>) -> DispatchTable {
        let mut table = DispatchTable::new();

        let content = Arc::clone(&self.content);
        table.on_typed(methods::SHOW_CONTENT, move |params: BrowseParameter| {
            content.show_content(&params).map(|_| ())
        });

        if let Some(peer) = parametric_peer {
            let registration = Arc::clone(&self.registration);
            table.on_typed(
                methods::RECEIVE_REGISTER_LANGUAGE,
                move |descriptor: LanguageDescriptor| {
                    registration.register_language(&peer, descriptor);
                    Ok(())
                },
            );
        }

        table
    }

    pub fn session(&self, role: ServerRole) -> Option<Arc<ClientSession>> {
        self.sessions.lock().get(&role).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Terminate every session, killing spawned servers
    pub async fn shutdown_all(&self) {
        let sessions: Vec<Arc<ClientSession>> =
            self.sessions.lock().drain().map(|(_, s)| s).collect();
        for session in sessions {
            info!(language = %session.language_id(), "Stopping session");
            session.terminate().await;
        }
    }
}
