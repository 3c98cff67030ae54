//! Activation and deactivation of the whole client bootstrap

use std::sync::Arc;
use tracing::{error, info};

use crate::bridge::{ContentDisplayBridge, ContentProvider, LanguageRegistrationBridge};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::host::EditorHost;
use crate::launch::{java_executable, ServerRole};
use crate::manager::SessionManager;
use crate::registry::ExtensionRegistry;
use crate::session::ClientSession;
use crate::terminal::TerminalLauncher;
use crate::types::{PanelId, TerminalSpec, TextDocumentInfo};

/// A session that could not be started during activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupFailure {
    pub role: ServerRole,
    pub reason: String,
}

/// The activated client: both sessions plus the shared editor-side state
pub struct Extension {
    config: BridgeConfig,
    host: Arc<dyn EditorHost>,
    registry: Arc<ExtensionRegistry>,
    content: Arc<ContentDisplayBridge>,
    registration: Arc<LanguageRegistrationBridge>,
    sessions: SessionManager,
    failures: Vec<StartupFailure>,
}

impl Extension {
    /// Start the parametric server, then the base server wired to it
    ///
    /// A session that fails to start is logged and recorded in
    /// [`Extension::startup_failures`]; only a missing Java executable
    /// aborts activation.
    pub async fn activate(config: BridgeConfig, host: Arc<dyn EditorHost>) -> Result<Self> {
        config.validate()?;
        info!(deploy_mode = config.deploy_mode, "Activating Rascal language support");

        let registry = Arc::new(ExtensionRegistry::new());
        let content = Arc::new(ContentDisplayBridge::new(Arc::clone(&host)));
        let registration = Arc::new(LanguageRegistrationBridge::new(
            Arc::clone(&registry),
            Arc::clone(&host),
        ));
        let sessions = SessionManager::new(
            config.clone(),
            Arc::clone(&content),
            Arc::clone(&registration),
        );

        let mut extension = Self {
            config,
            host,
            registry,
            content,
            registration,
            sessions,
            failures: Vec::new(),
        };

        let parametric = extension.start(ServerRole::Parametric, None).await?;
        extension.start(ServerRole::Base, parametric).await?;

        if extension.failures.is_empty() {
            info!("LSP servers started (Rascal and Parametric)");
        }
        Ok(extension)
    }

    async fn start(
        &mut self,
        role: ServerRole,
        peer: Option<Arc<ClientSession>>,
    ) -> Result<Option<Arc<ClientSession>>> {
        match self.sessions.start_session(role, peer).await {
            Ok(session) => Ok(Some(session)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!(language = role.language_id(), error = %e, "Language server failed to start");
                self.failures.push(StartupFailure {
                    role,
                    reason: e.to_string(),
                });
                Ok(None)
            }
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    pub fn content_bridge(&self) -> &Arc<ContentDisplayBridge> {
        &self.content
    }

    pub fn startup_failures(&self) -> &[StartupFailure] {
        &self.failures
    }

    pub fn session(&self, role: ServerRole) -> Option<Arc<ClientSession>> {
        self.sessions.session(role)
    }

    fn require_session(&self, role: ServerRole) -> Result<Arc<ClientSession>> {
        self.session(role)
            .ok_or_else(|| BridgeError::SessionUnavailable(role.language_id().to_string()))
    }

    /// Reclassify `document` if its extension belongs to a registered language
    pub fn on_document_opened(&self, document: &TextDocumentInfo) -> Result<bool> {
        self.registration.on_document_opened(document)
    }

    /// Virtual document provider backed by the base server
    pub fn content_provider(&self) -> Result<ContentProvider> {
        self.require_session(ServerRole::Base).map(ContentProvider::new)
    }

    pub async fn provide_content(&self, uri: &str) -> Result<String> {
        self.content_provider()?.provide_content(uri).await
    }

    /// Open a REPL terminal for the active document
    ///
    /// Returns `Ok(None)` when there is no active document.
    pub async fn create_terminal(&self, document_uri: Option<&str>) -> Result<Option<TerminalSpec>> {
        let Some(uri) = document_uri else {
            return Ok(None);
        };

        let session = self.require_session(ServerRole::Base)?;
        let java = java_executable(self.config.java_home.as_deref())?;
        let launcher = TerminalLauncher::new(
            session,
            Arc::clone(&self.host),
            &self.config.extension_root,
            java,
        );
        launcher.create_terminal(uri).await.map(Some)
    }

    /// The host reports a panel the user closed
    pub fn panel_disposed(&self, id: PanelId) -> bool {
        self.content.panel_disposed(id)
    }

    /// Stop both sessions; spawned servers are killed
    pub async fn deactivate(&self) {
        info!("Deactivating Rascal language support");
        self.sessions.shutdown_all().await;
    }
}
