//! Forwarding of language registrations and document reclassification

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::host::EditorHost;
use crate::protocol::methods;
use crate::registry::ExtensionRegistry;
use crate::session::ClientSession;
use crate::types::{LanguageDescriptor, TextDocumentInfo, UMBRELLA_LANGUAGE_ID};

/// Loads languages declared on the base server into the parametric server
/// and claims documents with their extensions for the umbrella language
pub struct LanguageRegistrationBridge {
    registry: Arc<ExtensionRegistry>,
    host: Arc<dyn EditorHost>,
}

impl LanguageRegistrationBridge {
    pub fn new(registry: Arc<ExtensionRegistry>, host: Arc<dyn EditorHost>) -> Self {
        Self { registry, host }
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    /// Forward `descriptor` to `target` and record its extension
    ///
    /// The request is sent from a spawned task and not awaited, so this must
    /// be called from within a tokio runtime.
    pub fn register_language(&self, target: &Arc<ClientSession>, descriptor: LanguageDescriptor) {
        info!(
            name = %descriptor.name,
            extension = %descriptor.extension,
            main_module = %descriptor.main_module,
            "Registering language"
        );

        let session = Arc::clone(target);
        let payload = descriptor.clone();
        tokio::spawn(async move {
            let result: Result<Value> = session
                .send_request(methods::SEND_REGISTER_LANGUAGE, &payload)
                .await;
            match result {
                Ok(_) => debug!(name = %payload.name, "Language loaded into parametric server"),
                Err(e) => warn!(name = %payload.name, error = %e, "Language registration failed"),
            }
        });

        if let Some(extension) = descriptor.registered_extension() {
            if self.registry.register(extension) {
                debug!(extension, "File extension registered");
            }
        }
    }

    /// Reclassify a freshly opened document whose extension was registered
    ///
    /// Returns whether the host was asked to change the document language.
    pub fn on_document_opened(&self, document: &TextDocumentInfo) -> Result<bool> {
        let Some(extension) = document
            .file_name
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
        else {
            return Ok(false);
        };

        if document.language_id == UMBRELLA_LANGUAGE_ID || !self.registry.contains(extension) {
            return Ok(false);
        }

        debug!(uri = %document.uri, extension, "Reclassifying document");
        self.host
            .set_document_language(&document.uri, UMBRELLA_LANGUAGE_ID)?;
        Ok(true)
    }
}
