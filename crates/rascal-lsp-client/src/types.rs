//! Core data structures shared by the sessions and bridges

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Language id shared by every dynamically registered sub-language
pub const UMBRELLA_LANGUAGE_ID: &str = "parametric-rascalmpl";

/// Language id of the base Rascal server
pub const RASCAL_LANGUAGE_ID: &str = "rascalmpl";

/// Metadata describing one dynamically registered sub-language
///
/// Produced by the base server and forwarded verbatim to the parametric server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDescriptor {
    /// Rascal `pathConfig` constructor rendered as a string
    pub path_config: String,
    /// Name of the language
    pub name: String,
    /// File extension without leading dot (may be empty)
    #[serde(default)]
    pub extension: String,
    /// Module that contains `main_function`
    pub main_module: String,
    /// Function contributing the language implementation
    pub main_function: String,
}

impl LanguageDescriptor {
    /// The extension to register, if any
    pub fn registered_extension(&self) -> Option<&str> {
        if self.extension.is_empty() {
            None
        } else {
            Some(&self.extension)
        }
    }
}

/// Payload of the `rascal/showContent` push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseParameter {
    pub uri: String,
    #[serde(default)]
    pub mimetype: String,
    #[serde(default)]
    pub title: String,
}

impl BrowseParameter {
    /// Key identifying the panel for this content
    pub fn panel_key(&self) -> &str {
        if self.title.is_empty() {
            &self.uri
        } else {
            &self.title
        }
    }
}

/// `{uri}` request parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriParameter {
    pub uri: String,
}

/// Response of `rascal/locationContents`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationContent {
    pub content: String,
}

/// Response of `rascal/supplyIDEServicesConfiguration`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeServicesConfiguration {
    pub port: u16,
}

/// Readiness of a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport being established or handshake in flight
    Connecting,
    /// Handshake complete, accepting traffic
    Ready,
    /// Startup failed or the transport closed
    Failed,
    /// Torn down on purpose
    Stopped,
}

impl SessionState {
    /// Whether requests may still be sent
    pub fn is_usable(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Ready)
    }
}

/// How a session reaches its server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Child process spawned by us, LSP over stdio
    Spawned { pid: u32 },
    /// Server already running, LSP over a TCP socket
    Socket { port: u16 },
    /// In-memory or otherwise externally supplied stream
    Attached,
}

/// Which documents a session serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSelector {
    pub scheme: String,
    pub language: String,
}

impl DocumentSelector {
    /// Selector for on-disk files of `language`
    pub fn file(language: impl Into<String>) -> Self {
        Self {
            scheme: "file".to_string(),
            language: language.into(),
        }
    }

    /// Whether a document with this scheme and language id is served
    pub fn matches(&self, scheme: &str, language: &str) -> bool {
        self.scheme == scheme && self.language == language
    }
}

/// A document the editor just opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocumentInfo {
    /// Document URI as the editor reports it
    pub uri: String,
    /// File system path of the document
    pub file_name: PathBuf,
    /// Current language classification
    pub language_id: String,
}

/// Terminal the editor host should open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalSpec {
    pub name: String,
    pub cwd: Option<PathBuf>,
    pub shell_path: PathBuf,
    pub shell_args: Vec<String>,
}

/// Webview panel the editor host should open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSpec {
    pub view_type: String,
    pub title: String,
    pub html: String,
    pub enable_scripts: bool,
}

/// Identifier the editor host assigns to a panel
pub type PanelId = u64;
