//! Editor surfaces the bridge drives

use crate::error::Result;
use crate::types::{PanelId, PanelSpec, TerminalSpec};

/// The editor-side API reached by the bridges
///
/// Implementations must not call back into the bridge while holding their
/// own locks; `dispose_panel` may synchronously report the disposal through
/// [`crate::Extension::panel_disposed`].
pub trait EditorHost: Send + Sync {
    /// Reclassify an open document
    fn set_document_language(&self, uri: &str, language_id: &str) -> Result<()>;

    /// Open a webview panel and return its id
    fn create_panel(&self, spec: PanelSpec) -> Result<PanelId>;

    /// Close a panel previously created with [`EditorHost::create_panel`]
    fn dispose_panel(&self, id: PanelId);

    /// Open and show a terminal
    fn create_terminal(&self, spec: TerminalSpec) -> Result<()>;
}
