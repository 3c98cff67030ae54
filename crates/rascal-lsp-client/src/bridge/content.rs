//! Server-driven content panels and virtual documents

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::host::EditorHost;
use crate::protocol::methods;
use crate::session::ClientSession;
use crate::types::{BrowseParameter, LocationContent, PanelId, PanelSpec, UriParameter};

/// View type of content panels
pub const PANEL_VIEW_TYPE: &str = "text/html";

/// Capabilities granted to the embedded page
pub const CONTENT_SANDBOX: &str =
    "allow-scripts allow-forms allow-same-origin allow-pointer-lock allow-downloads allow-top-navigation";

/// URI schemes served by [`ContentProvider`]
pub const VIRTUAL_SCHEMES: &[&str] = &["project", "std", "lib"];

/// Shows pushed content, one panel per title
pub struct ContentDisplayBridge {
    host: Arc<dyn EditorHost>,
    panels: Mutex<HashMap<String, PanelId>>,
}

impl ContentDisplayBridge {
    pub fn new(host: Arc<dyn EditorHost>) -> Self {
        Self {
            host,
            panels: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the panel for `params`' title with a fresh one
    pub fn show_content(&self, params: &BrowseParameter) -> Result<PanelId> {
        let key = params.panel_key().to_string();

        let previous = self.panels.lock().remove(&key);
        if let Some(old) = previous {
            debug!(title = %key, panel = old, "Disposing previous content panel");
            self.host.dispose_panel(old);
        }

        let id = self.host.create_panel(PanelSpec {
            view_type: PANEL_VIEW_TYPE.to_string(),
            title: key.clone(),
            html: render_panel_html(&params.uri),
            enable_scripts: true,
        })?;

        info!(title = %key, uri = %params.uri, panel = id, "Showing content");

        // Another push for the same title may have raced us
        let stale = self.panels.lock().insert(key, id);
        if let Some(stale) = stale {
            self.host.dispose_panel(stale);
        }
        Ok(id)
    }

    /// Forget a panel the user closed; returns whether it was tracked
    pub fn panel_disposed(&self, id: PanelId) -> bool {
        let mut panels = self.panels.lock();
        let before = panels.len();
        panels.retain(|_, panel| *panel != id);
        before != panels.len()
    }

    /// Panel currently showing `title`
    pub fn panel_for(&self, title: &str) -> Option<PanelId> {
        self.panels.lock().get(title).copied()
    }

    pub fn active_panels(&self) -> usize {
        self.panels.lock().len()
    }
}

/// HTML document embedding `uri` in a sandboxed full-size iframe
pub fn render_panel_html(uri: &str) -> String {
    let uri = escape_html(uri);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body>
<iframe
    id="iframe-rascal-content"
    src="{uri}"
    frameborder="0"
    sandbox="{sandbox}"
    style="display: block; margin: 0px; overflow: hidden; position: absolute; width: 100%; height: 100%; visibility: visible;"
>
Loading {uri}...
</iframe>
</body>
</html>"#,
        uri = uri,
        sandbox = CONTENT_SANDBOX,
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Serves virtual documents from the base server
#[derive(Debug, Clone)]
pub struct ContentProvider {
    session: Arc<ClientSession>,
}

impl ContentProvider {
    pub fn new(session: Arc<ClientSession>) -> Self {
        Self { session }
    }

    pub fn handles_scheme(scheme: &str) -> bool {
        VIRTUAL_SCHEMES.contains(&scheme)
    }

    /// Text of the virtual document at `uri`, as the server returns it
    pub async fn provide_content(&self, uri: &str) -> Result<String> {
        let reply: LocationContent = self
            .session
            .send_request(
                methods::LOCATION_CONTENTS,
                UriParameter {
                    uri: uri.to_string(),
                },
            )
            .await?;
        Ok(reply.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::types::TerminalSpec;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct PanelHost {
        next_id: AtomicU64,
        created: Mutex<Vec<(PanelId, PanelSpec)>>,
        disposed: Mutex<Vec<PanelId>>,
    }

    impl EditorHost for PanelHost {
        fn set_document_language(&self, _uri: &str, _language_id: &str) -> Result<()> {
            Ok(())
        }

        fn create_panel(&self, spec: PanelSpec) -> Result<PanelId> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.created.lock().push((id, spec));
            Ok(id)
        }

        fn dispose_panel(&self, id: PanelId) {
            self.disposed.lock().push(id);
        }

        fn create_terminal(&self, _spec: TerminalSpec) -> Result<()> {
            Err(BridgeError::Host("no terminals".to_string()))
        }
    }

    fn browse(uri: &str, title: &str) -> BrowseParameter {
        BrowseParameter {
            uri: uri.to_string(),
            mimetype: "text/html".to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_same_title_replaces_panel() {
        let host = Arc::new(PanelHost::default());
        let bridge = ContentDisplayBridge::new(host.clone());

        let first = bridge.show_content(&browse("http://localhost:9050/", "Graph")).unwrap();
        let second = bridge.show_content(&browse("http://localhost:9051/", "Graph")).unwrap();

        assert_ne!(first, second);
        assert_eq!(*host.disposed.lock(), vec![first]);
        assert_eq!(bridge.active_panels(), 1);
        assert_eq!(bridge.panel_for("Graph"), Some(second));

        let created = host.created.lock();
        assert_eq!(created[1].1.title, "Graph");
        assert_eq!(created[1].1.view_type, "text/html");
        assert!(created[1].1.enable_scripts);
        assert!(created[1].1.html.contains(r#"src="http://localhost:9051/""#));
    }

    #[test]
    fn test_distinct_titles_coexist() {
        let host = Arc::new(PanelHost::default());
        let bridge = ContentDisplayBridge::new(host.clone());

        bridge.show_content(&browse("http://localhost:1/", "A")).unwrap();
        bridge.show_content(&browse("http://localhost:2/", "B")).unwrap();

        assert_eq!(bridge.active_panels(), 2);
        assert!(host.disposed.lock().is_empty());
    }

    #[test]
    fn test_untitled_content_keyed_by_uri() {
        let host = Arc::new(PanelHost::default());
        let bridge = ContentDisplayBridge::new(host.clone());

        let id = bridge.show_content(&browse("http://localhost:3/", "")).unwrap();
        assert_eq!(bridge.panel_for("http://localhost:3/"), Some(id));
    }

    #[test]
    fn test_user_disposal_forgets_panel() {
        let host = Arc::new(PanelHost::default());
        let bridge = ContentDisplayBridge::new(host.clone());

        let id = bridge.show_content(&browse("http://localhost:1/", "A")).unwrap();
        assert!(bridge.panel_disposed(id));
        assert!(!bridge.panel_disposed(id));
        assert_eq!(bridge.active_panels(), 0);

        bridge.show_content(&browse("http://localhost:1/", "A")).unwrap();
        assert!(host.disposed.lock().is_empty());
    }

    #[test]
    fn test_rendered_html_is_sandboxed_and_escaped() {
        let html = render_panel_html(r#"http://localhost:9050/?q="x"&y=<z>"#);

        assert!(html.contains(&format!(r#"sandbox="{}""#, CONTENT_SANDBOX)));
        assert!(html.contains("http://localhost:9050/?q=&quot;x&quot;&amp;y=&lt;z&gt;"));
        assert!(!html.contains(r#"q="x""#));
    }

    #[test]
    fn test_virtual_schemes() {
        assert!(ContentProvider::handles_scheme("project"));
        assert!(ContentProvider::handles_scheme("std"));
        assert!(ContentProvider::handles_scheme("lib"));
        assert!(!ContentProvider::handles_scheme("file"));
    }
}
