//! REPL terminals connected to the base server's IDE services

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use url::Url;

use crate::error::Result;
use crate::host::EditorHost;
use crate::launch::{terminal_args, terminal_classpath};
use crate::protocol::methods;
use crate::session::ClientSession;
use crate::types::{IdeServicesConfiguration, TerminalSpec, UriParameter};

pub const TERMINAL_NAME: &str = "Rascal Terminal";

/// Opens terminals running the Rascal REPL for a document's project
pub struct TerminalLauncher {
    session: Arc<ClientSession>,
    host: Arc<dyn EditorHost>,
    extension_root: PathBuf,
    java: PathBuf,
}

impl TerminalLauncher {
    pub fn new(
        session: Arc<ClientSession>,
        host: Arc<dyn EditorHost>,
        extension_root: impl Into<PathBuf>,
        java: impl Into<PathBuf>,
    ) -> Self {
        Self {
            session,
            host,
            extension_root: extension_root.into(),
            java: java.into(),
        }
    }

    /// Ask the server for its services port and the project classpath, then
    /// open the terminal
    pub async fn create_terminal(&self, document_uri: &str) -> Result<TerminalSpec> {
        let services: IdeServicesConfiguration = self
            .session
            .send_request(methods::SUPPLY_IDE_SERVICES_CONFIGURATION, ())
            .await?;

        let project_classpath: Vec<String> = self
            .session
            .send_request(
                methods::SUPPLY_PROJECT_COMPILATION_CLASSPATH,
                UriParameter {
                    uri: document_uri.to_string(),
                },
            )
            .await?;

        let spec = TerminalSpec {
            name: TERMINAL_NAME.to_string(),
            cwd: working_directory(document_uri),
            shell_path: self.java.clone(),
            shell_args: terminal_args(
                terminal_classpath(&self.extension_root, &project_classpath),
                services.port,
            ),
        };

        info!(
            uri = document_uri,
            ide_services_port = services.port,
            project_entries = project_classpath.len(),
            "Opening Rascal terminal"
        );
        self.host.create_terminal(spec.clone())?;
        Ok(spec)
    }
}

/// Directory containing the document, for `file:` URIs only
pub fn working_directory(document_uri: &str) -> Option<PathBuf> {
    let url = Url::parse(document_uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path()
        .ok()?
        .parent()
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_working_directory_of_file_uri() {
        assert_eq!(
            working_directory("file:///home/user/pico/src/Syntax.rsc"),
            Some(PathBuf::from("/home/user/pico/src"))
        );
        assert_eq!(
            working_directory("file:///home/user/my%20project/Main.rsc"),
            Some(PathBuf::from("/home/user/my project"))
        );
    }

    #[test]
    fn test_non_file_uri_has_no_working_directory() {
        assert_eq!(working_directory("project://pico/src/Syntax.rsc"), None);
        assert_eq!(working_directory("untitled:Untitled-1"), None);
        assert_eq!(working_directory("not a uri"), None);
    }
}
