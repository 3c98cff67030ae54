//! Process configuration

use std::collections::HashMap;
use std::path::PathBuf;

/// Configuration for spawning a language server process
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Executable command
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Working directory (None = current dir)
    pub working_dir: Option<PathBuf>,
    /// Environment variables (added to parent env)
    pub env: HashMap<String, String>,
    /// Pipe stderr so it can be forwarded to the log
    pub capture_stderr: bool,
    /// Put the child in its own process group so teardown reaches its descendants
    pub own_process_group: bool,
}

impl ProcessConfig {
    /// Create new process configuration
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: vec![],
            working_dir: None,
            env: HashMap::new(),
            capture_stderr: true,
            own_process_group: true,
        }
    }

    /// Set command arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Enable/disable stderr capture
    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    /// Enable/disable a dedicated process group
    pub fn own_process_group(mut self, enabled: bool) -> Self {
        self.own_process_group = enabled;
        self
    }

    /// Render the command line for logs and diagnostics
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
