//! Process manager - lifecycle orchestration

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    child::ManagedChild,
    config::ProcessConfig,
    error::{ProcessError, Result},
};

/// Spawns language server processes with piped stdio
pub struct ProcessManager;

impl ProcessManager {
    /// Create new process manager
    pub fn new() -> Self {
        Self
    }

    /// Spawn a managed process
    ///
    /// stdin and stdout are always piped because they carry the LSP
    /// transport; stderr is piped only when `capture_stderr` is set.
    pub async fn spawn(&self, config: ProcessConfig) -> Result<ManagedChild> {
        if config.command.is_empty() {
            return Err(ProcessError::InvalidConfig("empty command".to_string()));
        }

        debug!(
            command = %config.command,
            args = ?config.args,
            "Spawning process"
        );

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        cmd.kill_on_drop(true);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(if config.capture_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        #[cfg(unix)]
        if config.own_process_group {
            cmd.process_group(0);
        }

        let child = cmd.spawn()?;
        let pid = child.id().ok_or_else(|| {
            ProcessError::SpawnFailed(std::io::Error::new(
                std::io::ErrorKind::Other,
                "Failed to get process ID",
            ))
        })?;

        info!(pid = %pid, command = %config.command, "Process spawned");

        Ok(ManagedChild::new(child, config))
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}
