//! Managed child process wrapper

use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, warn};

use crate::{
    config::ProcessConfig,
    error::{ProcessError, Result},
};

/// How long to wait for a killed process to be reaped
const REAP_TIMEOUT_MS: u64 = 5000;

/// Wrapper around tokio::process::Child with lifecycle management
pub struct ManagedChild {
    /// Underlying tokio child process
    child: Child,
    /// Process configuration
    config: ProcessConfig,
    /// Process ID
    pid: u32,
}

impl ManagedChild {
    /// Create new managed child
    pub(crate) fn new(child: Child, config: ProcessConfig) -> Self {
        let pid = child.id().unwrap_or(0);
        Self { child, config, pid }
    }

    /// Get process ID
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Get process configuration
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Check if process is still running
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Fail with [`ProcessError::ExitedEarly`] if the process has already exited
    pub fn ensure_running(&mut self) -> Result<()> {
        match self.child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => Err(ProcessError::ExitedEarly {
                pid: self.pid,
                status: status.to_string(),
            }),
            Err(e) => Err(ProcessError::SpawnFailed(e)),
        }
    }

    /// Wait for process to exit
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child.wait().await.map_err(Into::into)
    }

    /// Wait for process to exit, giving up after `timeout`
    pub async fn wait_timeout(&mut self, timeout: Duration) -> Result<ExitStatus> {
        tokio::time::timeout(timeout, self.child.wait())
            .await
            .map_err(|_| ProcessError::Timeout {
                millis: timeout.as_millis() as u64,
            })?
            .map_err(Into::into)
    }

    /// Forcibly terminate the process (SIGKILL, no grace period)
    ///
    /// On Unix the whole process group is signalled when the child was
    /// spawned as a group leader, so JVM helper processes die with it.
    pub async fn force_kill(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        debug!(pid = %self.pid, command = %self.config.command, "Force killing process");

        self.send_kill()?;

        match self
            .wait_timeout(Duration::from_millis(REAP_TIMEOUT_MS))
            .await
        {
            Ok(status) => {
                debug!(pid = %self.pid, %status, "Process terminated");
                Ok(())
            }
            Err(e) => {
                warn!(pid = %self.pid, error = %e, "Process did not terminate after kill");
                Err(e)
            }
        }
    }

    #[cfg(unix)]
    fn send_kill(&mut self) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if self.config.own_process_group {
            match killpg(Pid::from_raw(self.pid as i32), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => return Ok(()),
                Err(e) => {
                    warn!(pid = %self.pid, error = %e, "Failed to signal process group, killing process only");
                }
            }
        }

        self.child
            .start_kill()
            .map_err(|e| ProcessError::KillFailed(e.to_string()))
    }

    #[cfg(not(unix))]
    fn send_kill(&mut self) -> Result<()> {
        self.child
            .start_kill()
            .map_err(|e| ProcessError::KillFailed(e.to_string()))
    }

    /// Take stdin handle
    pub fn stdin(&mut self) -> Option<tokio::process::ChildStdin> {
        self.child.stdin.take()
    }

    /// Take stdout handle
    pub fn stdout(&mut self) -> Option<tokio::process::ChildStdout> {
        self.child.stdout.take()
    }

    /// Take stderr handle
    pub fn stderr(&mut self) -> Option<tokio::process::ChildStderr> {
        self.child.stderr.take()
    }
}
impl Drop for ManagedChild {
    /// Kill the process (group) if it is still running
    fn drop(&mut self) {
        if !self.is_running() {
            return;
        }
        debug!(pid = %self.pid, command = %self.config.command, "Killing process on drop");
        if let Err(e) = self.send_kill() {
            warn!(pid = %self.pid, error = %e, "Failed to kill process on drop");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ProcessManager;

    /// Whether `pid` is a live (non-zombie) process
    #[cfg(target_os = "linux")]
    fn is_alive(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_drop_kills_process() {
        let manager = ProcessManager::new();
        let config = ProcessConfig::new("sleep").args(["30"]);

        let child = manager.spawn(config).await.unwrap();
        let pid = child.pid();
        assert!(is_alive(pid));

        drop(child);

        for _ in 0..100 {
            if !is_alive(pid) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("process {} survived drop of its handle", pid);
    }

    #[tokio::test]
    async fn test_is_running() {
        let manager = ProcessManager::new();
        let config = ProcessConfig::new("sleep").args(["1"]);

        let mut child = manager.spawn(config).await.unwrap();
        assert!(child.is_running());

        child.wait().await.unwrap();
        assert!(!child.is_running());
    }

    #[tokio::test]
    async fn test_force_kill() {
        let manager = ProcessManager::new();
        let config = ProcessConfig::new("sleep").args(["30"]);

        let mut child = manager.spawn(config).await.unwrap();
        assert!(child.is_running());

        child.force_kill().await.unwrap();
        assert!(!child.is_running());
    }

    #[tokio::test]
    async fn test_force_kill_without_process_group() {
        let manager = ProcessManager::new();
        let config = ProcessConfig::new("sleep")
            .args(["30"])
            .own_process_group(false);

        let mut child = manager.spawn(config).await.unwrap();
        child.force_kill().await.unwrap();
        assert!(!child.is_running());
    }

    #[tokio::test]
    async fn test_ensure_running_reports_early_exit() {
        let manager = ProcessManager::new();
        let config = ProcessConfig::new("sh").args(["-c", "exit 3"]);

        let mut child = manager.spawn(config).await.unwrap();
        child.wait().await.unwrap();

        let err = child.ensure_running().unwrap_err();
        assert!(matches!(err, ProcessError::ExitedEarly { .. }));
    }

    #[tokio::test]
    async fn test_force_kill_after_exit_is_noop() {
        let manager = ProcessManager::new();
        let config = ProcessConfig::new("true");

        let mut child = manager.spawn(config).await.unwrap();
        child.wait().await.unwrap();
        child.force_kill().await.unwrap();
    }
}
