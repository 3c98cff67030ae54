//! # rascal-process
//!
//! Process lifecycle management for the language servers started by the
//! Rascal LSP client bridge.
//!
//! ## Features
//!
//! - **Process Spawning**: Async process creation with piped stdio for the LSP transport
//! - **PID Tracking**: Every managed child knows its process id
//! - **Forced Teardown**: SIGKILL delivered to the whole process group on Unix
//! - **Early Exit Detection**: Distinguish a server that died during startup from one still booting
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rascal_process::{ProcessConfig, ProcessManager};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ProcessManager::new();
//!
//! let config = ProcessConfig::new("java")
//!     .args(["-cp", "rascal-lsp.jar", "org.rascalmpl.vscode.lsp.rascal.RascalLanguageServer"]);
//!
//! let mut child = manager.spawn(config).await?;
//! let _stdin = child.stdin();
//!
//! child.force_kill().await?;
//! # Ok(())
//! # }
//! ```

pub mod child;
pub mod config;
pub mod error;
pub mod manager;

pub use child::ManagedChild;
pub use config::ProcessConfig;
pub use error::{ProcessError, Result};
pub use manager::ProcessManager;
