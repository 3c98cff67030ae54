//! Client bootstrap connecting an editor to the Rascal language servers
//!
//! Two language servers back the editor: the base Rascal server and a
//! parametric server hosting languages that are declared at run time. This
//! crate starts a [`ClientSession`] for each, either by spawning a JVM and
//! speaking LSP over its stdio or by attaching to a development server's
//! socket with bounded retry, and bridges the custom `rascal/*` traffic to
//! an [`EditorHost`]:
//!
//! - languages announced by the base server are forwarded to the parametric
//!   server and their file extensions claimed for the umbrella language;
//! - `rascal/showContent` pushes become webview panels, one per title;
//! - virtual `project:`, `std:` and `lib:` documents are served on demand;
//! - REPL terminals are launched against the server's IDE services port.
//!
//! [`Extension`] ties everything together.

pub mod bridge;
pub mod config;
pub mod connect;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod extension;
pub mod host;
pub mod launch;
pub mod logging;
pub mod manager;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod terminal;
pub mod transport;
pub mod types;

pub use bridge::{render_panel_html, ContentDisplayBridge, ContentProvider, LanguageRegistrationBridge};
pub use config::BridgeConfig;
pub use connect::{connect, connect_with, Dialer, RetryMachine, RetryPhase, RetryPolicy, TcpDialer};
pub use dispatch::DispatchTable;
pub use error::{BridgeError, Result};
pub use extension::{Extension, StartupFailure};
pub use host::EditorHost;
pub use launch::{HeapPolicy, HeapTier, LaunchPlan, ServerRole};
pub use logging::init_logging;
pub use manager::SessionManager;
pub use registry::ExtensionRegistry;
pub use session::{ClientSession, SessionSpec};
pub use terminal::TerminalLauncher;
pub use transport::Transport;
pub use types::*;
