//! Byte streams carrying LSP traffic to a server

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::connect::{self, RetryPolicy};
use crate::error::{BridgeError, Result};
use crate::types::TransportKind;
use rascal_process::{ManagedChild, ProcessConfig, ProcessManager};

pub type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Read and write halves of a server connection
pub struct Transport {
    pub kind: TransportKind,
    pub reader: BoxReader,
    pub writer: BoxWriter,
    /// The spawned server, kept so it can be killed on teardown
    pub child: Option<ManagedChild>,
}

impl Transport {
    /// Wrap an already established stream pair
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            kind: TransportKind::Attached,
            reader: Box::new(reader),
            writer: Box::new(writer),
            child: None,
        }
    }

    /// Use a connected socket
    pub fn socket(stream: TcpStream, port: u16) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            kind: TransportKind::Socket { port },
            reader: Box::new(reader),
            writer: Box::new(writer),
            child: None,
        }
    }

    /// Attach to a development server, retrying per `policy`
    pub async fn connect(port: u16, policy: &RetryPolicy) -> Result<Self> {
        let stream = connect::connect(port, policy).await?;
        Ok(Self::socket(stream, port))
    }

    /// Spawn a server and talk to it over its stdio
    ///
    /// Anything the server writes to stderr is forwarded to the log under
    /// `label`.
    pub async fn spawn(config: ProcessConfig, label: &str) -> Result<Self> {
        let mut child = ProcessManager::new().spawn(config).await?;
        let pid = child.pid();

        let stdin = child
            .stdin()
            .ok_or_else(|| BridgeError::Protocol("Spawned server has no stdin".to_string()))?;
        let stdout = child
            .stdout()
            .ok_or_else(|| BridgeError::Protocol("Spawned server has no stdout".to_string()))?;

        if let Some(stderr) = child.stderr() {
            let label = label.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "rascal_lsp_client::server", server = %label, "{}", line);
                }
            });
        }

        info!(pid, server = %label, "Language server process started");

        Ok(Self {
            kind: TransportKind::Spawned { pid },
            reader: Box::new(stdout),
            writer: Box::new(stdin),
            child: Some(child),
        })
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("kind", &self.kind).finish()
    }
}
