use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use rascal_lsp_client::launch::{java_executable, total_memory_bytes};
use rascal_lsp_client::*;
use tracing::info;

#[derive(Parser)]
#[command(name = "rascal-bridge")]
#[command(about = "Developer tooling for the Rascal language server client")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach to a development server and run the LSP handshake
    Probe {
        /// Port the server listens on
        #[arg(short, long, default_value_t = 8888)]
        port: u16,
    },
    /// Print the contents of a virtual document
    Content {
        /// Port of the base server
        #[arg(short, long, default_value_t = 8888)]
        port: u16,

        /// Location such as std:///IO.rsc
        uri: String,
    },
    /// Print the JVM command line chosen for this machine
    LaunchPlan {
        #[arg(short, long, value_enum, default_value = "base")]
        role: RoleArg,
    },
    /// Attach to both development servers and log pushed content until Ctrl-C
    Attach,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Base,
    Parametric,
}

impl From<RoleArg> for ServerRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Base => ServerRole::Base,
            RoleArg::Parametric => ServerRole::Parametric,
        }
    }
}

/// Editor host without an editor: every surface is logged
#[derive(Default)]
struct HeadlessHost {
    next_panel: AtomicU64,
}

impl EditorHost for HeadlessHost {
    fn set_document_language(&self, uri: &str, language_id: &str) -> Result<()> {
        info!(uri, language_id, "Document language changed");
        Ok(())
    }

    fn create_panel(&self, spec: PanelSpec) -> Result<PanelId> {
        let id = self.next_panel.fetch_add(1, Ordering::SeqCst) + 1;
        info!(panel = id, title = %spec.title, "Panel opened");
        println!("{}", spec.html);
        Ok(id)
    }

    fn dispose_panel(&self, id: PanelId) {
        info!(panel = id, "Panel closed");
    }

    fn create_terminal(&self, spec: TerminalSpec) -> Result<()> {
        info!(name = %spec.name, shell = %spec.shell_path.display(), args = ?spec.shell_args, "Terminal requested");
        Ok(())
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BridgeConfig> {
    let config = match path {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::from_env()?,
    };
    Ok(config)
}

async fn attach_session(port: u16, config: &BridgeConfig) -> anyhow::Result<Arc<ClientSession>> {
    let transport = Transport::connect(port, &config.retry)
        .await
        .with_context(|| format!("attaching to 127.0.0.1:{}", port))?;
    let session = ClientSession::start(
        SessionSpec::for_role(ServerRole::Base),
        transport,
        DispatchTable::new(),
        config.request_timeout(),
    )
    .await?;
    Ok(session)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_logging(&config.log_level, cli.verbose);

    match cli.command {
        Commands::Probe { port } => {
            let session = attach_session(port, &config).await?;
            println!("Server on port {} is {:?}", port, session.state());
            session.terminate().await;
        }
        Commands::Content { port, uri } => {
            let session = attach_session(port, &config).await?;
            let content = ContentProvider::new(Arc::clone(&session))
                .provide_content(&uri)
                .await
                .with_context(|| format!("fetching {}", uri))?;
            print!("{}", content);
            session.terminate().await;
        }
        Commands::LaunchPlan { role } => {
            let role = ServerRole::from(role);
            let java = java_executable(config.java_home.as_deref())?;
            let total = total_memory_bytes();
            let plan = LaunchPlan::new(
                role,
                java,
                &config.extension_root,
                config.heap_policy(role),
                total,
            );
            println!("{}", plan.process_config().command_line());
        }
        Commands::Attach => {
            let config = BridgeConfig {
                deploy_mode: false,
                ..config
            };
            let extension = Extension::activate(config, Arc::new(HeadlessHost::default())).await?;
            for failure in extension.startup_failures() {
                eprintln!("{:?} server unavailable: {}", failure.role, failure.reason);
            }
            tokio::signal::ctrl_c().await?;
            extension.deactivate().await;
        }
    }

    Ok(())
}
