//! JVM command lines for the language servers and the REPL terminal

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::types::{RASCAL_LANGUAGE_ID, UMBRELLA_LANGUAGE_ID};
use rascal_process::ProcessConfig;

/// Jars shipped with the extension, in classpath order
pub const BUNDLED_JARS: &[&str] = &["rascal-lsp.jar", "rascal.jar", "rascal-core.jar", "typepal.jar"];

/// Entry point of the REPL started in the terminal
pub const TERMINAL_REPL_MAIN: &str = "org.rascalmpl.vscode.lsp.terminal.LSPTerminalREPL";

const LOG_CONFIGURATION_FACTORY: &str =
    "-Dlog4j2.configurationFactory=org.rascalmpl.vscode.lsp.LogRedirectConfiguration";
const LOG_LEVEL: &str = "-Dlog4j2.level=DEBUG";
const DEPLOY_FLAG: &str = "-Drascal.lsp.deploy=true";

/// Separator between classpath entries on this platform
#[cfg(windows)]
pub const PATH_DELIMITER: &str = ";";
#[cfg(not(windows))]
pub const PATH_DELIMITER: &str = ":";

const GIB: u64 = 1024 * 1024 * 1024;

/// The two language servers this client runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerRole {
    /// The Rascal language server
    Base,
    /// The server hosting dynamically registered DSLs
    Parametric,
}

impl ServerRole {
    pub fn language_id(self) -> &'static str {
        match self {
            ServerRole::Base => RASCAL_LANGUAGE_ID,
            ServerRole::Parametric => UMBRELLA_LANGUAGE_ID,
        }
    }

    /// Fully qualified main class of the server
    pub fn entry_point(self) -> &'static str {
        match self {
            ServerRole::Base => "org.rascalmpl.vscode.lsp.rascal.RascalLanguageServer",
            ServerRole::Parametric => "org.rascalmpl.vscode.lsp.parametric.ParametricLanguageServer",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ServerRole::Base => "Rascal MPL Language Server",
            ServerRole::Parametric => "Language Parametric Rascal Language Server",
        }
    }

    /// Port a development-mode server listens on
    pub fn default_dev_port(self) -> u16 {
        match self {
            ServerRole::Base => 8888,
            ServerRole::Parametric => 9999,
        }
    }
}

/// One step of a heap-size table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapTier {
    /// Minimum total physical memory, in GiB
    pub min_total_gib: u64,
    /// Maximum heap handed to the JVM, in MiB
    pub max_heap_mib: u64,
}

/// Maps total physical memory to a `-Xmx` flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapPolicy {
    /// Tiers ordered from largest to smallest threshold
    pub tiers: Vec<HeapTier>,
    /// Heap used below the smallest tier, in MiB
    pub fallback_mib: u64,
}

impl HeapPolicy {
    /// Rascal itself needs at least 800M; the type checker likes 2G or more
    pub fn base_default() -> Self {
        Self::from_table(&[(32, 2500), (16, 1500), (8, 1200)], 800)
    }

    /// Grows with the number of registered DSLs, roughly 400M per language
    pub fn parametric_default() -> Self {
        Self::from_table(&[(32, 2400), (16, 1600), (8, 1200)], 800)
    }

    pub fn for_role(role: ServerRole) -> Self {
        match role {
            ServerRole::Base => Self::base_default(),
            ServerRole::Parametric => Self::parametric_default(),
        }
    }

    fn from_table(table: &[(u64, u64)], fallback_mib: u64) -> Self {
        Self {
            tiers: table
                .iter()
                .map(|&(min_total_gib, max_heap_mib)| HeapTier {
                    min_total_gib,
                    max_heap_mib,
                })
                .collect(),
            fallback_mib,
        }
    }

    /// Heap size in MiB for a machine with `total_memory_bytes` of RAM
    pub fn heap_mib(&self, total_memory_bytes: u64) -> u64 {
        self.tiers
            .iter()
            .find(|tier| total_memory_bytes >= tier.min_total_gib.saturating_mul(GIB))
            .map_or(self.fallback_mib, |tier| tier.max_heap_mib)
    }

    /// `-Xmx` flag for a machine with `total_memory_bytes` of RAM
    pub fn heap_flag(&self, total_memory_bytes: u64) -> String {
        format!("-Xmx{}M", self.heap_mib(total_memory_bytes))
    }

    /// Tiers must be strictly descending so the first match is the largest
    pub fn validate(&self) -> Result<()> {
        let descending = self
            .tiers
            .windows(2)
            .all(|w| w[0].min_total_gib > w[1].min_total_gib);
        if !descending {
            return Err(BridgeError::Config(
                "heap tiers must be ordered by descending min_total_gib".to_string(),
            ));
        }
        if self.fallback_mib == 0 || self.tiers.iter().any(|t| t.max_heap_mib == 0) {
            return Err(BridgeError::Config("heap sizes must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Total physical memory of this machine in bytes
pub fn total_memory_bytes() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    system.total_memory()
}

/// Absolute paths of the bundled jars joined into a classpath
pub fn bundled_classpath(extension_root: &Path) -> String {
    BUNDLED_JARS
        .iter()
        .map(|jar| jar_path(extension_root, jar).display().to_string())
        .collect::<Vec<_>>()
        .join(PATH_DELIMITER)
}

fn jar_path(extension_root: &Path, jar: &str) -> PathBuf {
    extension_root.join("assets").join("jars").join(jar)
}

/// Bundled classpath extended with project entries supplied by the server
pub fn terminal_classpath(extension_root: &Path, project_entries: &[String]) -> String {
    let mut classpath = bundled_classpath(extension_root);
    if !project_entries.is_empty() {
        classpath.push_str(PATH_DELIMITER);
        classpath.push_str(&project_entries.join(PATH_DELIMITER));
    }
    classpath
}

/// Name of the java binary on this platform
pub fn java_binary_name() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// Locate the java executable
///
/// `JAVA_HOME/bin/java` wins when a Java home is configured; otherwise
/// `java` is looked up on `PATH`.
pub fn java_executable(java_home: Option<&Path>) -> Result<PathBuf> {
    match java_home {
        Some(home) => {
            let candidate = home.join("bin").join(java_binary_name());
            if candidate.is_file() {
                Ok(candidate)
            } else {
                Err(BridgeError::ExecutableNotFound(format!(
                    "{} does not exist",
                    candidate.display()
                )))
            }
        }
        None => which::which(java_binary_name()).map_err(|e| {
            BridgeError::ExecutableNotFound(format!("{} not on PATH: {}", java_binary_name(), e))
        }),
    }
}

/// Everything needed to start one server process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub role: ServerRole,
    pub executable: PathBuf,
    pub args: Vec<String>,
}

impl LaunchPlan {
    /// Build the JVM command line for `role`
    pub fn new(
        role: ServerRole,
        executable: PathBuf,
        extension_root: &Path,
        heap: &HeapPolicy,
        total_memory_bytes: u64,
    ) -> Self {
        let classpath = bundled_classpath(extension_root);
        let args = vec![
            LOG_CONFIGURATION_FACTORY.to_string(),
            LOG_LEVEL.to_string(),
            DEPLOY_FLAG.to_string(),
            format!("-Drascal.compilerClasspath={}", classpath),
            heap.heap_flag(total_memory_bytes),
            "-cp".to_string(),
            classpath,
            role.entry_point().to_string(),
        ];

        debug!(
            role = ?role,
            heap = %heap.heap_flag(total_memory_bytes),
            "Planned language server launch"
        );

        Self {
            role,
            executable,
            args,
        }
    }

    pub fn process_config(&self) -> ProcessConfig {
        ProcessConfig::new(self.executable.display().to_string()).args(self.args.iter().cloned())
    }
}

/// Shell arguments starting the REPL against the IDE services port
pub fn terminal_args(classpath: String, ide_services_port: u16) -> Vec<String> {
    vec![
        "-cp".to_string(),
        classpath,
        TERMINAL_REPL_MAIN.to_string(),
        "--ideServicesPort".to_string(),
        ide_services_port.to_string(),
    ]
}
