//! Bridge configuration: defaults, optional YAML file, environment overrides

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::connect::RetryPolicy;
use crate::error::{BridgeError, Result};
use crate::launch::{HeapPolicy, ServerRole};

/// `true` selects development mode (attach to running servers)
pub const ENV_DEV_MODE: &str = "RASCAL_LSP_DEV";
/// Java installation used to launch servers and terminals
pub const ENV_JAVA_HOME: &str = "JAVA_HOME";
/// Log level override
pub const ENV_LOG_LEVEL: &str = "RASCAL_LSP_LOG";

/// Configuration of the client bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Spawn servers ourselves (`true`) or attach to dev-mode sockets (`false`)
    pub deploy_mode: bool,
    /// Java installation; `java` on `PATH` when unset
    pub java_home: Option<PathBuf>,
    /// Directory containing `assets/jars`
    pub extension_root: PathBuf,
    pub base_dev_port: u16,
    pub parametric_dev_port: u16,
    /// Timeout of client→server requests
    pub request_timeout_ms: u64,
    pub retry: RetryPolicy,
    pub base_heap: HeapPolicy,
    pub parametric_heap: HeapPolicy,
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            deploy_mode: true,
            java_home: None,
            extension_root: PathBuf::from("."),
            base_dev_port: ServerRole::Base.default_dev_port(),
            parametric_dev_port: ServerRole::Parametric.default_dev_port(),
            request_timeout_ms: 60_000,
            retry: RetryPolicy::default(),
            base_heap: HeapPolicy::base_default(),
            parametric_heap: HeapPolicy::parametric_default(),
            log_level: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading bridge configuration from: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::load_from_string(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        info!(
            deploy_mode = config.deploy_mode,
            extension_root = %config.extension_root.display(),
            "Loaded bridge configuration"
        );
        Ok(config)
    }

    /// Parse a YAML document; missing fields take their defaults
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: BridgeConfig = serde_yaml::from_str(content)
            .map_err(|e| BridgeError::Config(format!("Failed to parse YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dev) = lookup(ENV_DEV_MODE) {
            self.deploy_mode = dev.trim() != "true";
        }

        if let Some(home) = lookup(ENV_JAVA_HOME).filter(|h| !h.is_empty()) {
            self.java_home = Some(PathBuf::from(home));
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|l| !l.is_empty()) {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(BridgeError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.retry.attempt_timeout_ms == 0 {
            return Err(BridgeError::Config("retry.attempt_timeout_ms must be non-zero".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(BridgeError::Config("request_timeout_ms must be non-zero".to_string()));
        }
        if self.base_dev_port == 0 || self.parametric_dev_port == 0 {
            return Err(BridgeError::Config("dev ports must be non-zero".to_string()));
        }
        self.base_heap.validate()?;
        self.parametric_heap.validate()?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn dev_port(&self, role: ServerRole) -> u16 {
        match role {
            ServerRole::Base => self.base_dev_port,
            ServerRole::Parametric => self.parametric_dev_port,
        }
    }

    pub fn heap_policy(&self, role: ServerRole) -> &HeapPolicy {
        match role {
            ServerRole::Base => &self.base_heap,
            ServerRole::Parametric => &self.parametric_heap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert!(config.deploy_mode);
        assert_eq!(config.base_dev_port, 8888);
        assert_eq!(config.parametric_dev_port, 9999);
        assert_eq!(config.retry.max_attempts, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dev_mode_flag() {
        let mut config = BridgeConfig::default();
        config.apply_env(env(&[(ENV_DEV_MODE, "true")]));
        assert!(!config.deploy_mode);

        let mut config = BridgeConfig::default();
        config.apply_env(env(&[(ENV_DEV_MODE, "false")]));
        assert!(config.deploy_mode);

        let mut config = BridgeConfig::default();
        config.apply_env(env(&[(ENV_DEV_MODE, "yes")]));
        assert!(config.deploy_mode);
    }

    #[test]
    fn test_java_home_and_log_level() {
        let mut config = BridgeConfig::default();
        config.apply_env(env(&[(ENV_JAVA_HOME, "/opt/jdk"), (ENV_LOG_LEVEL, "debug")]));

        assert_eq!(config.java_home, Some(PathBuf::from("/opt/jdk")));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_empty_java_home_ignored() {
        let mut config = BridgeConfig::default();
        config.apply_env(env(&[(ENV_JAVA_HOME, "")]));
        assert_eq!(config.java_home, None);
    }

    #[test]
    fn test_partial_yaml() {
        let config = BridgeConfig::load_from_string(
            r#"
deploy_mode: false
base_dev_port: 18888
retry:
  max_attempts: 5
parametric_heap:
  tiers:
    - min_total_gib: 64
      max_heap_mib: 8000
  fallback_mib: 1000
"#,
        )
        .unwrap();

        assert!(!config.deploy_mode);
        assert_eq!(config.base_dev_port, 18888);
        assert_eq!(config.parametric_dev_port, 9999);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.step_ms, 250);
        assert_eq!(config.parametric_heap.heap_mib(4 * 1024 * 1024 * 1024), 1000);
        assert_eq!(config.base_heap, HeapPolicy::base_default());
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(BridgeConfig::load_from_string("retry:\n  max_attempts: 0\n").is_err());
        assert!(BridgeConfig::load_from_string("deploy_mode: [").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "extension_root: /opt/rascal-vscode\nrequest_timeout_ms: 500").unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.extension_root, PathBuf::from("/opt/rascal-vscode"));
        assert_eq!(config.request_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_file() {
        let err = BridgeConfig::load(Path::new("/nonexistent/rascal-bridge.yaml")).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
