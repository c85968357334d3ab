//! Operator configuration loading.
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. The TOML file given on the command line (skipped if it does not exist)
//! 3. Environment variables: `SLURMDBD_*`
//!
//! # Example Config
//!
//! ```toml
//! state_file = "/var/lib/slurmdbd-operator/state.json"
//!
//! [service]
//! hostname = "slurmdbd-0"
//! port = 6819
//! config_path = "/etc/slurm/slurmdbd.conf"
//! restart_command = ["systemctl", "restart", "slurmdbd"]
//!
//! [options]
//! debug_level = "info"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Operator-supplied key/value settings, merged verbatim into the rendered
/// daemon configuration.
pub type Options = BTreeMap<String, serde_json::Value>;

/// Default port slurmdbd listens on.
pub const DEFAULT_SLURMDBD_PORT: u16 = 6819;

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION STRUCTURES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OperatorConfig {
    /// JSON file holding durable unit state between invocations.
    pub state_file: PathBuf,
    pub service: ServiceConfig,
    pub options: Options,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Where the rendered slurmdbd configuration is written.
    pub config_path: PathBuf,
    /// Present once the package install completed.
    pub install_marker: PathBuf,
    pub install_command: Vec<String>,
    pub restart_command: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════════════════
// DEFAULT IMPLEMENTATIONS
// ═══════════════════════════════════════════════════════════════════════════

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("/var/lib/slurmdbd-operator/state.json"),
            service: ServiceConfig::default(),
            options: Options::new(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: DEFAULT_SLURMDBD_PORT,
            config_path: PathBuf::from("/etc/slurm/slurmdbd.conf"),
            install_marker: PathBuf::from("/var/lib/slurmdbd-operator/installed"),
            install_command: vec![
                "apt-get".to_string(),
                "install".to_string(),
                "-y".to_string(),
                "slurmdbd".to_string(),
            ],
            restart_command: vec![
                "systemctl".to_string(),
                "restart".to_string(),
                "slurmdbd".to_string(),
            ],
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PUBLIC API
// ═══════════════════════════════════════════════════════════════════════════

impl OperatorConfig {
    /// Load configuration from defaults, the given file and the environment.
    ///
    /// A missing file is not an error; the built-in defaults are used.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The file exists but cannot be read
    /// - The TOML is malformed
    /// - An environment override cannot be parsed
    /// - The resulting values fail validation
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            load_toml_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::toml_parse_failed("<inline>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SLURMDBD_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns error if `SLURMDBD_PORT` is not a valid port number.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SLURMDBD_HOSTNAME") {
            self.service.hostname = value;
        }

        if let Some(value) = lookup("SLURMDBD_PORT") {
            self.service.port = value
                .parse()
                .map_err(|e| Error::invalid_config(format!("Invalid SLURMDBD_PORT value: {e}")))?;
        }

        if let Some(value) = lookup("SLURMDBD_STATE_FILE") {
            self.state_file = PathBuf::from(value);
        }

        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns error if a required value is empty.
    pub fn validate(&self) -> Result<()> {
        if self.service.hostname.trim().is_empty() {
            return Err(Error::invalid_config("service.hostname must not be empty"));
        }
        if self.service.install_command.is_empty() {
            return Err(Error::invalid_config(
                "service.install_command must not be empty",
            ));
        }
        if self.service.restart_command.is_empty() {
            return Err(Error::invalid_config(
                "service.restart_command must not be empty",
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════

/// Load a TOML file into a Config
///
/// # Errors
///
/// Returns error if:
/// - File cannot be read
/// - TOML is malformed
fn load_toml_file(path: &Path) -> Result<OperatorConfig> {
    let content =
        std::fs::read_to_string(path).map_err(|e| Error::file_read_failed(path, e.to_string()))?;

    toml::from_str(&content).map_err(|e| Error::toml_parse_failed(path, e.to_string()))
}
