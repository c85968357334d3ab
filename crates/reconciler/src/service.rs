//! Service management for the slurmdbd daemon.
//!
//! [`ServiceManager`] is the only place side effects on the host happen:
//! installing the package, writing the configuration file and restarting the
//! daemon.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use itertools::Itertools;
use serde_json::Value;
use slurmdbd_core::ServiceConfig;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{NetworkIdentity, RenderedConfig};

/// Trait for installing, configuring and restarting slurmdbd.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Install the slurmdbd package and anything it needs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstallFailed`] if the install cannot complete.
    async fn prepare_system_for_slurm(&self) -> Result<()>;

    /// Write `config` and restart the daemon.
    ///
    /// Either the new configuration is fully in place and the daemon was
    /// restarted, or an error is returned; a half-written file is never left
    /// behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RestartFailed`] if writing or restarting fails.
    async fn render_config_and_restart(&self, config: &RenderedConfig) -> Result<()>;

    /// Hostname the daemon is reachable on.
    fn hostname(&self) -> &str;

    /// Port the daemon listens on.
    fn port(&self) -> u16;

    /// Whether the slurmdbd package is installed.
    async fn slurm_installed(&self) -> bool;

    /// Hostname and port together.
    fn identity(&self) -> NetworkIdentity {
        NetworkIdentity::new(self.hostname(), self.port())
    }
}

/// Render a configuration as `key=value` lines in key order.
pub fn render_conf(config: &RenderedConfig) -> String {
    let body = config
        .iter()
        .map(|(key, value)| format!("{key}={}", render_value(value)))
        .join("\n");
    format!("# Managed by slurmdbd-operator; local changes are overwritten.\n{body}\n")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Service manager that shells out to the host package and init tooling.
pub struct SystemServiceManager {
    hostname: String,
    port: u16,
    config_path: PathBuf,
    install_marker: PathBuf,
    install_command: Vec<String>,
    restart_command: Vec<String>,
}

impl SystemServiceManager {
    /// Build from operator configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if either command is empty.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        if config.install_command.is_empty() || config.restart_command.is_empty() {
            return Err(Error::invalid_config(
                "install and restart commands must not be empty",
            ));
        }
        Ok(Self {
            hostname: config.hostname.clone(),
            port: config.port,
            config_path: config.config_path.clone(),
            install_marker: config.install_marker.clone(),
            install_command: config.install_command.clone(),
            restart_command: config.restart_command.clone(),
        })
    }

    /// Path the configuration is rendered to.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

#[async_trait]
impl ServiceManager for SystemServiceManager {
    async fn prepare_system_for_slurm(&self) -> Result<()> {
        if self.slurm_installed().await {
            info!(marker = %self.install_marker.display(), "slurmdbd already installed");
            return Ok(());
        }

        run_command(&self.install_command)
            .await
            .map_err(Error::install_failed)?;
        write_atomically(&self.install_marker, b"installed\n")
            .await
            .map_err(Error::install_failed)?;

        info!("slurmdbd installed");
        Ok(())
    }

    async fn render_config_and_restart(&self, config: &RenderedConfig) -> Result<()> {
        let rendered = render_conf(config);
        write_atomically(&self.config_path, rendered.as_bytes())
            .await
            .map_err(Error::restart_failed)?;
        debug!(path = %self.config_path.display(), keys = config.len(), "Configuration written");

        run_command(&self.restart_command)
            .await
            .map_err(Error::restart_failed)?;
        info!("slurmdbd restarted");
        Ok(())
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn slurm_installed(&self) -> bool {
        tokio::fs::try_exists(&self.install_marker)
            .await
            .unwrap_or(false)
    }
}

async fn write_atomically(path: &Path, contents: &[u8]) -> std::result::Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("cannot create {}: {e}", parent.display()))?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| format!("cannot write {}: {e}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| format!("cannot replace {}: {e}", path.display()))
}

async fn run_command(argv: &[String]) -> std::result::Result<(), String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| "empty command".to_string())?;

    debug!(command = %argv.join(" "), "Running command");
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| format!("failed to run '{program}': {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "'{}' exited with {}: {}",
            argv.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

/// In-memory service manager for testing.
///
/// Records every successful render and can be told to fail.
pub struct RecordingServiceManager {
    hostname: String,
    port: u16,
    installed: AtomicBool,
    fail_install: AtomicBool,
    fail_restart: AtomicBool,
    install_calls: AtomicUsize,
    renders: Mutex<Vec<RenderedConfig>>,
}

impl RecordingServiceManager {
    /// Create a manager for an uninstalled daemon.
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            installed: AtomicBool::new(false),
            fail_install: AtomicBool::new(false),
            fail_restart: AtomicBool::new(false),
            install_calls: AtomicUsize::new(0),
            renders: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent installs fail (or succeed again).
    pub fn set_fail_install(&self, fail: bool) {
        self.fail_install.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent restarts fail (or succeed again).
    pub fn set_fail_restart(&self, fail: bool) {
        self.fail_restart.store(fail, Ordering::SeqCst);
    }

    /// Number of install calls, including failed ones.
    pub fn install_calls(&self) -> usize {
        self.install_calls.load(Ordering::SeqCst)
    }

    /// Every configuration successfully rendered, oldest first.
    pub async fn renders(&self) -> Vec<RenderedConfig> {
        self.renders.lock().await.clone()
    }

    /// The configuration currently in effect.
    pub async fn current_config(&self) -> Option<RenderedConfig> {
        self.renders.lock().await.last().cloned()
    }
}

#[async_trait]
impl ServiceManager for RecordingServiceManager {
    async fn prepare_system_for_slurm(&self) -> Result<()> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_install.load(Ordering::SeqCst) {
            return Err(Error::install_failed("package repository unreachable"));
        }
        self.installed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn render_config_and_restart(&self, config: &RenderedConfig) -> Result<()> {
        if self.fail_restart.load(Ordering::SeqCst) {
            return Err(Error::restart_failed("slurmdbd did not come back up"));
        }
        self.renders.lock().await.push(config.clone());
        Ok(())
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn slurm_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }
}
