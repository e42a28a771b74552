//! Service configuration.
//!
//! Stored as TOML; the path comes from `SHOPFRONT_CONFIG` and defaults to
//! `config/shopfront.toml`. A missing file means all defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use shopfront_theme::{ExportCheck, ThemeSettings};

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "SHOPFRONT_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/shopfront.toml";

/// How the packaging command proves it wrote the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportCheckMode {
    #[default]
    StdoutMarker,
    OutputFile,
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory uploaded theme archives are stored in.
    #[serde(default = "default_files_upload_path")]
    pub files_upload_path: PathBuf,

    /// Working directory of the packaging command; exported archives land
    /// and are served from here.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    #[serde(default = "default_export_command")]
    pub export_command: Vec<String>,

    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,

    #[serde(default)]
    pub export_check: ExportCheckMode,

    #[serde(default = "default_success_marker")]
    pub success_marker: String,

    /// Upper bound on each external command in seconds (0 = none).
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<u64>,

    #[serde(default)]
    pub serialize_installs: bool,

    /// Events buffered per notification subscriber.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3000
}

fn default_files_upload_path() -> PathBuf {
    PathBuf::from("public/static/files")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_export_command() -> Vec<String> {
    owned(shopfront_theme::DEFAULT_EXPORT_COMMAND)
}

fn default_install_command() -> Vec<String> {
    owned(shopfront_theme::DEFAULT_INSTALL_COMMAND)
}

fn default_success_marker() -> String {
    shopfront_theme::DEFAULT_SUCCESS_MARKER.into()
}

fn default_command_timeout_secs() -> u64 {
    shopfront_runner::DEFAULT_COMMAND_TIMEOUT.as_secs()
}

fn default_event_buffer() -> usize {
    shopfront_events::DEFAULT_CAPACITY
}

fn owned(line: &[&str]) -> Vec<String> {
    line.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            files_upload_path: default_files_upload_path(),
            export_dir: default_export_dir(),
            export_command: default_export_command(),
            install_command: default_install_command(),
            export_check: ExportCheckMode::default(),
            success_marker: default_success_marker(),
            command_timeout_secs: default_command_timeout_secs(),
            max_upload_bytes: None,
            serialize_installs: false,
            event_buffer: default_event_buffer(),
        }
    }
}

impl Config {
    /// Loads configuration from `$SHOPFRONT_CONFIG` or the default path.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    /// Loads configuration from `path`, falling back to defaults if the
    /// file does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Address the HTTP server binds to.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {addr}: {e}"))
    }

    /// Pipeline settings derived from this configuration.
    pub fn theme_settings(&self) -> ThemeSettings {
        let export_check = match self.export_check {
            ExportCheckMode::StdoutMarker => ExportCheck::StdoutMarker(self.success_marker.clone()),
            ExportCheckMode::OutputFile => ExportCheck::OutputFile,
        };
        ThemeSettings {
            upload_dir: self.files_upload_path.clone(),
            export_dir: self.export_dir.clone(),
            export_command: self.export_command.clone(),
            install_command: self.install_command.clone(),
            export_check,
            command_timeout: (self.command_timeout_secs > 0)
                .then(|| Duration::from_secs(self.command_timeout_secs)),
            max_upload_bytes: self.max_upload_bytes,
            serialize_installs: self.serialize_installs,
        }
    }
}
