use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::io::serial::LineConfig;
use crate::io::LineEnding;

/// Manager configuration. Every field has a default so partial files load.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ManagerSettings {
    /// Directory device nodes live in; a port identifier is joined onto it
    #[serde(default = "default_device_dir")]
    pub device_dir: String,
    /// Well-known USB-serial names probed on disk in addition to the registry
    #[serde(default = "default_probe_ports")]
    pub probe_ports: Vec<String>,
    /// Offer `placeholder_ports` when a scan finds nothing
    #[serde(default = "default_use_placeholder_ports")]
    pub use_placeholder_ports: bool,
    #[serde(default = "default_placeholder_ports")]
    pub placeholder_ports: Vec<String>,
    /// Upper bound for a single device read
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
    /// Inbound events buffered before the read loop waits on the consumer
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,
    #[serde(default)]
    pub default_line: LineConfig,
    #[serde(default)]
    pub default_line_ending: LineEnding,
    /// Write a log file here in addition to stderr
    #[serde(default)]
    pub log_dir: Option<String>,
    /// Timestamped log files kept in `log_dir`; 0 keeps all
    #[serde(default = "default_log_keep")]
    pub log_keep: usize,
}

fn default_device_dir() -> String {
    "/dev".to_string()
}
fn default_probe_ports() -> Vec<String> {
    [
        "cu.usbserial-0001",
        "cu.usbserial-14410",
        "cu.usbmodem14101",
        "cu.usbmodem14201",
        "cu.wchusbserial14410",
        "cu.wchusbserial14420",
        "cu.SLAB_USBtoUART",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_use_placeholder_ports() -> bool {
    true
}
fn default_placeholder_ports() -> Vec<String> {
    vec!["cu.usbserial-0001".to_string(), "cu.usbmodem14101".to_string()]
}
fn default_read_chunk_size() -> usize {
    1024
}
fn default_inbound_capacity() -> usize {
    256
}
fn default_log_keep() -> usize {
    10
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            device_dir: default_device_dir(),
            probe_ports: default_probe_ports(),
            use_placeholder_ports: default_use_placeholder_ports(),
            placeholder_ports: default_placeholder_ports(),
            read_chunk_size: default_read_chunk_size(),
            inbound_capacity: default_inbound_capacity(),
            default_line: LineConfig::default(),
            default_line_ending: LineEnding::default(),
            log_dir: None,
            log_keep: default_log_keep(),
        }
    }
}

impl ManagerSettings {
    /// Full device path for a port identifier. No sanitization beyond the join.
    pub fn device_path(&self, port: &str) -> std::path::PathBuf {
        Path::new(&self.device_dir).join(port)
    }
}

/// Parse settings from TOML text.
pub fn parse_settings(content: &str) -> Result<ManagerSettings, String> {
    let settings: ManagerSettings =
        toml::from_str(content).map_err(|e| format!("Failed to parse settings: {}", e))?;

    if settings.read_chunk_size == 0 {
        return Err("read_chunk_size must be at least 1".to_string());
    }
    if settings.inbound_capacity == 0 {
        return Err("inbound_capacity must be at least 1".to_string());
    }

    Ok(settings)
}

/// Load settings from a TOML file. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<ManagerSettings, String> {
    if !path.exists() {
        tlog!("[settings] {} not found, using defaults", path.display());
        return Ok(ManagerSettings::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings: {}", e))?;

    parse_settings(&content)
}
