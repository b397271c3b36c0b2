//! Daemon configuration management

use crate::usb::{DeviceFilter, WorkerSettings};
use anyhow::{Context, Result, anyhow};
use common::{CommitPolicy, SessionOptions};
use protocol::{LAUNCHER_PRODUCT_ID, LAUNCHER_VENDOR_ID};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub daemon: DaemonSettings,
    pub usb: UsbSettings,
    #[serde(default)]
    pub transfer: TransferSettings,
    #[serde(default)]
    pub attributes: AttributeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSettings {
    pub log_level: String,
    /// Headless operation: no stdin console, systemd notifications
    pub service_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbSettings {
    pub vendor_id: String,
    pub product_id: String,
    #[serde(default)]
    pub interface: u8,
    /// Re-enumeration period when hot-plug is unavailable
    #[serde(default = "UsbSettings::default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl UsbSettings {
    fn default_poll_interval() -> u64 {
        1000
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSettings {
    #[serde(default = "TransferSettings::default_timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub commit_policy: CommitPolicy,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout(),
            commit_policy: CommitPolicy::default(),
        }
    }
}

impl TransferSettings {
    fn default_timeout() -> u64 {
        protocol::DEFAULT_TIMEOUT.as_millis() as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSettings {
    /// Unix socket serving the attribute line protocol
    /// If None, uses the per-user runtime directory
    #[serde(default)]
    pub socket_path: Option<String>,
    #[serde(default = "AttributeSettings::default_mode")]
    pub socket_mode: u32,
}

impl Default for AttributeSettings {
    fn default() -> Self {
        Self {
            socket_path: None,
            socket_mode: Self::default_mode(),
        }
    }
}

impl AttributeSettings {
    fn default_mode() -> u32 {
        0o666
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            daemon: DaemonSettings {
                log_level: "info".to_string(),
                service_mode: false,
            },
            usb: UsbSettings {
                vendor_id: format!("0x{:04x}", LAUNCHER_VENDOR_ID),
                product_id: format!("0x{:04x}", LAUNCHER_PRODUCT_ID),
                interface: 0,
                poll_interval_ms: UsbSettings::default_poll_interval(),
            },
            transfer: TransferSettings::default(),
            attributes: AttributeSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/missile-launcher/launcherd.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("missile-launcher").join("launcherd.toml")
        } else {
            PathBuf::from(".config/missile-launcher/launcherd.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.daemon.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.daemon.log_level,
                valid_levels.join(", ")
            ));
        }

        Self::validate_hex_id(&self.usb.vendor_id, "VID")?;
        Self::validate_hex_id(&self.usb.product_id, "PID")?;

        if self.transfer.timeout_ms == 0 {
            return Err(anyhow!("transfer.timeout_ms must be greater than 0"));
        }
        if self.usb.poll_interval_ms == 0 {
            return Err(anyhow!("usb.poll_interval_ms must be greater than 0"));
        }

        Ok(())
    }

    /// Validate a hex ID (VID or PID), returning its value
    fn validate_hex_id(id: &str, name: &str) -> Result<u16> {
        let Some(hex_part) = id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) else {
            return Err(anyhow!(
                "Invalid {} '{}', must start with '0x' (e.g., '0x1234')",
                name,
                id
            ));
        };

        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(anyhow!(
                "Invalid {} '{}', hex part must be 1-4 digits",
                name,
                id
            ));
        }

        u16::from_str_radix(hex_part, 16)
            .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))
    }

    pub fn device_filter(&self) -> Result<DeviceFilter> {
        Ok(DeviceFilter {
            vendor_id: Self::validate_hex_id(&self.usb.vendor_id, "VID")?,
            product_id: Self::validate_hex_id(&self.usb.product_id, "PID")?,
        })
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            timeout: Duration::from_millis(self.transfer.timeout_ms),
            commit_policy: self.transfer.commit_policy,
        }
    }

    pub fn worker_settings(&self) -> Result<WorkerSettings> {
        Ok(WorkerSettings {
            filter: self.device_filter()?,
            interface: self.usb.interface,
            session_options: self.session_options(),
            poll_interval: Duration::from_millis(self.usb.poll_interval_ms),
        })
    }

    /// Attribute socket path with `~` expanded
    pub fn socket_path(&self) -> PathBuf {
        match &self.attributes.socket_path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
            None => common::default_socket_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.daemon.log_level, "info");
        assert_eq!(config.usb.vendor_id, "0x0416");
        assert_eq!(config.usb.product_id, "0x9391");
        assert_eq!(config.transfer.timeout_ms, 2000);
        assert_eq!(config.transfer.commit_policy, CommitPolicy::Optimistic);
        assert_eq!(config.attributes.socket_mode, 0o666);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_hex_id() {
        assert_eq!(ServerConfig::validate_hex_id("0x0416", "VID").unwrap(), 0x0416);
        assert_eq!(ServerConfig::validate_hex_id("0XABCD", "VID").unwrap(), 0xabcd);
        assert_eq!(ServerConfig::validate_hex_id("0x1", "PID").unwrap(), 1);
        assert!(ServerConfig::validate_hex_id("0416", "VID").is_err());
        assert!(ServerConfig::validate_hex_id("0x", "VID").is_err());
        assert!(ServerConfig::validate_hex_id("0x12345", "VID").is_err());
        assert!(ServerConfig::validate_hex_id("0xGHIJ", "VID").is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = ServerConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: ServerConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.daemon.log_level, parsed.daemon.log_level);
        assert_eq!(config.usb.vendor_id, parsed.usb.vendor_id);
        assert_eq!(config.transfer.commit_policy, parsed.transfer.commit_policy);
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = ServerConfig::default();
        config.transfer.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.usb.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = ServerConfig::default();
        config.daemon.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.daemon.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_options_follow_transfer_settings() {
        let mut config = ServerConfig::default();
        config.transfer.timeout_ms = 250;
        config.transfer.commit_policy = CommitPolicy::Confirmed;

        let options = config.session_options();
        assert_eq!(options.timeout, Duration::from_millis(250));
        assert_eq!(options.commit_policy, CommitPolicy::Confirmed);
    }

    #[test]
    fn test_socket_path_expands_tilde() {
        let mut config = ServerConfig::default();
        config.attributes.socket_path = Some("~/launcher.sock".to_string());

        let path = config.socket_path();
        assert!(path.ends_with("launcher.sock"));
        assert!(!path.to_string_lossy().starts_with('~'));
    }
}
