//! Agent configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub agent: AgentSettings,
    #[serde(default)]
    pub usb: UsbSettings,
    #[serde(default)]
    pub snapshot: SnapshotSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Vendor ID of the devices to manage (e.g. "0x0801")
    #[serde(default = "UsbSettings::default_vendor_id")]
    pub vendor_id: String,
    /// Product IDs to restrict to (empty = every product of the vendor)
    #[serde(default)]
    pub product_ids: Vec<String>,
    /// Control transfer timeout in milliseconds
    #[serde(default = "UsbSettings::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Interface claimed for feature-report transfers
    #[serde(default)]
    pub interface: u8,
}

impl Default for UsbSettings {
    fn default() -> Self {
        Self {
            vendor_id: Self::default_vendor_id(),
            product_ids: Vec::new(),
            timeout_ms: Self::default_timeout_ms(),
            interface: 0,
        }
    }
}

impl UsbSettings {
    fn default_vendor_id() -> String {
        format!("{:#06x}", protocol::MAGTEK_VENDOR_ID)
    }

    fn default_timeout_ms() -> u64 {
        5000
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Configured vendor ID as a number
    pub fn vendor_id(&self) -> Result<u16> {
        parse_hex_id(&self.vendor_id, "vendor_id")
    }

    /// Whether a device with this VID/PID pair is managed
    pub fn matches(&self, vid: u16, pid: u16) -> bool {
        if self.vendor_id().map(|v| v != vid).unwrap_or(true) {
            return false;
        }

        // If no product IDs are listed, every product of the vendor matches
        if self.product_ids.is_empty() {
            return true;
        }

        self.product_ids
            .iter()
            .any(|id| parse_hex_id(id, "product_id").map(|p| p == pid).unwrap_or(false))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    /// Directory holding one `<filename>.json` snapshot per device
    #[serde(default = "SnapshotSettings::default_directory")]
    pub directory: PathBuf,
    /// Characters copied by `serial copy` when no length is given
    #[serde(default = "SnapshotSettings::default_serial_length")]
    pub serial_length: usize,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            serial_length: Self::default_serial_length(),
        }
    }
}

impl SnapshotSettings {
    fn default_directory() -> PathBuf {
        if let Some(data_dir) = dirs::data_local_dir() {
            data_dir.join("usb-cmdb").join("snapshots")
        } else {
            PathBuf::from("/var/lib/usb-cmdb/snapshots")
        }
    }

    fn default_serial_length() -> usize {
        protocol::DEFAULT_SN_LENGTH
    }

    /// Snapshot directory with `~` and environment variables expanded
    pub fn resolved_directory(&self) -> Result<PathBuf> {
        let raw = self.directory.to_string_lossy();
        let expanded = shellexpand::full(&raw)
            .with_context(|| format!("Failed to expand snapshot directory: {}", raw))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent: AgentSettings {
                log_level: "info".to_string(),
            },
            usb: UsbSettings::default(),
            snapshot: SnapshotSettings::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usb-cmdb/agent.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AgentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
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
            config_dir.join("usb-cmdb").join("agent.toml")
        } else {
            PathBuf::from(".config/usb-cmdb/agent.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.agent.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.agent.log_level,
                valid_levels.join(", ")
            ));
        }

        self.usb.vendor_id()?;
        for pid in &self.usb.product_ids {
            parse_hex_id(pid, "product_id")?;
        }

        if self.usb.timeout_ms == 0 {
            return Err(anyhow!("timeout_ms must be greater than 0"));
        }

        if self.snapshot.serial_length == 0 {
            return Err(anyhow!("serial_length must be greater than 0"));
        }

        Ok(())
    }
}

/// Parse a `0x`-prefixed 16-bit hex ID
fn parse_hex_id(id: &str, name: &str) -> Result<u16> {
    let hex_part = id
        .strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .ok_or_else(|| {
            anyhow!(
                "Invalid {} '{}', must start with '0x' (e.g., '0x0801')",
                name,
                id
            )
        })?;

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
