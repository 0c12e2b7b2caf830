//! Monitor configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub usb: UsbSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Number of device slots in the registry.
    #[serde(default = "MonitorSettings::default_slot_capacity")]
    pub slot_capacity: usize,
    /// Discovery cycle interval in milliseconds.
    #[serde(default = "MonitorSettings::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-read timeout in milliseconds for reader loops.
    #[serde(default = "MonitorSettings::default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "MonitorSettings::default_log_level")]
    pub log_level: String,
}

impl MonitorSettings {
    fn default_slot_capacity() -> usize {
        6
    }

    fn default_poll_interval_ms() -> u64 {
        500
    }

    fn default_read_timeout_ms() -> u64 {
        1000
    }

    fn default_log_level() -> String {
        "info".to_string()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UsbSettings {
    /// VID:PID patterns restricting which devices are attached
    /// (e.g. "0x046d:0xc216" or "0x046d:*"); empty allows all.
    #[serde(default)]
    pub filters: Vec<String>,
}

impl UsbSettings {
    /// Check whether a VID/PID pair passes the configured filters.
    pub fn allows(&self, vid: u16, pid: u16) -> bool {
        if self.filters.is_empty() {
            return true;
        }

        for filter in &self.filters {
            let parts: Vec<&str> = filter.split(':').collect();
            if parts.len() != 2 {
                continue;
            }

            let vid_match = parts[0] == "*"
                || u16::from_str_radix(parts[0].trim_start_matches("0x"), 16)
                    .map(|v| v == vid)
                    .unwrap_or(false);
            if !vid_match {
                continue;
            }

            let pid_match = parts[1] == "*"
                || u16::from_str_radix(parts[1].trim_start_matches("0x"), 16)
                    .map(|p| p == pid)
                    .unwrap_or(false);
            if pid_match {
                return true;
            }
        }

        false
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorSettings {
                slot_capacity: MonitorSettings::default_slot_capacity(),
                poll_interval_ms: MonitorSettings::default_poll_interval_ms(),
                read_timeout_ms: MonitorSettings::default_read_timeout_ms(),
                log_level: MonitorSettings::default_log_level(),
            },
            usb: UsbSettings::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the specified path, or from the default
    /// location when none is given.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => {
                let default = Self::default_path();
                if !default.exists() {
                    return Err(anyhow!("no configuration file found"));
                }
                default
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config file: {}", config_path.display()))?;

        let config: MonitorConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or fall back to defaults.
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("using default configuration: {e}");
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
        }

        fs::write(path, content)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Default configuration file path.
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("hidmon").join("monitor.toml")
        } else {
            PathBuf::from(".config/hidmon/monitor.toml")
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.monitor.log_level.as_str()) {
            return Err(anyhow!(
                "invalid log level '{}', must be one of: {}",
                self.monitor.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.monitor.slot_capacity == 0 {
            return Err(anyhow!("slot_capacity must be at least 1"));
        }

        if self.monitor.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be at least 1"));
        }

        for filter in &self.usb.filters {
            Self::validate_filter(filter)?;
        }

        Ok(())
    }

    /// Validate a device filter pattern (VID:PID).
    fn validate_filter(filter: &str) -> Result<()> {
        let parts: Vec<&str> = filter.split(':').collect();
        if parts.len() != 2 {
            return Err(anyhow!(
                "invalid filter '{}', expected VID:PID (e.g. '0x1234:0x5678' or '0x1234:*')",
                filter
            ));
        }

        for (id, name) in [(parts[0], "VID"), (parts[1], "PID")] {
            if id == "*" {
                continue;
            }
            Self::validate_hex_id(id, name)?;
        }

        Ok(())
    }

    fn validate_hex_id(id: &str, name: &str) -> Result<()> {
        let hex_part = id
            .strip_prefix("0x")
            .or_else(|| id.strip_prefix("0X"))
            .ok_or_else(|| anyhow!("invalid {name} '{id}', must start with '0x'"))?;

        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(anyhow!("invalid {name} '{id}', hex part must be 1-4 digits"));
        }

        u16::from_str_radix(hex_part, 16)
            .map_err(|_| anyhow!("invalid {name} '{id}', not a valid hex number"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.monitor.slot_capacity, 6);
        assert_eq!(config.monitor.poll_interval_ms, 500);
        assert_eq!(config.monitor.read_timeout_ms, 1000);
        assert_eq!(config.monitor.log_level, "info");
        assert!(config.usb.filters.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_filter_valid() {
        assert!(MonitorConfig::validate_filter("0x1234:0x5678").is_ok());
        assert!(MonitorConfig::validate_filter("0x1234:*").is_ok());
        assert!(MonitorConfig::validate_filter("*:0x5678").is_ok());
        assert!(MonitorConfig::validate_filter("*:*").is_ok());
    }

    #[test]
    fn test_validate_filter_invalid() {
        assert!(MonitorConfig::validate_filter("1234:5678").is_err());
        assert!(MonitorConfig::validate_filter("0x1234").is_err());
        assert!(MonitorConfig::validate_filter("0x1234:0x5678:0x9abc").is_err());
        assert!(MonitorConfig::validate_filter("0xGHIJ:0x5678").is_err());
        assert!(MonitorConfig::validate_filter("0x12345:0x5678").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = MonitorConfig::default();
        config.monitor.slot_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = MonitorConfig::default();
        config.monitor.log_level = "noisy".to_string();
        assert!(config.validate().is_err());

        config.monitor.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_filter_logic() {
        let settings = UsbSettings {
            filters: vec!["0x1234:0x5678".to_string(), "0xabcd:*".to_string()],
        };

        assert!(settings.allows(0x1234, 0x5678));
        assert!(settings.allows(0xabcd, 0x1111));
        assert!(settings.allows(0xabcd, 0x9999));

        assert!(!settings.allows(0x1234, 0x9999));
        assert!(!settings.allows(0x9999, 0x5678));

        // Empty filters allow everything
        assert!(UsbSettings::default().allows(0x1234, 0x5678));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");

        let mut config = MonitorConfig::default();
        config.monitor.slot_capacity = 2;
        config.usb.filters = vec!["0x046d:*".to_string()];
        config.save(&path).unwrap();

        let loaded = MonitorConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.monitor.slot_capacity, 2);
        assert_eq!(loaded.usb.filters, vec!["0x046d:*".to_string()]);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");

        let mut config = MonitorConfig::default();
        config.monitor.slot_capacity = 0;
        config.save(&path).unwrap();

        assert!(MonitorConfig::load(Some(path)).is_err());
    }
}
