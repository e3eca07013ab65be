//! Configuration model.
//!
//! Every field has a serde default so a partial (or missing) config file
//! always yields a usable configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name of the cached address file when no explicit path is configured.
pub const ADDRESS_FILE_NAME: &str = "ip.txt";

/// Settings for talking to the device-management tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdbConfig {
    /// Executable to invoke.
    #[serde(default = "default_program")]
    pub program: String,

    /// Port the device listens on in network mode.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Wireless interface queried for the device's address.
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Upper bound for a single invocation in seconds (0 = wait forever).
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            port: default_port(),
            interface: default_interface(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl AdbConfig {
    /// Timeout applied to each invocation, if any.
    #[must_use]
    pub const fn command_timeout(&self) -> Option<Duration> {
        if self.command_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.command_timeout_secs))
        }
    }
}

fn default_program() -> String {
    "adb".to_string()
}

const fn default_port() -> u16 {
    5555
}

fn default_interface() -> String {
    "wlan0".to_string()
}

const fn default_command_timeout() -> u64 {
    30
}

/// Settings for the reconciliation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Pause between the end of one cycle and the start of the next.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Daemon resets allowed within one cycle before giving up.
    #[serde(default = "default_max_heal_attempts")]
    pub max_heal_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            max_heal_attempts: default_max_heal_attempts(),
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

const fn default_interval() -> u64 {
    5
}

const fn default_max_heal_attempts() -> u32 {
    3
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Cached address file (defaults to `ip.txt` next to the executable).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_file: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub adb: AdbConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".adb-tether")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Resolve the cached address file location.
    ///
    /// Falls back to the working directory when the executable path is
    /// unavailable (e.g. `cargo run` from a deleted target dir).
    #[must_use]
    pub fn address_file_path(&self) -> PathBuf {
        if let Some(path) = &self.paths.address_file {
            return path.clone();
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(std::path::Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(ADDRESS_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.adb.program, "adb");
        assert_eq!(config.adb.port, 5555);
        assert_eq!(config.adb.interface, "wlan0");
        assert_eq!(config.monitor.interval(), Duration::from_secs(5));
        assert_eq!(config.monitor.max_heal_attempts, 3);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let adb = AdbConfig {
            command_timeout_secs: 0,
            ..AdbConfig::default()
        };
        assert_eq!(adb.command_timeout(), None);
        assert_eq!(
            AdbConfig::default().command_timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_explicit_address_file_wins() {
        let config = AppConfig {
            paths: PathConfig {
                address_file: Some(PathBuf::from("/tmp/quest-ip.txt")),
            },
            ..AppConfig::default()
        };
        assert_eq!(config.address_file_path(), PathBuf::from("/tmp/quest-ip.txt"));
    }

    #[test]
    fn test_default_address_file_name() {
        let path = AppConfig::default().address_file_path();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(ADDRESS_FILE_NAME)
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("[monitor]\ninterval_secs = 10\n").unwrap();
        assert_eq!(config.monitor.interval_secs, 10);
        assert_eq!(config.monitor.max_heal_attempts, 3);
        assert_eq!(config.adb.port, 5555);
    }
}
