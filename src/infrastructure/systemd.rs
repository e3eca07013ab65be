//! Systemd user service for running the tether headless.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::{AppConfig, AppError, Result};

/// Service unit file name.
const SERVICE_NAME: &str = "adb-tether.service";

/// Manages the `adb-tether` systemd user unit.
pub struct SystemdService {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl SystemdService {
    /// `config_path` is forwarded to the service command line when set.
    #[must_use]
    pub const fn new(config: AppConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    fn user_systemd_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| AppError::Config {
            message: "Could not determine config directory".into(),
        })?;

        Ok(config_dir.join("systemd/user"))
    }

    fn service_file_path() -> Result<PathBuf> {
        Ok(Self::user_systemd_dir()?.join(SERVICE_NAME))
    }

    /// Render the unit file for the given binary.
    #[must_use]
    pub fn render_unit(&self, binary: &Path) -> String {
        let config_arg = self
            .config_path
            .as_ref()
            .map(|p| format!(" --config {}", p.display()))
            .unwrap_or_default();

        let address_file = self.config.address_file_path();
        let state_dir = address_file
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        format!(
            r"[Unit]
Description=adb-tether wireless debugging keeper
After=network-online.target

[Service]
Type=simple
ExecStart={binary}{config_arg} run --headless
Restart=on-failure
RestartSec=10
Environment=RUST_LOG=info

# Resource limits
MemoryMax=64M

# Security
ProtectSystem=strict
PrivateTmp=yes
ReadWritePaths={state_dir} %h/.android
NoNewPrivileges=yes

[Install]
WantedBy=default.target
",
            binary = binary.display(),
            state_dir = state_dir.display(),
        )
    }

    /// Directories the unit lists in `ReadWritePaths`. systemd refuses to
    /// start the unit if one is missing.
    fn writable_dirs(&self) -> Vec<PathBuf> {
        let address_file = self.config.address_file_path();
        let mut paths: Vec<PathBuf> = address_file
            .parent()
            .map(Path::to_path_buf)
            .into_iter()
            .collect();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".android"));
        }
        paths
    }

    /// Write the unit file and reload the user manager.
    pub fn install(&self) -> Result<InstallResult> {
        let systemd_dir = Self::user_systemd_dir()?;
        fs::create_dir_all(&systemd_dir)
            .map_err(|e| AppError::io("Failed to create systemd user directory", e))?;

        let binary = std::env::current_exe()
            .map_err(|e| AppError::io("Failed to get executable path", e))?;
        for dir in self.writable_dirs() {
            fs::create_dir_all(&dir).map_err(|e| {
                AppError::io(format!("Failed to create {}", dir.display()), e)
            })?;
        }

        let service_path = Self::service_file_path()?;
        let unit_content = self.render_unit(&binary);

        fs::write(&service_path, &unit_content)
            .map_err(|e| AppError::io("Failed to write service file", e))?;

        tracing::info!(path = %service_path.display(), "Service file written");

        systemctl(&["daemon-reload"])?;

        Ok(InstallResult {
            service_path,
            unit_content,
        })
    }

    /// Enable and start the service.
    pub fn enable_and_start(&self) -> Result<()> {
        systemctl(&["enable", SERVICE_NAME])?;
        systemctl(&["start", SERVICE_NAME])?;
        tracing::info!("Service enabled and started");
        Ok(())
    }

    /// Stop, disable and remove the service.
    pub fn uninstall(&self) -> Result<()> {
        // Not running or not enabled is fine here.
        let _ = systemctl(&["stop", SERVICE_NAME]);
        if systemctl(&["disable", SERVICE_NAME]).is_err() {
            tracing::warn!("Service may not have been fully disabled");
        }

        let service_path = Self::service_file_path()?;
        if service_path.exists() {
            fs::remove_file(&service_path)
                .map_err(|e| AppError::io("Failed to remove service file", e))?;
        }

        let _ = systemctl(&["daemon-reload"]);

        tracing::info!("Service uninstalled");
        Ok(())
    }

    /// Get service status.
    pub fn status(&self) -> Result<ServiceStatus> {
        if !Self::service_file_path()?.exists() {
            return Ok(ServiceStatus {
                is_installed: false,
                is_enabled: false,
                is_running: false,
                status_text: "not installed".into(),
            });
        }

        let is_enabled = systemctl(&["is-enabled", SERVICE_NAME]).is_ok();
        let is_running = systemctl(&["is-active", SERVICE_NAME]).is_ok();

        let status_output = Command::new("systemctl")
            .args(["--user", "status", SERVICE_NAME, "--no-pager"])
            .output()
            .map_err(|e| AppError::io("Failed to get service status", e))?;

        Ok(ServiceStatus {
            is_installed: true,
            is_enabled,
            is_running,
            status_text: String::from_utf8_lossy(&status_output.stdout).to_string(),
        })
    }

    /// Last `lines` journal lines of the service.
    pub fn logs(&self, lines: usize) -> Result<String> {
        let output = Command::new("journalctl")
            .args([
                "--user",
                "-u",
                SERVICE_NAME,
                "-n",
                &lines.to_string(),
                "--no-pager",
            ])
            .output()
            .map_err(|e| AppError::io("Failed to get service logs", e))?;

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Run `systemctl --user <args>`, failing on non-zero exit.
fn systemctl(args: &[&str]) -> Result<()> {
    let status = Command::new("systemctl")
        .arg("--user")
        .args(args)
        .status()
        .map_err(|e| AppError::io(format!("Failed to run systemctl {}", args.join(" ")), e))?;

    if status.success() {
        Ok(())
    } else {
        Err(AppError::Config {
            message: format!("systemctl {} failed", args.join(" ")),
        })
    }
}

/// Result of installing the service.
#[derive(Debug)]
pub struct InstallResult {
    pub service_path: PathBuf,
    pub unit_content: String,
}

/// Service status information.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub is_installed: bool,
    pub is_enabled: bool,
    pub is_running: bool,
    /// Full status text from systemctl.
    pub status_text: String,
}

impl ServiceStatus {
    #[must_use]
    pub const fn short_status(&self) -> &'static str {
        match (self.is_installed, self.is_enabled, self.is_running) {
            (false, _, _) => "not installed",
            (true, false, false) => "installed, disabled",
            (true, true, false) => "enabled, stopped",
            (true, false, true) => "running (not enabled)",
            (true, true, true) => "running",
        }
    }
}
