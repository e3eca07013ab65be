//! Infrastructure layer - external adapters (adb process, filesystem, systemd).
//!
//! This layer handles all I/O. The reconciler only sees the two traits
//! below, so it can be driven by fakes in tests.

pub mod adb;
pub mod address_file;
pub mod config;
pub mod logging;
pub mod runner;
pub mod systemd;

use async_trait::async_trait;

use crate::domain::{DeviceRecord, Result};

pub use adb::AdbDriver;
pub use address_file::AddressFile;
pub use config::{ensure_config_exists, load_config, render_config};
pub use logging::{DebugSwitch, LogControl};
pub use runner::{AdbRunner, CommandRunner};
pub use systemd::SystemdService;

/// Primitive transport operations against the device-management tool.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Port whose `:<port>` suffix marks a network-attached identifier.
    fn port(&self) -> u16;

    /// Currently visible devices with their state tags.
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>>;

    /// Switch the cable-attached device into network-listening mode.
    async fn enable_network_mode(&self) -> Result<()>;

    /// Ask the attached device for its wireless IPv4 address.
    async fn query_network_address(&self) -> Result<String>;

    /// Open a network connection to `address`; fails with
    /// [`crate::domain::AppError::Connect`] unless explicitly confirmed.
    async fn connect(&self, address: &str) -> Result<()>;

    /// Drop every network connection.
    async fn disconnect_all(&self) -> Result<()>;

    /// Restart the transport daemon.
    async fn reset_daemon(&self) -> Result<()>;
}

/// Durable storage for the single cached device address.
pub trait AddressStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, address: &str) -> Result<()>;
}
