//! Domain models for device reconciliation.
//!
//! Device records are rebuilt from a fresh inventory every cycle; nothing
//! here is persisted except through the address store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection state tag reported by the device-management tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    /// Reachable and authorized (`device` in adb's listing).
    Online,
    /// Known to the daemon but not responding.
    Offline,
    /// Any other tag (`unauthorized`, `recovery`, ...), passed through as-is.
    Other(String),
}

impl From<&str> for DeviceState {
    fn from(tag: &str) -> Self {
        match tag.trim() {
            "device" => Self::Online,
            "offline" => Self::Offline,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
            Self::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// How a device is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attachment {
    /// Identifier is `host:<port>`.
    Network,
    /// Anything else, typically a USB serial.
    Wire,
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Wire => write!(f, "wire"),
        }
    }
}

/// One line of the device inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Transport-assigned identifier (serial or `address:port`).
    pub serial: String,
    /// State tag.
    pub state: DeviceState,
}

impl DeviceRecord {
    /// Create a record from an identifier and a raw state tag.
    #[must_use]
    pub fn new(serial: impl Into<String>, state: impl Into<DeviceState>) -> Self {
        Self {
            serial: serial.into(),
            state: state.into(),
        }
    }

    /// Whether the identifier carries the network port suffix.
    #[must_use]
    pub fn is_network(&self, port: u16) -> bool {
        self.serial
            .strip_suffix(&port.to_string())
            .is_some_and(|rest| rest.ends_with(':'))
    }

    /// Classify the record for the given network port.
    #[must_use]
    pub fn attachment(&self, port: u16) -> Attachment {
        if self.is_network(port) {
            Attachment::Network
        } else {
            Attachment::Wire
        }
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.state == DeviceState::Offline
    }
}

/// Why a cycle stopped early without touching the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// A cable-attached device is present alongside other devices.
    PhysicalConflict,
    /// More than one device remains after every guard ran.
    MultipleDevices,
    /// Nothing attached and no cached address to try.
    NoAddressAvailable,
}

/// Human-readable messages produced by a cycle, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    Connected(String),
    Disconnected(String),
    Connecting(String),
    UnplugToResolveConflict,
    MultipleDevices,
    AttachDevice,
    CableNoLongerNeeded,
    ConnectFailed(String),
    HealExhausted(u32),
}

impl Notice {
    /// Whether the notice asks the user to act or reports a problem.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::UnplugToResolveConflict
                | Self::MultipleDevices
                | Self::AttachDevice
                | Self::ConnectFailed(_)
                | Self::HealExhausted(_)
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected(address) => write!(f, "Connected to {address}"),
            Self::Disconnected(address) => write!(f, "Disconnected from {address}"),
            Self::Connecting(address) => write!(f, "Connecting to {address}..."),
            Self::UnplugToResolveConflict => {
                write!(f, "Please unplug the device from the computer")
            }
            Self::MultipleDevices => write!(f, "Error: multiple devices detected"),
            Self::AttachDevice => write!(
                f,
                "Could not get IP address, please connect the device to the computer"
            ),
            Self::CableNoLongerNeeded => {
                write!(f, "Please disconnect the device from the computer")
            }
            Self::ConnectFailed(address) => write!(f, "Failed to connect to {address}"),
            Self::HealExhausted(resets) => write!(
                f,
                "Connection still broken after {resets} adb resets, retrying next cycle"
            ),
        }
    }
}

/// Terminal state of a single reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleOutcome {
    /// A guard stopped the cycle.
    Aborted(AbortReason),
    /// An existing network connection answered with its address.
    Verified { address: String },
    /// A new network connection was confirmed.
    Connected { address: String, from_wire: bool },
    /// The connect attempt was rejected.
    ConnectFailed { address: String },
    /// Every allowed daemon reset was spent without a healthy connection.
    HealExhausted { resets: u32 },
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted(reason) => write!(f, "aborted ({reason:?})"),
            Self::Verified { address } => write!(f, "verified {address}"),
            Self::Connected { address, .. } => write!(f, "connected to {address}"),
            Self::ConnectFailed { address } => write!(f, "could not connect to {address}"),
            Self::HealExhausted { resets } => write!(f, "gave up after {resets} resets"),
        }
    }
}

/// Everything a finished cycle has to say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub notices: Vec<Notice>,
    /// Daemon resets performed by this cycle.
    pub resets: u32,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    #[must_use]
    pub fn new(outcome: CycleOutcome, notices: Vec<Notice>, resets: u32) -> Self {
        Self {
            outcome,
            notices,
            resets,
            finished_at: Utc::now(),
        }
    }
}
