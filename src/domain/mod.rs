//! Domain layer - core types and error definitions.
//!
//! This layer contains pure models, configuration and error types
//! without any external dependencies (processes, filesystem, etc.).

pub mod config;
pub mod error;
pub mod models;

pub use config::{AdbConfig, AppConfig, MonitorConfig, PathConfig};
pub use error::{AppError, Result};
pub use models::{
    AbortReason, Attachment, CycleOutcome, CycleReport, DeviceRecord, DeviceState, Notice,
};
