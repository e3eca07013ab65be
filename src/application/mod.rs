//! Application layer - use cases and orchestration.
//!
//! This layer holds the reconciliation logic, the loop that drives it and
//! the interactive console, plus output formatting for the CLI.

pub mod console;
pub mod formatter;
pub mod guards;
pub mod reconciler;
pub mod supervisor;

pub use console::Console;
pub use formatter::{
    format_devices_json, format_devices_table, format_notice, format_report_summary,
    OutputFormat,
};
pub use reconciler::Reconciler;
pub use supervisor::{forward_signal, Supervisor};
