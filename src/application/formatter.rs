//! Output formatting for notices, inventories and reports.
//!
//! Supports a colored table view for humans and JSON for scripts.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::domain::{Attachment, CycleReport, DeviceRecord, DeviceState, Notice};

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table / colored text.
    #[default]
    Table,
    /// JSON format for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: table, json")),
        }
    }
}

/// Color a notice for the terminal.
pub fn format_notice(notice: &Notice) -> String {
    let text = notice.to_string();
    match notice {
        Notice::Connected(_) => format!("{} {}", "✓".green().bold(), text.green()),
        Notice::Disconnected(_) => format!("{} {}", "✗".red().bold(), text.red()),
        Notice::Connecting(_) => text.dimmed().to_string(),
        _ if notice.is_warning() => text.yellow().to_string(),
        _ => text,
    }
}

/// Inventory row for JSON output.
#[derive(Serialize)]
struct DeviceRow<'a> {
    serial: &'a str,
    state: String,
    attachment: Attachment,
}

/// Formats the device inventory as a table.
pub fn format_devices_table(devices: &[DeviceRecord], port: u16) -> String {
    if devices.is_empty() {
        return "No devices attached".dimmed().to_string();
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Serial", "State", "Attachment"]);

    for device in devices {
        let state = match &device.state {
            DeviceState::Online => device.state.to_string().green().to_string(),
            DeviceState::Offline => device.state.to_string().red().to_string(),
            DeviceState::Other(_) => device.state.to_string().yellow().to_string(),
        };
        table.add_row(vec![
            device.serial.clone(),
            state,
            device.attachment(port).to_string(),
        ]);
    }

    table.to_string()
}

/// Formats the device inventory as JSON.
pub fn format_devices_json(devices: &[DeviceRecord], port: u16) -> serde_json::Result<String> {
    let rows: Vec<DeviceRow<'_>> = devices
        .iter()
        .map(|d| DeviceRow {
            serial: &d.serial,
            state: d.state.to_string(),
            attachment: d.attachment(port),
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}

/// One-line summary of a finished cycle.
pub fn format_report_summary(report: &CycleReport) -> String {
    let mut out = format!("{} {}", "Outcome:".bold(), report.outcome);
    if report.resets > 0 {
        out.push_str(&format!(" ({} adb resets)", report.resets));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CycleOutcome;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_notice_keeps_message_text() {
        colored::control::set_override(false);
        assert_eq!(
            format_notice(&Notice::ConnectFailed("10.0.0.5".into())),
            "Failed to connect to 10.0.0.5"
        );
        assert_eq!(
            format_notice(&Notice::Connected("10.0.0.5".into())),
            "✓ Connected to 10.0.0.5"
        );
    }

    #[test]
    fn test_devices_table_lists_attachment() {
        colored::control::set_override(false);
        let devices = vec![
            DeviceRecord::new("1WMHH815", "device"),
            DeviceRecord::new("10.0.0.5:5555", "offline"),
        ];
        let table = format_devices_table(&devices, 5555);

        assert!(table.contains("1WMHH815"));
        assert!(table.contains("wire"));
        assert!(table.contains("network"));
        assert!(table.contains("offline"));
    }

    #[test]
    fn test_devices_json() {
        let devices = vec![DeviceRecord::new("10.0.0.5:5555", "device")];
        let json = format_devices_json(&devices, 5555).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["serial"], "10.0.0.5:5555");
        assert_eq!(value[0]["state"], "online");
        assert_eq!(value[0]["attachment"], "network");
    }

    #[test]
    fn test_report_summary_mentions_resets() {
        colored::control::set_override(false);
        let outcome = CycleOutcome::Verified {
            address: "10.0.0.5".into(),
        };
        let report = CycleReport::new(outcome, vec![], 1);
        assert_eq!(
            format_report_summary(&report),
            "Outcome: verified 10.0.0.5 (1 adb resets)"
        );
    }
}
