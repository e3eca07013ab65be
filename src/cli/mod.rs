//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;

/// adb-tether - keep a headset's wireless adb connection alive.
///
/// With no subcommand, runs the reconciliation loop with an interactive
/// console.
#[derive(Parser, Debug)]
#[command(name = "adb-tether")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.adb-tether/config.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Keep the connection alive until interrupted.
    Run {
        /// Skip the interactive console (for running as a service).
        #[arg(long)]
        headless: bool,
    },

    /// Run a single reconciliation cycle and report the outcome.
    Check,

    /// Show the devices adb currently sees.
    Devices {
        /// Output format: table or json.
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show or change the cached device address.
    Address {
        /// Store this address.
        #[arg(long, conflicts_with = "clear")]
        set: Option<std::net::Ipv4Addr>,

        /// Forget the cached address.
        #[arg(long)]
        clear: bool,
    },

    /// Show the effective configuration.
    Config {
        /// Write the default config file if it does not exist.
        #[arg(long)]
        init: bool,
    },

    /// Manage the systemd user service.
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ServiceAction {
    /// Install, enable and start the service.
    Install,

    /// Stop and remove the service.
    Uninstall,

    /// Show whether the service is installed and running.
    Status,

    /// Show recent service logs.
    Logs {
        /// Number of lines to show.
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::parse_from(["adb-tether", "-vv"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_address_rejects_non_ipv4() {
        assert!(Cli::try_parse_from(["adb-tether", "address", "--set", "headset"]).is_err());
        assert!(
            Cli::try_parse_from(["adb-tether", "address", "--set", "10.0.0.5", "--clear"])
                .is_err()
        );
    }

    #[test]
    fn test_service_logs_lines() {
        let cli = Cli::parse_from(["adb-tether", "service", "logs", "-n", "5"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Service {
                action: ServiceAction::Logs { lines: 5 }
            })
        ));
    }

    #[test]
    fn test_devices_format() {
        let cli = Cli::parse_from(["adb-tether", "devices", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Devices {
                format: OutputFormat::Json
            })
        ));
    }
}
