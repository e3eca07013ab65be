//! adb-tether - keep a headset's wireless adb connection alive.
//!
//! Watches what adb can see every few seconds. A headset plugged in over USB
//! is switched to network mode and connected over wifi; a dropped wifi
//! connection is re-established from the cached address; a connection that
//! stops answering gets the adb server restarted.
//!
//! QUICK START:
//!   adb-tether                       # Run with an interactive console
//!   adb-tether check                 # One reconciliation pass
//!   adb-tether devices               # What adb sees right now
//!   adb-tether address --set <ip>    # Seed the cached address
//!   adb-tether service install       # Run headless as a user service

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tokio::sync::Notify;

use application::{
    format_devices_json, format_devices_table, format_notice, format_report_summary,
    forward_signal, Console, OutputFormat, Reconciler, Supervisor,
};
use cli::{Cli, Commands, ServiceAction};
use domain::AppConfig;
use infrastructure::{
    ensure_config_exists, load_config, render_config, AdbDriver, AdbRunner, AddressFile,
    AddressStore, DeviceTransport, LogControl, SystemdService,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log = LogControl::init(cli.verbose);

    if let Err(e) = run(cli, log).await {
        eprintln!("{} {e:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli, log: LogControl) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Run { headless: false }) {
        Commands::Run { headless } => cmd_run(&config, log, headless).await?,
        Commands::Check => cmd_check(&config).await?,
        Commands::Devices { format } => cmd_devices(&config, format).await?,
        Commands::Address { set, clear } => cmd_address(&config, set, clear)?,
        Commands::Config { init } => cmd_config(&config, cli.config.as_deref(), init)?,
        Commands::Service { action } => {
            let config_path = cli.config.map(|p| std::path::absolute(&p).unwrap_or(p));
            cmd_service(config, config_path, action)?;
        }
    }

    Ok(())
}

fn build_driver(config: &AppConfig) -> AdbDriver<AdbRunner> {
    let runner = AdbRunner::new(config.adb.program.clone(), config.adb.command_timeout());
    AdbDriver::new(runner, config.adb.port, config.adb.interface.clone())
}

/// Run the reconciliation loop until Ctrl-C or `quit`.
async fn cmd_run(config: &AppConfig, log: LogControl, headless: bool) -> anyhow::Result<()> {
    let driver = build_driver(config);
    let store = AddressFile::new(config.address_file_path());
    let reconciler = Reconciler::new(
        driver.clone(),
        store.clone(),
        config.monitor.max_heal_attempts,
    );
    let quit = Arc::new(Notify::new());

    tracing::info!(
        program = %config.adb.program,
        port = config.adb.port,
        address_file = %store.path().display(),
        "Starting adb-tether"
    );

    if !headless {
        println!("{}", "Type 'help' for a list of commands".dimmed());
        let console = Console::new(driver, store, reconciler.indicator().subscribe(), log);
        tokio::spawn(console.run(Arc::clone(&quit)));
    }

    forward_signal(tokio::signal::ctrl_c(), Arc::clone(&quit));
    let shutdown = async move { quit.notified().await };

    let stats = Supervisor::new(reconciler, config.monitor.interval())
        .run_until(shutdown)
        .await;

    println!(
        "{} after {} cycles ({} failed)",
        "Stopped".bold(),
        stats.cycles,
        stats.failures
    );
    Ok(())
}

/// Run one cycle and print what happened.
async fn cmd_check(config: &AppConfig) -> anyhow::Result<()> {
    let mut reconciler = Reconciler::new(
        build_driver(config),
        AddressFile::new(config.address_file_path()),
        config.monitor.max_heal_attempts,
    );

    let report = reconciler.reconcile().await?;
    for notice in &report.notices {
        println!("{}", format_notice(notice));
    }
    println!("{}", format_report_summary(&report));

    Ok(())
}

/// Show the current device inventory.
async fn cmd_devices(config: &AppConfig, format: OutputFormat) -> anyhow::Result<()> {
    let driver = build_driver(config);
    let devices = driver.list_devices().await?;

    let output = match format {
        OutputFormat::Table => format_devices_table(&devices, driver.port()),
        OutputFormat::Json => format_devices_json(&devices, driver.port())
            .context("Failed to encode device list")?,
    };

    println!("{output}");
    Ok(())
}

/// Show, set or clear the cached address.
fn cmd_address(config: &AppConfig, set: Option<Ipv4Addr>, clear: bool) -> anyhow::Result<()> {
    let file = AddressFile::new(config.address_file_path());

    if clear {
        file.clear()?;
        println!("{} Cleared cached address", "✓".green().bold());
    } else if let Some(address) = set {
        file.save(&address.to_string())?;
        println!("{} Cached address set to {}", "✓".green().bold(), address);
    } else {
        match file.load()? {
            Some(address) => println!("{address}"),
            None => println!(
                "{}",
                format!("No cached address ({})", file.path().display()).dimmed()
            ),
        }
    }

    Ok(())
}

/// Show the effective configuration, or write the default file.
fn cmd_config(config: &AppConfig, path: Option<&Path>, init: bool) -> anyhow::Result<()> {
    let path = path.map_or_else(AppConfig::default_config_path, Path::to_path_buf);

    if init {
        if ensure_config_exists(&path)? {
            println!("{} Created {}", "✓".green().bold(), path.display());
        } else {
            println!("Config already exists at {}", path.display());
        }
        return Ok(());
    }

    let origin = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    };

    println!("{} {}", "Config file:".bold(), origin);
    println!(
        "{} {}",
        "Address file:".bold(),
        config.address_file_path().display()
    );
    println!();
    print!("{}", render_config(config)?);

    Ok(())
}

/// Manage the systemd user service.
fn cmd_service(
    config: AppConfig,
    config_path: Option<PathBuf>,
    action: ServiceAction,
) -> anyhow::Result<()> {
    let service = SystemdService::new(config, config_path);

    match action {
        ServiceAction::Install => {
            let result = service.install()?;
            tracing::debug!(unit = %result.unit_content, "Rendered unit");
            service
                .enable_and_start()
                .context("Service file written but could not be started")?;
            println!(
                "{} Installed {}",
                "✓".green().bold(),
                result.service_path.display()
            );
        }
        ServiceAction::Uninstall => {
            service.uninstall()?;
            println!("{} Service removed", "✓".green().bold());
        }
        ServiceAction::Status => {
            let status = service.status()?;
            println!("{} {}", "Service:".bold(), status.short_status());
            if status.is_installed {
                println!();
                print!("{}", status.status_text);
            }
        }
        ServiceAction::Logs { lines } => {
            print!("{}", service.logs(lines)?);
        }
    }

    Ok(())
}
