//! launcherd
//!
//! Missile launcher daemon. Binds the USB launcher when it appears, keeps one
//! device session per attachment and exposes its six actuators as named
//! attributes over a Unix socket and an interactive console.

mod config;
mod frontend;
mod service;
mod usb;

use anyhow::{Context, Result};
use clap::Parser;
use common::{AttributeBridge, LauncherCommand, LauncherEvent, LogStyle, UsbBridge};
use common::{create_usb_bridge, setup_logging_with};
use frontend::AttributeSocket;
use service::Notify;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use usb::{RusbTransport, spawn_usb_worker};

#[derive(Parser, Debug)]
#[command(name = "launcherd")]
#[command(author, version, about = "USB missile launcher daemon")]
#[command(long_about = "
Drives a USB missile launcher (0416:9391) and exposes its actuators
(left, right, up, down, fire, stop) as attributes that read 0/1 and
accept 0/1.

EXAMPLES:
    # Run with default config and an interactive console
    launcherd

    # Run with custom config
    launcherd --config /path/to/launcherd.toml

    # List attached launchers without starting the daemon
    launcherd --list-devices

    # Run as systemd service (no console)
    launcherd --service

CONFIGURATION:
    The daemon looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/missile-launcher/launcherd.toml
    3. /etc/missile-launcher/launcherd.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Run as systemd service (no console)
    #[arg(long)]
    service: bool,

    /// List matching launchers and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = config::ServerConfig::default();
        let path = config::ServerConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        config::ServerConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        config::ServerConfig::load_or_default()
    };

    let service_mode = args.service || config.daemon.service_mode;
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.daemon.log_level);
    let style = if service_mode {
        LogStyle::Journal
    } else {
        LogStyle::Terminal
    };
    setup_logging_with(log_level, style).context("Failed to setup logging")?;

    info!("launcherd v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);

    let settings = config
        .worker_settings()
        .context("Invalid USB settings")?;
    info!(
        "Commit policy: {:?}, control timeout: {:?}",
        settings.session_options.commit_policy, settings.session_options.timeout
    );

    let bridge: Arc<AttributeBridge<RusbTransport>> = Arc::new(AttributeBridge::new());
    let (usb_bridge, worker) = create_usb_bridge();
    let usb_worker_handle = spawn_usb_worker(worker, settings, bridge.clone())
        .context("Failed to spawn USB worker thread")?;

    let result = if args.list_devices {
        list_devices_mode(&usb_bridge).await
    } else {
        run_daemon(&config, service_mode, bridge, usb_bridge.clone()).await
    };

    info!("Shutting down USB subsystem...");
    if let Err(e) = shutdown_usb_worker(&usb_bridge).await {
        error!("Error shutting down USB worker: {:#}", e);
    }

    match tokio::task::spawn_blocking(move || usb_worker_handle.join()).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!("USB worker failed: {}", e),
        Ok(Err(e)) => error!("USB worker thread panicked: {:?}", e),
        Err(e) => error!("Failed to join USB worker: {}", e),
    }

    result
}

/// List matching launchers and exit
async fn list_devices_mode(usb_bridge: &UsbBridge) -> Result<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    usb_bridge
        .send_command(LauncherCommand::ListDevices { response: tx })
        .await
        .context("Failed to send ListDevices command")?;

    let devices = rx.await.context("Failed to receive device list")?;

    if devices.is_empty() {
        println!("No missile launchers found.");
    } else {
        println!("Found {} launcher(s):\n", devices.len());
        for device in devices {
            println!(
                "  {:04x}:{:04x} - {} {}{}",
                device.vendor_id,
                device.product_id,
                device
                    .manufacturer
                    .as_deref()
                    .unwrap_or("Unknown Manufacturer"),
                device.product.as_deref().unwrap_or("Unknown Product"),
                if device.attached { " (attached)" } else { "" }
            );
            println!(
                "      Bus {:03} Device {:03}",
                device.bus_number, device.device_address
            );
        }
    }

    Ok(())
}

/// Serve attributes until Ctrl+C (or console EOF)
async fn run_daemon(
    config: &config::ServerConfig,
    service_mode: bool,
    bridge: Arc<AttributeBridge<RusbTransport>>,
    usb_bridge: UsbBridge,
) -> Result<()> {
    let socket = AttributeSocket::bind(&config.socket_path(), config.attributes.socket_mode)?;

    let events_handle = tokio::spawn(log_events(usb_bridge, service_mode));

    let socket_bridge = bridge.clone();
    let socket_handle = tokio::spawn(async move {
        if let Err(e) = socket.serve(socket_bridge).await {
            error!("Attribute socket error: {:#}", e);
        }
    });

    let watchdog_handle = if service_mode {
        info!("Running in service mode (headless)");
        if service::is_systemd() {
            info!("Running under systemd");
        }
        let handle = service::spawn_watchdog_task();
        service::notify(Notify::Ready).context("Failed to notify systemd ready")?;
        handle
    } else {
        None
    };

    info!("Press Ctrl+C to shutdown");

    if service_mode {
        wait_for_ctrl_c().await;
    } else {
        let input = frontend::console::spawn_stdin_reader()
            .context("Failed to start console input thread")?;
        tokio::select! {
            _ = wait_for_ctrl_c() => {}
            result = frontend::run_console(bridge, input, tokio::io::stdout()) => {
                if let Err(e) = result {
                    error!("Console error: {:#}", e);
                }
                info!("Console closed");
            }
        }
    }

    if service_mode {
        service::notify(Notify::Stopping).context("Failed to notify systemd stopping")?;
    }
    if let Some(handle) = watchdog_handle {
        handle.abort();
    }

    // Dropping the socket task removes the socket file
    socket_handle.abort();
    let _ = socket_handle.await;
    events_handle.abort();

    Ok(())
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
        Err(e) => error!("Error waiting for Ctrl+C: {}", e),
    }
}

/// Log attach/detach events from the USB thread
async fn log_events(usb_bridge: UsbBridge, service_mode: bool) {
    while let Ok(event) = usb_bridge.recv_event().await {
        let status = match event {
            LauncherEvent::Attached { device } => {
                format!("Launcher attached at {:?}", device.location())
            }
            LauncherEvent::Detached { device } => {
                format!("Launcher detached from {:?}", device.location())
            }
            LauncherEvent::AttachFailed {
                bus_number,
                device_address,
                reason,
            } => {
                warn!(
                    "Launcher at bus={}, addr={} could not be attached: {}",
                    bus_number, device_address, reason
                );
                format!("Attach failed: {}", reason)
            }
        };

        if service_mode && let Err(e) = service::notify(Notify::Status(status)) {
            warn!("Failed to send status to systemd: {:#}", e);
        }
    }
}

/// Shutdown USB worker thread gracefully
async fn shutdown_usb_worker(usb_bridge: &UsbBridge) -> Result<()> {
    usb_bridge
        .send_command(LauncherCommand::Shutdown)
        .await
        .context("Failed to send Shutdown command")?;
    Ok(())
}
