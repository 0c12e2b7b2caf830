//! hidmon
//!
//! Bounded HID device monitor: watches the USB bus for HID-style input
//! devices, reads their input reports, and logs every normalized event.

use anyhow::{Context, Result};
use clap::Parser;
use common::transport::{DeviceCandidate, Transport};
use common::{DEFAULT_EVENT_CAPACITY, event_channel, setup_logging};
use monitor::config::MonitorConfig;
use monitor::registry::DeviceMonitor;
use monitor::usb::UsbTransport;
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hidmon")]
#[command(
    author,
    version,
    about = "Bounded HID device monitor - watch input devices and their reports"
)]
#[command(long_about = "
Monitors a bounded set of USB HID input devices, detects connection and
disconnection, and republishes every observation as a normalized event.

EXAMPLES:
    # Run with default config
    hidmon

    # Run with custom config
    hidmon --config /path/to/monitor.toml

    # List HID-style devices without starting the monitor
    hidmon --list-devices

    # Run with debug logging
    hidmon --log-level debug
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to the default location and exit
    #[arg(long)]
    save_config: bool,

    /// List HID-style USB devices and exit
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
        let config = MonitorConfig::default();
        let path = MonitorConfig::default_path();
        config.save(&path).context("failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        MonitorConfig::load(Some(path.clone())).context("failed to load configuration")?
    } else {
        MonitorConfig::load_or_default()
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.monitor.log_level);
    setup_logging(log_level).context("failed to setup logging")?;

    info!("hidmon v{}", env!("CARGO_PKG_VERSION"));

    let transport = UsbTransport::new().context("failed to initialize USB context")?;

    if args.list_devices {
        return list_devices(&transport);
    }

    let (sink, events) = event_channel(DEFAULT_EVENT_CAPACITY);
    let monitor = DeviceMonitor::new(transport, config, sink);
    monitor.start();
    info!("device monitoring started");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => info!(
                    slot = event.slot_index,
                    device = %event.identity,
                    category = ?event.category,
                    kind = %event.kind,
                    payload = %event.payload,
                    "event"
                ),
                Err(_) => break,
            },
            _ = signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    // Close the channel first so no monitor thread can block on a full
    // queue while shutdown joins it
    drop(events);
    monitor.shutdown();
    Ok(())
}

/// Print the HID-style devices currently on the bus.
fn list_devices(transport: &UsbTransport) -> Result<()> {
    let candidates = transport
        .enumerate()
        .context("failed to enumerate devices")?;

    if candidates.is_empty() {
        println!("No HID-style devices found");
        return Ok(());
    }

    println!("{} device(s):", candidates.len());
    for candidate in &candidates {
        println!(
            "  {:04x}:{:04x}  {}",
            candidate.vendor_id(),
            candidate.product_id(),
            candidate.display_name()
        );
    }

    Ok(())
}
