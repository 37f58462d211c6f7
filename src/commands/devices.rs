use anyhow::Result;
use std::path::Path;

use super::{connect, finish};
use crate::api::Controller;
use crate::schedule::ManagedDevice;

/// List every device the controller knows about.
pub async fn list(config_path: Option<&Path>) -> Result<()> {
    let dashboard = connect(config_path)?;
    let devices = finish(&dashboard, dashboard.client.list_devices().await)?;

    if devices.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    println!(
        "{:<18} {:<24} {:<16} {:>8} {:>8}",
        "MAC", "NAME", "IP", "MANAGED", "BLOCKED"
    );
    for device in &devices {
        println!(
            "{:<18} {:<24} {:<16} {:>8} {:>8}",
            device.mac,
            device.display_name(),
            device.ip,
            if device.is_managed { "yes" } else { "-" },
            if device.is_blocked { "YES" } else { "-" },
        );
    }
    println!();
    println!("{} devices", devices.len());

    Ok(())
}

/// List only the devices with a quota configuration.
pub async fn list_managed(config_path: Option<&Path>) -> Result<()> {
    let dashboard = connect(config_path)?;
    let managed = finish(&dashboard, dashboard.client.list_managed_devices().await)?;

    if managed.is_empty() {
        println!("No managed devices. Add one with 'zeitwache config set <mac> <file>'.");
        return Ok(());
    }

    for device in &managed {
        print_managed(device);
    }

    Ok(())
}

fn print_managed(device: &ManagedDevice) {
    let config = &device.config;
    println!("{} ({})", config.name, device.mac);
    println!(
        "  enforcement: {}{}",
        if config.enabled { "enabled" } else { "disabled" },
        if config.block_outside_time_blocks {
            ", blocked outside time blocks"
        } else {
            ""
        }
    );
    for schedule in &config.daily_schedules {
        let days = schedule
            .days
            .iter()
            .map(|d| format!("{d:?}").to_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
        let blocks = schedule
            .time_blocks
            .iter()
            .map(|b| {
                format!(
                    "{}-{} ({}m{})",
                    b.start_time.format("%H:%M"),
                    b.end_time.format("%H:%M"),
                    b.limit_minutes,
                    match b.limit_bytes {
                        Some(bytes) => format!(", {}", crate::usage::format_bytes(bytes)),
                        None => String::new(),
                    }
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {days}: {blocks}");
    }
    println!();
}
