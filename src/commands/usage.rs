use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use super::{Dashboard, connect, finish};
use crate::api::{Controller, PollGate};
use crate::usage::{DeviceUsage, format_bytes, format_minutes};

/// Show today's usage for all managed devices, or a single one.
pub async fn show(config_path: Option<&Path>, mac: Option<&str>) -> Result<()> {
    let dashboard = connect(config_path)?;

    match mac {
        Some(mac) => {
            let usage = finish(&dashboard, dashboard.client.device_usage(mac).await)?;
            print_device_usage(&usage);
        }
        None => {
            let snapshots = finish(&dashboard, dashboard.client.all_usage().await)?;
            print_all(&snapshots);
        }
    }

    Ok(())
}

/// Show the daily usage history for a device.
pub async fn history(config_path: Option<&Path>, mac: &str, days: u32) -> Result<()> {
    let dashboard = connect(config_path)?;
    let points = finish(&dashboard, dashboard.client.usage_history(mac, days).await)?;

    if points.is_empty() {
        println!("No recorded history for {mac}.");
        return Ok(());
    }

    println!("{:<12} {:>10} {:>12}", "DATE", "TIME", "DATA");
    for point in &points {
        println!(
            "{:<12} {:>10} {:>12}",
            point.date,
            format_minutes(point.total_minutes),
            format_bytes(point.total_bytes),
        );
    }

    Ok(())
}

/// Poll usage on an interval until interrupted.
///
/// Every refresh takes a ticket from the poll gate; a snapshot that comes
/// back after a newer poll started is discarded rather than rendered late.
pub async fn watch(config_path: Option<&Path>, interval: Option<u64>) -> Result<()> {
    let dashboard = connect(config_path)?;
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| dashboard.config.poll_interval());

    println!(
        "Watching usage (refresh every {}s). Press Ctrl+C to stop.",
        interval.as_secs()
    );
    println!();

    let gate = PollGate::new();
    loop {
        refresh(&dashboard, &gate).await?;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                gate.invalidate();
                println!();
                println!("Stopped.");
                return Ok(());
            }
        }
    }
}

async fn refresh(dashboard: &Dashboard, gate: &PollGate) -> Result<()> {
    let ticket = gate.begin();
    let snapshots = finish(dashboard, dashboard.client.all_usage().await)?;

    match ticket.accept(snapshots) {
        Some(snapshots) => {
            println!("── {} ──", chrono::Local::now().format("%H:%M:%S"));
            print_all(&snapshots);
        }
        None => tracing::debug!("discarded stale usage snapshot"),
    }
    Ok(())
}

fn print_all(snapshots: &[DeviceUsage]) {
    if snapshots.is_empty() {
        println!("No managed devices.");
        return;
    }
    for usage in snapshots {
        print_device_usage(usage);
    }
}

fn print_device_usage(usage: &DeviceUsage) {
    println!("{} ({})", usage.name, usage.mac);

    match &usage.current_time_block {
        Some(current) => {
            let marker = if current.is_blocked { "  [BLOCKED]" } else { "" };
            println!(
                "  active block {}-{}{marker}",
                current.start_time.format("%H:%M"),
                current.end_time.format("%H:%M"),
            );

            let bonus = if current.bonus_minutes > 0 {
                format!(" (+{}m bonus)", current.bonus_minutes)
            } else {
                String::new()
            };
            println!(
                "  time: {} / {}{bonus}",
                format_minutes(current.used_minutes),
                format_minutes(current.effective_minutes()),
            );

            match current.effective_bytes() {
                Some(effective) => {
                    let bonus = if current.bonus_bytes > 0 {
                        format!(" (+{} bonus)", format_bytes(current.bonus_bytes))
                    } else {
                        String::new()
                    };
                    println!(
                        "  data: {} / {}{bonus}",
                        format_bytes(current.used_bytes),
                        format_bytes(effective),
                    );
                }
                None => println!("  data: {} (unmetered)", format_bytes(current.used_bytes)),
            }
        }
        None => println!("  no active time block"),
    }

    for block in &usage.all_blocks_today {
        let state = if block.active {
            "active"
        } else if block.completed {
            "completed"
        } else {
            "upcoming"
        };
        let limit = match block.limit_minutes {
            Some(limit) => format!("/{}", format_minutes(limit)),
            None => String::new(),
        };
        println!(
            "    {}-{}: {}{limit} [{state}]",
            block.start_time.format("%H:%M"),
            block.end_time.format("%H:%M"),
            format_minutes(block.used_minutes),
        );
    }
    println!();
}
