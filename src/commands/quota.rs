use anyhow::{Context, Result};
use std::path::Path;

use super::{connect, finish};
use crate::api::Controller;
use crate::schedule::DeviceConfig;
use crate::usage::ByteUnit;

/// Print a device's quota configuration as YAML.
pub async fn get(config_path: Option<&Path>, mac: &str) -> Result<()> {
    let dashboard = connect(config_path)?;
    let device_config = finish(&dashboard, dashboard.client.get_device_config(mac).await)?;

    let yaml =
        serde_yaml::to_string(&device_config).context("Failed to render configuration as YAML")?;
    print!("{yaml}");

    Ok(())
}

/// Replace a device's quota configuration from a YAML (or JSON) file.
pub async fn set(config_path: Option<&Path>, mac: &str, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read schedule file: {}", file.display()))?;

    let device_config: DeviceConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse schedule file: {}", file.display()))?;

    // Validation errors out here, before anything touches the network, and
    // again controller-side on save.
    device_config.validate()?;

    let dashboard = connect(config_path)?;
    let saved = finish(
        &dashboard,
        dashboard.client.save_device_config(mac, &device_config).await,
    )?;

    println!("✓ Configuration saved for {} ({mac})", saved.name);
    Ok(())
}

/// Remove a device from management. Idempotent.
pub async fn delete(config_path: Option<&Path>, mac: &str) -> Result<()> {
    let dashboard = connect(config_path)?;
    finish(&dashboard, dashboard.client.delete_device_config(mac).await)?;

    println!("✓ Device {mac} is no longer managed");
    Ok(())
}

pub async fn block(config_path: Option<&Path>, mac: &str) -> Result<()> {
    let dashboard = connect(config_path)?;
    finish(&dashboard, dashboard.client.block_device(mac).await)?;

    println!("✓ Device {mac} blocked");
    Ok(())
}

pub async fn unblock(config_path: Option<&Path>, mac: &str) -> Result<()> {
    let dashboard = connect(config_path)?;
    finish(&dashboard, dashboard.client.unblock_device(mac).await)?;

    println!("✓ Device {mac} unblocked");
    Ok(())
}

/// Grant bonus minutes against the block active right now.
pub async fn add_time(config_path: Option<&Path>, mac: &str, minutes: u32) -> Result<()> {
    let dashboard = connect(config_path)?;
    finish(&dashboard, dashboard.client.add_bonus_time(mac, minutes).await)?;

    println!("✓ Added {minutes} bonus minutes to {mac}");
    Ok(())
}

/// Grant bonus data against the block active right now.
pub async fn add_data(
    config_path: Option<&Path>,
    mac: &str,
    amount: u64,
    unit: ByteUnit,
) -> Result<()> {
    let dashboard = connect(config_path)?;
    finish(
        &dashboard,
        dashboard.client.add_bonus_data(mac, amount, unit).await,
    )?;

    println!("✓ Added {amount} {unit} bonus data to {mac}");
    Ok(())
}
