use anyhow::{Context, Result};
use std::path::Path;

use super::{connect, finish, resolve_config_path};
use crate::api::Controller;
use crate::config;
use crate::state::SessionState;

/// Write an example configuration file for the user to edit.
pub fn init(config_path: Option<&Path>) -> Result<()> {
    let path = resolve_config_path(config_path)?;

    if path.exists() {
        anyhow::bail!("Configuration already exists at: {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }
    std::fs::write(&path, config::EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    println!("✓ Example configuration written to: {}", path.display());
    println!();
    println!("Edit it with your controller address and credentials, then run:");
    println!("  zeitwache login");

    Ok(())
}

/// Exchange the configured credentials for a bearer token and persist it.
pub async fn login(config_path: Option<&Path>) -> Result<()> {
    let dashboard = connect(config_path)?;

    let login = dashboard
        .client
        .login(
            &dashboard.config.controller.username,
            &dashboard.config.controller.password,
        )
        .await
        .context("Login failed")?;

    SessionState::new(login.token, login.user.clone()).save(&dashboard.session_path)?;

    match login.user {
        Some(user) => println!("✓ Logged in as {user}"),
        None => println!("✓ Logged in"),
    }
    Ok(())
}

/// Drop the stored token. Purely local; the controller keeps no session
/// state beyond the token itself.
pub fn logout() -> Result<()> {
    let session_path = crate::state::get_session_path()?;
    SessionState::delete(&session_path)?;
    println!("✓ Logged out");
    Ok(())
}

/// Show the controller's status summary.
pub async fn status(config_path: Option<&Path>) -> Result<()> {
    let dashboard = connect(config_path)?;
    let status = finish(&dashboard, dashboard.client.status().await)?;

    println!("Controller Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "UniFi connection: {}",
        if status.unifi_connected { "ok" } else { "DOWN" }
    );
    println!("Managed devices:  {}", status.managed_devices);
    println!("Blocked devices:  {}", status.blocked_devices);
    if let Some(version) = status.version {
        println!("Version:          {version}");
    }
    if let Some(uptime) = status.uptime {
        println!("Uptime:           {uptime}");
    }

    Ok(())
}
