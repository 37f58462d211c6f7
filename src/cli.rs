use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::usage::ByteUnit;

/// Zeitwache dashboard
///
/// Views connected devices, assigns per-device time and data quotas, and
/// watches live usage against those quotas on a router controller.
#[derive(Parser, Debug)]
#[command(name = "zeitwache")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example configuration file
    Init,
    /// Authenticate against the controller and store the session token
    Login,
    /// Discard the stored session token
    Logout,
    /// Show controller status
    Status,
    /// List devices known to the controller
    Devices {
        /// Only devices with a quota configuration
        #[arg(long)]
        managed: bool,
    },
    /// Manage a device's quota configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manually block a device, overriding its schedule
    Block {
        /// Device hardware address
        mac: String,
    },
    /// Clear a manual block
    Unblock {
        mac: String,
    },
    /// Grant bonus minutes to the currently active time block
    AddTime {
        mac: String,
        minutes: u32,
    },
    /// Grant bonus data to the currently active time block
    AddData {
        mac: String,
        amount: u64,
        /// bytes, KB, MB or GB
        #[arg(default_value = "MB")]
        unit: ByteUnit,
    },
    /// Show today's usage for all managed devices, or a single one
    Usage {
        mac: Option<String>,
    },
    /// Show daily usage history for a device
    History {
        mac: String,

        /// Lookback window in days
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Poll usage continuously until interrupted
    Watch {
        /// Refresh interval in seconds (defaults to the config value)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print a device's quota configuration as YAML
    Get { mac: String },
    /// Replace a device's quota configuration from a YAML file
    Set { mac: String, file: PathBuf },
    /// Remove a device from management
    Delete { mac: String },
}
