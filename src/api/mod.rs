//! The controller's access API contract: payload shapes, the operation
//! surface as a trait, and the two implementations (HTTP and in-memory).

pub mod http;
pub mod mock;
pub mod poll;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::schedule::{DeviceConfig, ManagedDevice};
use crate::usage::{ByteUnit, DeviceUsage, HistoryPoint};

pub use http::ControllerClient;
pub use mock::MockController;
pub use poll::{PollGate, PollTicket};
pub use session::Session;

/// Default lookback window for usage history.
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

/// Upper bound on the history window; larger requests are clamped, not
/// rejected, matching the controller's behavior.
pub const MAX_HISTORY_DAYS: u32 = 365;

pub fn clamp_history_days(days: u32) -> u32 {
    days.clamp(1, MAX_HISTORY_DAYS)
}

/// MACs are compared case-insensitively everywhere; normalize once at the
/// contract boundary.
pub fn normalize_mac(mac: &str) -> String {
    mac.trim().to_ascii_lowercase()
}

/// A device as discovered on the network, managed or not.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Device {
    pub mac: String,

    #[serde(default)]
    pub name: Option<String>,

    pub hostname: String,
    pub ip: String,

    /// Whether a `DeviceConfig` exists for this MAC.
    pub is_managed: bool,

    /// Manual or quota-derived block currently in effect.
    pub is_blocked: bool,
}

impl Device {
    /// Display label, falling back to the hostname for unnamed devices.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.hostname,
        }
    }
}

/// System status summary from `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ControllerStatus {
    pub unifi_connected: bool,
    pub managed_devices: u32,
    pub blocked_devices: u32,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub uptime: Option<String>,
}

/// Successful login payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    pub token: String,

    #[serde(default)]
    pub user: Option<String>,
}

/// The operation surface a dashboard client uses to read and mutate quota
/// state. All mutations round-trip through the controller; the client holds
/// transient read-only copies only.
#[async_trait]
pub trait Controller {
    /// Exchange credentials for a bearer token.
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse>;

    async fn status(&self) -> ApiResult<ControllerStatus>;

    async fn list_devices(&self) -> ApiResult<Vec<Device>>;

    async fn list_managed_devices(&self) -> ApiResult<Vec<ManagedDevice>>;

    async fn get_device_config(&self, mac: &str) -> ApiResult<DeviceConfig>;

    /// Whole-document replace. Invariants are re-validated; a violation fails
    /// the save without partial application.
    async fn save_device_config(&self, mac: &str, config: &DeviceConfig) -> ApiResult<DeviceConfig>;

    /// Idempotent; deleting an already-unmanaged device is not an error.
    async fn delete_device_config(&self, mac: &str) -> ApiResult<()>;

    /// Set the manual-override block flag.
    async fn block_device(&self, mac: &str) -> ApiResult<()>;

    /// Clear the manual-override block flag.
    async fn unblock_device(&self, mac: &str) -> ApiResult<()>;

    /// Add bonus minutes to the block active at processing time. Rejected
    /// with a command error when no block is active.
    async fn add_bonus_time(&self, mac: &str, minutes: u32) -> ApiResult<()>;

    /// Same semantics as bonus time; the unit multiplier is applied before
    /// the grant persists as bytes.
    async fn add_bonus_data(&self, mac: &str, amount: u64, unit: ByteUnit) -> ApiResult<()>;

    async fn all_usage(&self) -> ApiResult<Vec<DeviceUsage>>;

    async fn device_usage(&self, mac: &str) -> ApiResult<DeviceUsage>;

    async fn usage_history(&self, mac: &str, days: u32) -> ApiResult<Vec<HistoryPoint>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_days_are_clamped_to_a_sane_window() {
        assert_eq!(clamp_history_days(0), 1);
        assert_eq!(clamp_history_days(30), 30);
        assert_eq!(clamp_history_days(365), 365);
        assert_eq!(clamp_history_days(100_000), 365);
    }

    #[test]
    fn mac_normalization_lowercases_and_trims() {
        assert_eq!(normalize_mac(" AA:BB:CC:DD:EE:01 "), "aa:bb:cc:dd:ee:01");
        assert_eq!(normalize_mac("aa:bb:cc:dd:ee:01"), "aa:bb:cc:dd:ee:01");
    }

    #[test]
    fn display_name_falls_back_to_hostname() {
        let mut device = Device {
            mac: "aa:bb:cc:dd:ee:05".into(),
            name: None,
            hostname: "android-phone".into(),
            ip: "192.168.1.105".into(),
            is_managed: false,
            is_blocked: false,
        };
        assert_eq!(device.display_name(), "android-phone");

        device.name = Some(String::new());
        assert_eq!(device.display_name(), "android-phone");

        device.name = Some("Kids Phone".into());
        assert_eq!(device.display_name(), "Kids Phone");
    }

    #[test]
    fn device_tolerates_null_name_on_the_wire() {
        let json = r#"{
            "mac": "AA:BB:CC:DD:EE:05",
            "name": null,
            "hostname": "android-phone",
            "ip": "192.168.1.105",
            "is_managed": false,
            "is_blocked": false
        }"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert!(device.name.is_none());
    }
}
