use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::schedule::hhmm;

/// Live consumption snapshot for the currently active time block.
///
/// Counters are non-decreasing since the block's start on the current day and
/// reset at each new occurrence; bonuses apply to the current occurrence only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeBlockUsage {
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,

    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,

    pub limit_minutes: u32,

    #[serde(default)]
    pub limit_bytes: Option<u64>,

    pub used_minutes: u32,
    pub used_bytes: u64,

    #[serde(default)]
    pub bonus_minutes: u32,

    #[serde(default)]
    pub bonus_bytes: u64,

    pub is_blocked: bool,
}

impl TimeBlockUsage {
    pub fn effective_minutes(&self) -> u32 {
        self.limit_minutes.saturating_add(self.bonus_minutes)
    }

    /// Effective data budget; `None` means the block is unmetered.
    pub fn effective_bytes(&self) -> Option<u64> {
        self.limit_bytes.map(|b| b.saturating_add(self.bonus_bytes))
    }

    pub fn remaining_minutes(&self) -> u32 {
        self.effective_minutes().saturating_sub(self.used_minutes)
    }

    pub fn remaining_bytes(&self) -> Option<u64> {
        self.effective_bytes()
            .map(|b| b.saturating_sub(self.used_bytes))
    }
}

/// Per-block roll-up for the current day, as rendered on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlockSummary {
    #[serde(rename = "start", with = "hhmm")]
    pub start_time: NaiveTime,

    #[serde(rename = "end", with = "hhmm")]
    pub end_time: NaiveTime,

    pub used_minutes: u32,
    pub used_bytes: u64,

    #[serde(default)]
    pub limit_minutes: Option<u32>,

    #[serde(default)]
    pub limit_bytes: Option<u64>,

    #[serde(default)]
    pub active: bool,

    #[serde(default)]
    pub completed: bool,
}

/// Point-in-time usage for one managed device.
///
/// An absent `current_time_block` means no block is active right now, which
/// is distinct from an active block that is fully consumed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceUsage {
    pub mac: String,
    pub name: String,

    #[serde(default)]
    pub current_time_block: Option<TimeBlockUsage>,

    #[serde(default)]
    pub all_blocks_today: Vec<BlockSummary>,
}

/// One day of a device's usage history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub total_minutes: u32,
    pub total_bytes: u64,
}

/// Multiplier selector for bonus-data grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ByteUnit {
    #[serde(rename = "bytes")]
    Bytes,
    #[serde(rename = "KB")]
    Kb,
    #[serde(rename = "MB")]
    Mb,
    #[serde(rename = "GB")]
    Gb,
}

impl ByteUnit {
    pub fn multiplier(&self) -> u64 {
        match self {
            ByteUnit::Bytes => 1,
            ByteUnit::Kb => 1024,
            ByteUnit::Mb => 1024 * 1024,
            ByteUnit::Gb => 1024 * 1024 * 1024,
        }
    }

    pub fn to_bytes(&self, amount: u64) -> u64 {
        amount.saturating_mul(self.multiplier())
    }
}

impl fmt::Display for ByteUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ByteUnit::Bytes => "bytes",
            ByteUnit::Kb => "KB",
            ByteUnit::Mb => "MB",
            ByteUnit::Gb => "GB",
        };
        f.write_str(s)
    }
}

impl FromStr for ByteUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "b" | "bytes" => Ok(ByteUnit::Bytes),
            "kb" => Ok(ByteUnit::Kb),
            "mb" => Ok(ByteUnit::Mb),
            "gb" => Ok(ByteUnit::Gb),
            other => Err(format!("unknown unit: {other} (expected bytes/KB/MB/GB)")),
        }
    }
}

/// Human-readable byte count, dashboard style.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut idx = 0;
    let units = ["KB", "MB", "GB", "TB"];
    while value >= UNIT as f64 && idx < units.len() {
        value /= UNIT as f64;
        idx += 1;
    }
    format!("{:.2} {}", value, units[idx - 1])
}

/// "90m" below an hour, "1h 30m" above.
pub fn format_minutes(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{hours}h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn usage() -> TimeBlockUsage {
        TimeBlockUsage {
            start_time: t(15, 0),
            end_time: t(20, 0),
            limit_minutes: 60,
            limit_bytes: Some(536870912),
            used_minutes: 35,
            used_bytes: 234567890,
            bonus_minutes: 15,
            bonus_bytes: 0,
            is_blocked: false,
        }
    }

    #[test]
    fn effective_limits_include_bonus() {
        let u = usage();
        assert_eq!(u.effective_minutes(), 75);
        assert_eq!(u.effective_bytes(), Some(536870912));
        assert_eq!(u.remaining_minutes(), 40);
    }

    #[test]
    fn unmetered_block_has_no_effective_bytes() {
        let mut u = usage();
        u.limit_bytes = None;
        u.bonus_bytes = 104857600;
        assert_eq!(u.effective_bytes(), None);
        assert_eq!(u.remaining_bytes(), None);
    }

    #[test]
    fn oversized_grants_saturate_instead_of_overflowing() {
        let mut u = usage();
        u.bonus_minutes = u32::MAX;
        u.bonus_bytes = u64::MAX;
        assert_eq!(u.effective_minutes(), u32::MAX);
        assert_eq!(u.effective_bytes(), Some(u64::MAX));
        assert_eq!(ByteUnit::Gb.to_bytes(u64::MAX), u64::MAX);
    }

    #[test]
    fn remaining_saturates_at_zero() {
        let mut u = usage();
        u.used_minutes = 200;
        u.used_bytes = u64::MAX;
        assert_eq!(u.remaining_minutes(), 0);
        assert_eq!(u.remaining_bytes(), Some(0));
    }

    #[test]
    fn absent_current_block_deserializes_to_none() {
        let json = r#"{
            "mac": "aa:bb:cc:dd:ee:03",
            "name": "Smart TV",
            "current_time_block": null,
            "all_blocks_today": []
        }"#;
        let usage: DeviceUsage = serde_json::from_str(json).unwrap();
        assert!(usage.current_time_block.is_none());
        assert!(usage.all_blocks_today.is_empty());
    }

    #[test]
    fn block_summary_uses_short_field_names() {
        let json = r#"{
            "start": "06:00", "end": "07:30",
            "limit_minutes": 30, "used_minutes": 28, "used_bytes": 0,
            "active": false, "completed": true
        }"#;
        let summary: BlockSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.start_time, t(6, 0));
        assert!(summary.completed);
        let back = serde_json::to_value(&summary).unwrap();
        assert_eq!(back["start"], "06:00");
        assert_eq!(back["end"], "07:30");
    }

    #[test]
    fn byte_unit_multipliers() {
        assert_eq!(ByteUnit::Bytes.to_bytes(512), 512);
        assert_eq!(ByteUnit::Kb.to_bytes(2), 2048);
        assert_eq!(ByteUnit::Mb.to_bytes(512), 536870912);
        assert_eq!(ByteUnit::Gb.to_bytes(1), 1073741824);
    }

    #[test]
    fn byte_unit_wire_names() {
        assert_eq!(serde_json::to_value(ByteUnit::Mb).unwrap(), "MB");
        assert_eq!(
            serde_json::from_value::<ByteUnit>(serde_json::json!("bytes")).unwrap(),
            ByteUnit::Bytes
        );
    }

    #[test]
    fn byte_unit_parses_case_insensitively() {
        assert_eq!("mb".parse::<ByteUnit>().unwrap(), ByteUnit::Mb);
        assert_eq!("GB".parse::<ByteUnit>().unwrap(), ByteUnit::Gb);
        assert!("parsec".parse::<ByteUnit>().is_err());
    }

    #[test]
    fn format_helpers() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(536870912), "512.00 MB");
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(90), "1h 30m");
        assert_eq!(format_minutes(120), "2h");
    }
}
