//! Pure quota decision logic.
//!
//! The engine evaluates a device's schedule against an injected reference
//! instant and accumulated counters. It owns no timers and reads no wall
//! clock; callers pass the instant in, which keeps every decision
//! deterministic and testable.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::schedule::{DeviceConfig, TimeBlock};

/// Accumulated counters for one occurrence of a time block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounters {
    pub used_minutes: u32,
    pub used_bytes: u64,
    pub bonus_minutes: u32,
    pub bonus_bytes: u64,
}

/// Why a device is currently blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    /// Connected-time budget of the active block is exhausted.
    TimeLimit,
    /// Data budget of the active block is exhausted.
    DataLimit,
    /// Outside every block with `block_outside_time_blocks` set.
    OutsideHours,
    /// Operator-issued override, independent of schedule and usage.
    Manual,
}

/// Outcome of a quota evaluation at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Blocked(BlockedReason),
}

impl Decision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Decision::Blocked(_))
    }

    pub fn reason(&self) -> Option<BlockedReason> {
        match self {
            Decision::Allowed => None,
            Decision::Blocked(reason) => Some(*reason),
        }
    }
}

/// Find the time block containing the reference instant, if any.
///
/// The no-overlap and single-owner-per-day invariants guarantee at most one
/// match, so the first hit wins.
pub fn active_block(config: &DeviceConfig, instant: NaiveDateTime) -> Option<&TimeBlock> {
    let weekday = instant.weekday();
    let time = instant.time();

    config
        .daily_schedules
        .iter()
        .filter(|schedule| schedule.covers(weekday))
        .flat_map(|schedule| schedule.time_blocks.iter())
        .find(|block| block.contains(time))
}

/// Evaluate the blocked/allowed decision for a device.
///
/// Order matters: a manual block always wins; a disabled device is exempt
/// from everything the schedule would impose; only then does the active
/// block's quota apply.
pub fn decide(
    config: &DeviceConfig,
    instant: NaiveDateTime,
    counters: &UsageCounters,
    manual_block: bool,
) -> Decision {
    if manual_block {
        return Decision::Blocked(BlockedReason::Manual);
    }

    if !config.enabled {
        return Decision::Allowed;
    }

    let Some(block) = active_block(config, instant) else {
        return if config.block_outside_time_blocks {
            Decision::Blocked(BlockedReason::OutsideHours)
        } else {
            Decision::Allowed
        };
    };

    let effective_minutes = block.limit_minutes.saturating_add(counters.bonus_minutes);
    if counters.used_minutes >= effective_minutes {
        return Decision::Blocked(BlockedReason::TimeLimit);
    }

    if let Some(limit_bytes) = block.limit_bytes {
        let effective_bytes = limit_bytes.saturating_add(counters.bonus_bytes);
        if counters.used_bytes >= effective_bytes {
            return Decision::Blocked(BlockedReason::DataLimit);
        }
    }

    Decision::Allowed
}

/// Whether the instant lies past the end of the given block on that day.
pub fn block_completed(block: &TimeBlock, instant: NaiveDateTime) -> bool {
    let time = instant.time().with_second(0).unwrap_or(instant.time());
    time >= block.end_time
}
