use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ApiError;

/// Wall-clock times on the wire are "HH:MM" strings at minute resolution.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// A day selector in a schedule. The controller accepts concrete weekday
/// names plus the `weekdays`/`weekends` shorthands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    Weekdays,
    Weekends,
}

impl ScheduleDay {
    /// Whether this selector covers the given weekday.
    pub fn matches(&self, day: Weekday) -> bool {
        match self {
            ScheduleDay::Monday => day == Weekday::Mon,
            ScheduleDay::Tuesday => day == Weekday::Tue,
            ScheduleDay::Wednesday => day == Weekday::Wed,
            ScheduleDay::Thursday => day == Weekday::Thu,
            ScheduleDay::Friday => day == Weekday::Fri,
            ScheduleDay::Saturday => day == Weekday::Sat,
            ScheduleDay::Sunday => day == Weekday::Sun,
            ScheduleDay::Weekdays => !matches!(day, Weekday::Sat | Weekday::Sun),
            ScheduleDay::Weekends => matches!(day, Weekday::Sat | Weekday::Sun),
        }
    }

    /// Expand to the concrete weekdays this selector claims.
    pub fn expand(&self) -> Vec<Weekday> {
        use Weekday::*;
        match self {
            ScheduleDay::Monday => vec![Mon],
            ScheduleDay::Tuesday => vec![Tue],
            ScheduleDay::Wednesday => vec![Wed],
            ScheduleDay::Thursday => vec![Thu],
            ScheduleDay::Friday => vec![Fri],
            ScheduleDay::Saturday => vec![Sat],
            ScheduleDay::Sunday => vec![Sun],
            ScheduleDay::Weekdays => vec![Mon, Tue, Wed, Thu, Fri],
            ScheduleDay::Weekends => vec![Sat, Sun],
        }
    }
}

/// One contiguous interval within a day during which a quota applies.
///
/// Blocks never span midnight; `limit_bytes` absent means data is unmetered
/// for this block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeBlock {
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,

    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,

    /// Cumulative connected-time budget for the interval, in minutes.
    pub limit_minutes: u32,

    /// Data budget in bytes, if this block is metered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_bytes: Option<u64>,
}

impl TimeBlock {
    /// Whether the time of day falls in `[start_time, end_time)`.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time < self.end_time
    }

    pub fn overlaps(&self, other: &TimeBlock) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }
}

/// Binds a set of days to an ordered sequence of time blocks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DailySchedule {
    pub days: Vec<ScheduleDay>,
    pub time_blocks: Vec<TimeBlock>,
}

impl DailySchedule {
    /// Whether this schedule applies on the given weekday.
    pub fn covers(&self, day: Weekday) -> bool {
        self.days.iter().any(|d| d.matches(day))
    }
}

/// The quota policy for one managed device, keyed externally by MAC.
///
/// Saved as a whole document; there are no partial-field patch semantics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub name: String,

    /// When false the device is exempt from all schedule/quota enforcement.
    pub enabled: bool,

    /// When true the device is blocked whenever the current moment falls in
    /// no time block of today's schedule.
    pub block_outside_time_blocks: bool,

    pub daily_schedules: Vec<DailySchedule>,
}

impl DeviceConfig {
    /// Check the schedule invariants. Called on both ends of the contract at
    /// save time; violations fail the save rather than being corrected.
    ///
    /// Blocks may be listed in any order. Evaluation is order-insensitive
    /// (the overlap check is pairwise and lookup scans every block), so
    /// unordered sequences are accepted as-is rather than sorted.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut claimed: HashSet<Weekday> = HashSet::new();

        for schedule in &self.daily_schedules {
            if schedule.days.is_empty() {
                return Err(ApiError::Validation(
                    "schedule must name at least one day".into(),
                ));
            }

            for selector in &schedule.days {
                for day in selector.expand() {
                    if !claimed.insert(day) {
                        return Err(ApiError::Validation(format!(
                            "day {day:?} is claimed by more than one schedule"
                        )));
                    }
                }
            }

            for block in &schedule.time_blocks {
                if block.start_time >= block.end_time {
                    return Err(ApiError::Validation(format!(
                        "time block {}-{} ends before it starts",
                        block.start_time.format("%H:%M"),
                        block.end_time.format("%H:%M"),
                    )));
                }
            }

            for (i, a) in schedule.time_blocks.iter().enumerate() {
                for b in &schedule.time_blocks[i + 1..] {
                    if a.overlaps(b) {
                        return Err(ApiError::Validation(format!(
                            "time blocks {}-{} and {}-{} overlap",
                            a.start_time.format("%H:%M"),
                            a.end_time.format("%H:%M"),
                            b.start_time.format("%H:%M"),
                            b.end_time.format("%H:%M"),
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// A managed device's config as listed by the controller, tagged with its MAC.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManagedDevice {
    pub mac: String,

    #[serde(flatten)]
    pub config: DeviceConfig,
}
