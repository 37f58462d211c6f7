//! In-memory controller for tests, mirroring the fixtures the dashboard's
//! screenshot suite runs against. All mutations flow through the same
//! decision engine as a real controller would apply, with a settable clock
//! instead of wall time.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use super::{
    Controller, ControllerStatus, Device, LoginResponse, clamp_history_days, normalize_mac,
};
use crate::engine::{self, UsageCounters};
use crate::error::{ApiError, ApiResult};
use crate::schedule::{DailySchedule, DeviceConfig, ManagedDevice, ScheduleDay, TimeBlock};
use crate::usage::{BlockSummary, ByteUnit, DeviceUsage, HistoryPoint, TimeBlockUsage};

/// Counters are keyed per occurrence: mac, date, block start. A new day (or
/// a different block) starts from zero, which is what makes bonuses one-shot.
type CounterKey = (String, NaiveDate, NaiveTime);

struct DiscoveredDevice {
    mac: String,
    name: Option<String>,
    hostname: String,
    ip: String,
}

struct MockState {
    username: String,
    password: String,
    authenticated: bool,
    now: NaiveDateTime,
    discovered: Vec<DiscoveredDevice>,
    configs: BTreeMap<String, DeviceConfig>,
    manual_blocks: HashSet<String>,
    counters: HashMap<CounterKey, UsageCounters>,
    history: HashMap<String, Vec<HistoryPoint>>,
}

pub struct MockController {
    state: Mutex<MockState>,
}

impl MockController {
    pub fn new(username: &str, password: &str) -> Self {
        // Monday noon as a neutral starting instant
        let now = NaiveDate::from_ymd_opt(2026, 8, 24)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        Self {
            state: Mutex::new(MockState {
                username: username.to_string(),
                password: password.to_string(),
                authenticated: false,
                now,
                discovered: Vec::new(),
                configs: BTreeMap::new(),
                manual_blocks: HashSet::new(),
                counters: HashMap::new(),
                history: HashMap::new(),
            }),
        }
    }

    /// The standard fixture set: three managed devices and two strays.
    pub fn with_fixtures() -> Self {
        let mock = Self::new("admin", "changeme");
        {
            let mut state = mock.lock();

            let discovered = [
                ("aa:bb:cc:dd:ee:01", Some("Kids iPad"), "kids-ipad", "192.168.1.101"),
                ("aa:bb:cc:dd:ee:02", Some("Gaming Console"), "xbox-series-x", "192.168.1.102"),
                ("aa:bb:cc:dd:ee:03", Some("Smart TV"), "living-room-tv", "192.168.1.103"),
                ("aa:bb:cc:dd:ee:04", Some("Guest Laptop"), "macbook-guest", "192.168.1.104"),
                ("aa:bb:cc:dd:ee:05", None, "android-phone", "192.168.1.105"),
            ];
            for (mac, name, hostname, ip) in discovered {
                state.discovered.push(DiscoveredDevice {
                    mac: mac.to_string(),
                    name: name.map(String::from),
                    hostname: hostname.to_string(),
                    ip: ip.to_string(),
                });
            }

            state.configs.insert(
                "aa:bb:cc:dd:ee:01".to_string(),
                DeviceConfig {
                    name: "Kids iPad".to_string(),
                    enabled: true,
                    block_outside_time_blocks: true,
                    daily_schedules: vec![
                        DailySchedule {
                            days: vec![ScheduleDay::Weekdays],
                            time_blocks: vec![
                                block(6, 0, 7, 30, 30, None),
                                block(15, 0, 20, 0, 60, Some(536870912)),
                            ],
                        },
                        DailySchedule {
                            days: vec![ScheduleDay::Weekends],
                            time_blocks: vec![block(8, 0, 21, 0, 180, Some(2147483648))],
                        },
                    ],
                },
            );
            state.configs.insert(
                "aa:bb:cc:dd:ee:02".to_string(),
                DeviceConfig {
                    name: "Gaming Console".to_string(),
                    enabled: true,
                    block_outside_time_blocks: false,
                    daily_schedules: vec![
                        DailySchedule {
                            days: vec![ScheduleDay::Weekdays],
                            time_blocks: vec![block(16, 0, 20, 0, 45, None)],
                        },
                        DailySchedule {
                            days: vec![ScheduleDay::Weekends],
                            time_blocks: vec![block(10, 0, 22, 0, 120, None)],
                        },
                    ],
                },
            );
            state.configs.insert(
                "aa:bb:cc:dd:ee:03".to_string(),
                DeviceConfig {
                    name: "Smart TV".to_string(),
                    enabled: true,
                    block_outside_time_blocks: true,
                    daily_schedules: vec![DailySchedule {
                        days: vec![ScheduleDay::Weekdays, ScheduleDay::Weekends],
                        time_blocks: vec![block(18, 0, 21, 0, 90, None)],
                    }],
                },
            );
        }
        mock
    }

    /// Move the mock clock; decisions and snapshots follow it.
    pub fn set_now(&self, now: NaiveDateTime) {
        self.lock().now = now;
    }

    /// Accumulate connected time and traffic against the block active right
    /// now. Outside every block this is a no-op, as there is nothing to
    /// meter against.
    pub fn record_activity(&self, mac: &str, minutes: u32, bytes: u64) {
        let mac = normalize_mac(mac);
        let mut state = self.lock();
        let now = state.now;
        let Some(config) = state.configs.get(&mac) else {
            return;
        };
        let Some(active) = engine::active_block(config, now) else {
            return;
        };
        let key = (mac, now.date(), active.start_time);
        let counters = state.counters.entry(key).or_default();
        counters.used_minutes = counters.used_minutes.saturating_add(minutes);
        counters.used_bytes = counters.used_bytes.saturating_add(bytes);
    }

    pub fn seed_history(&self, mac: &str, points: Vec<HistoryPoint>) {
        self.lock().history.insert(normalize_mac(mac), points);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock poisoned")
    }
}

fn block(
    sh: u32,
    sm: u32,
    eh: u32,
    em: u32,
    limit_minutes: u32,
    limit_bytes: Option<u64>,
) -> TimeBlock {
    TimeBlock {
        start_time: NaiveTime::from_hms_opt(sh, sm, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(eh, em, 0).unwrap(),
        limit_minutes,
        limit_bytes,
    }
}

impl MockState {
    fn require_auth(&self) -> ApiResult<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(ApiError::Auth("unauthorized".into()))
        }
    }

    fn counters_for(&self, mac: &str, start: NaiveTime) -> UsageCounters {
        self.counters
            .get(&(mac.to_string(), self.now.date(), start))
            .copied()
            .unwrap_or_default()
    }

    fn decision_for(&self, mac: &str, config: &DeviceConfig) -> engine::Decision {
        let counters = engine::active_block(config, self.now)
            .map(|b| self.counters_for(mac, b.start_time))
            .unwrap_or_default();
        engine::decide(config, self.now, &counters, self.manual_blocks.contains(mac))
    }

    fn build_usage(&self, mac: &str, config: &DeviceConfig) -> DeviceUsage {
        let weekday = chrono::Datelike::weekday(&self.now);
        let active = engine::active_block(config, self.now);
        let manual = self.manual_blocks.contains(mac);

        let mut all_blocks_today = Vec::new();
        for schedule in config.daily_schedules.iter().filter(|s| s.covers(weekday)) {
            for b in &schedule.time_blocks {
                let counters = self.counters_for(mac, b.start_time);
                let is_active = active.is_some_and(|a| a.start_time == b.start_time);
                all_blocks_today.push(BlockSummary {
                    start_time: b.start_time,
                    end_time: b.end_time,
                    used_minutes: counters.used_minutes,
                    used_bytes: counters.used_bytes,
                    limit_minutes: Some(b.limit_minutes),
                    limit_bytes: b.limit_bytes,
                    active: is_active,
                    completed: !is_active && engine::block_completed(b, self.now),
                });
            }
        }

        let current_time_block = active.map(|b| {
            let counters = self.counters_for(mac, b.start_time);
            let decision = engine::decide(config, self.now, &counters, manual);
            TimeBlockUsage {
                start_time: b.start_time,
                end_time: b.end_time,
                limit_minutes: b.limit_minutes,
                limit_bytes: b.limit_bytes,
                used_minutes: counters.used_minutes,
                used_bytes: counters.used_bytes,
                bonus_minutes: counters.bonus_minutes,
                bonus_bytes: counters.bonus_bytes,
                is_blocked: decision.is_blocked(),
            }
        });

        DeviceUsage {
            mac: mac.to_string(),
            name: config.name.clone(),
            current_time_block,
            all_blocks_today,
        }
    }
}

#[async_trait]
impl Controller for MockController {
    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let mut state = self.lock();
        if username != state.username || password != state.password {
            return Err(ApiError::Auth("invalid credentials".into()));
        }
        state.authenticated = true;
        Ok(LoginResponse {
            token: "mock-token".to_string(),
            user: Some(username.to_string()),
        })
    }

    async fn status(&self) -> ApiResult<ControllerStatus> {
        let state = self.lock();
        state.require_auth()?;

        let blocked = state
            .configs
            .iter()
            .filter(|(mac, config)| state.decision_for(mac, config).is_blocked())
            .count() as u32;

        Ok(ControllerStatus {
            unifi_connected: true,
            managed_devices: state.configs.len() as u32,
            blocked_devices: blocked,
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            uptime: None,
        })
    }

    async fn list_devices(&self) -> ApiResult<Vec<Device>> {
        let state = self.lock();
        state.require_auth()?;

        Ok(state
            .discovered
            .iter()
            .map(|d| {
                let config = state.configs.get(&d.mac);
                let is_blocked = match config {
                    Some(config) => state.decision_for(&d.mac, config).is_blocked(),
                    None => state.manual_blocks.contains(&d.mac),
                };
                Device {
                    mac: d.mac.clone(),
                    name: d.name.clone(),
                    hostname: d.hostname.clone(),
                    ip: d.ip.clone(),
                    is_managed: config.is_some(),
                    is_blocked,
                }
            })
            .collect())
    }

    async fn list_managed_devices(&self) -> ApiResult<Vec<ManagedDevice>> {
        let state = self.lock();
        state.require_auth()?;

        Ok(state
            .configs
            .iter()
            .map(|(mac, config)| ManagedDevice {
                mac: mac.clone(),
                config: config.clone(),
            })
            .collect())
    }

    async fn get_device_config(&self, mac: &str) -> ApiResult<DeviceConfig> {
        let state = self.lock();
        state.require_auth()?;

        state
            .configs
            .get(&normalize_mac(mac))
            .cloned()
            .ok_or_else(|| ApiError::NotFound("device not found".into()))
    }

    async fn save_device_config(&self, mac: &str, config: &DeviceConfig) -> ApiResult<DeviceConfig> {
        let mut state = self.lock();
        state.require_auth()?;

        config.validate()?;
        let mac = normalize_mac(mac);
        // Manual blocks persist across config saves; only delete clears them.
        state.configs.insert(mac.clone(), config.clone());
        Ok(state.configs[&mac].clone())
    }

    async fn delete_device_config(&self, mac: &str) -> ApiResult<()> {
        let mut state = self.lock();
        state.require_auth()?;

        let mac = normalize_mac(mac);
        state.configs.remove(&mac);
        // Deleting returns the device to unmanaged defaults: any manual
        // block is lifted and its counters are orphaned with it.
        state.manual_blocks.remove(&mac);
        state.counters.retain(|(m, _, _), _| *m != mac);
        Ok(())
    }

    async fn block_device(&self, mac: &str) -> ApiResult<()> {
        let mut state = self.lock();
        state.require_auth()?;
        state.manual_blocks.insert(normalize_mac(mac));
        Ok(())
    }

    async fn unblock_device(&self, mac: &str) -> ApiResult<()> {
        let mut state = self.lock();
        state.require_auth()?;
        state.manual_blocks.remove(&normalize_mac(mac));
        Ok(())
    }

    async fn add_bonus_time(&self, mac: &str, minutes: u32) -> ApiResult<()> {
        let mut state = self.lock();
        state.require_auth()?;

        let mac = normalize_mac(mac);
        let now = state.now;
        let config = state
            .configs
            .get(&mac)
            .ok_or_else(|| ApiError::NotFound("device not found".into()))?;
        let active = engine::active_block(config, now)
            .ok_or_else(|| ApiError::Command("no active time block".into()))?;

        let key = (mac, now.date(), active.start_time);
        let counters = state.counters.entry(key).or_default();
        counters.bonus_minutes = counters.bonus_minutes.saturating_add(minutes);
        Ok(())
    }

    async fn add_bonus_data(&self, mac: &str, amount: u64, unit: ByteUnit) -> ApiResult<()> {
        let mut state = self.lock();
        state.require_auth()?;

        let mac = normalize_mac(mac);
        let now = state.now;
        let config = state
            .configs
            .get(&mac)
            .ok_or_else(|| ApiError::NotFound("device not found".into()))?;
        let active = engine::active_block(config, now)
            .ok_or_else(|| ApiError::Command("no active time block".into()))?;

        let key = (mac, now.date(), active.start_time);
        let counters = state.counters.entry(key).or_default();
        counters.bonus_bytes = counters.bonus_bytes.saturating_add(unit.to_bytes(amount));
        Ok(())
    }

    async fn all_usage(&self) -> ApiResult<Vec<DeviceUsage>> {
        let state = self.lock();
        state.require_auth()?;

        Ok(state
            .configs
            .iter()
            .map(|(mac, config)| state.build_usage(mac, config))
            .collect())
    }

    async fn device_usage(&self, mac: &str) -> ApiResult<DeviceUsage> {
        let state = self.lock();
        state.require_auth()?;

        let mac = normalize_mac(mac);
        let config = state
            .configs
            .get(&mac)
            .ok_or_else(|| ApiError::NotFound("device not found".into()))?;
        Ok(state.build_usage(&mac, config))
    }

    async fn usage_history(&self, mac: &str, days: u32) -> ApiResult<Vec<HistoryPoint>> {
        let state = self.lock();
        state.require_auth()?;

        let mac = normalize_mac(mac);
        if !state.configs.contains_key(&mac) {
            return Err(ApiError::NotFound("device not found".into()));
        }

        let days = clamp_history_days(days) as usize;
        let points = state.history.get(&mac).cloned().unwrap_or_default();
        let start = points.len().saturating_sub(days);
        Ok(points[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPAD: &str = "aa:bb:cc:dd:ee:01";
    const CONSOLE: &str = "aa:bb:cc:dd:ee:02";

    fn monday_at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 24)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn tuesday_at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 25)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    async fn logged_in() -> MockController {
        let mock = MockController::with_fixtures();
        mock.login("admin", "changeme").await.unwrap();
        mock
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let mock = MockController::with_fixtures();
        let err = mock.login("admin", "wrong").await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn calls_before_login_fail_auth() {
        let mock = MockController::with_fixtures();
        let err = mock.list_devices().await.unwrap_err();
        assert!(err.is_auth());
        // and specifically not as an inline app error
        assert!(!matches!(err, ApiError::Validation(_) | ApiError::Command(_)));
    }

    #[tokio::test]
    async fn save_then_fetch_round_trips() {
        let mock = logged_in().await;
        let config = mock.get_device_config(IPAD).await.unwrap();

        // save under a differently-cased mac, fetch under the canonical one
        let saved = mock
            .save_device_config(&IPAD.to_uppercase(), &config)
            .await
            .unwrap();
        assert_eq!(saved, config);

        let fetched = mock.get_device_config(IPAD).await.unwrap();
        assert_eq!(fetched, config);
    }

    #[tokio::test]
    async fn invalid_save_fails_without_partial_application() {
        let mock = logged_in().await;
        let original = mock.get_device_config(IPAD).await.unwrap();

        let mut bad = original.clone();
        bad.name = "Renamed".to_string();
        bad.daily_schedules[0].time_blocks[0].end_time = NaiveTime::from_hms_opt(5, 0, 0).unwrap();

        let err = mock.save_device_config(IPAD, &bad).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // nothing of the rejected document took effect
        assert_eq!(mock.get_device_config(IPAD).await.unwrap(), original);
    }

    #[tokio::test]
    async fn get_unknown_mac_is_not_found() {
        let mock = logged_in().await;
        let err = mock.get_device_config("ff:ff:ff:ff:ff:ff").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_lifts_manual_block() {
        let mock = logged_in().await;
        mock.block_device(IPAD).await.unwrap();

        mock.delete_device_config(IPAD).await.unwrap();
        mock.delete_device_config(IPAD).await.unwrap();

        let devices = mock.list_devices().await.unwrap();
        let ipad = devices.iter().find(|d| d.mac == IPAD).unwrap();
        assert!(!ipad.is_managed);
        assert!(!ipad.is_blocked);
    }

    #[tokio::test]
    async fn manual_block_overrides_schedule_and_survives_save() {
        let mock = logged_in().await;
        // inside the afternoon block with quota to spare
        mock.set_now(monday_at(16, 0));
        mock.block_device(IPAD).await.unwrap();

        let usage = mock.device_usage(IPAD).await.unwrap();
        assert!(usage.current_time_block.unwrap().is_blocked);

        let config = mock.get_device_config(IPAD).await.unwrap();
        mock.save_device_config(IPAD, &config).await.unwrap();
        let usage = mock.device_usage(IPAD).await.unwrap();
        assert!(usage.current_time_block.unwrap().is_blocked);

        mock.unblock_device(IPAD).await.unwrap();
        let usage = mock.device_usage(IPAD).await.unwrap();
        assert!(!usage.current_time_block.unwrap().is_blocked);
    }

    #[tokio::test]
    async fn exhausting_minutes_blocks_and_bonus_time_unblocks() {
        let mock = logged_in().await;
        mock.set_now(monday_at(16, 0));
        mock.record_activity(CONSOLE, 45, 0);

        let usage = mock.device_usage(CONSOLE).await.unwrap();
        let current = usage.current_time_block.unwrap();
        assert_eq!(current.used_minutes, 45);
        assert!(current.is_blocked);

        mock.add_bonus_time(CONSOLE, 15).await.unwrap();
        let usage = mock.device_usage(CONSOLE).await.unwrap();
        let current = usage.current_time_block.unwrap();
        assert_eq!(current.bonus_minutes, 15);
        assert!(!current.is_blocked);
    }

    #[tokio::test]
    async fn bonus_data_unblocks_a_data_limited_device() {
        let mock = logged_in().await;
        mock.set_now(monday_at(16, 0));
        // afternoon iPad block: limit 536870912 bytes
        mock.record_activity(IPAD, 10, 536870912);

        let usage = mock.device_usage(IPAD).await.unwrap();
        assert!(usage.current_time_block.unwrap().is_blocked);

        mock.add_bonus_data(IPAD, 512, ByteUnit::Mb).await.unwrap();
        let usage = mock.device_usage(IPAD).await.unwrap();
        let current = usage.current_time_block.unwrap();
        assert_eq!(current.effective_bytes(), Some(1073741824));
        assert!(!current.is_blocked);
    }

    #[tokio::test]
    async fn repeated_huge_bonuses_saturate_without_panicking() {
        let mock = logged_in().await;
        mock.set_now(monday_at(16, 0));

        mock.add_bonus_time(IPAD, u32::MAX).await.unwrap();
        mock.add_bonus_time(IPAD, u32::MAX).await.unwrap();
        mock.add_bonus_data(IPAD, u64::MAX, ByteUnit::Gb).await.unwrap();

        let usage = mock.device_usage(IPAD).await.unwrap();
        let current = usage.current_time_block.unwrap();
        assert_eq!(current.bonus_minutes, u32::MAX);
        assert_eq!(current.effective_bytes(), Some(u64::MAX));
        assert!(!current.is_blocked);
    }

    #[tokio::test]
    async fn bonus_without_active_block_is_rejected() {
        let mock = logged_in().await;
        mock.set_now(monday_at(12, 0));

        let err = mock.add_bonus_time(IPAD, 30).await.unwrap_err();
        assert!(matches!(err, ApiError::Command(_)));

        let err = mock.add_bonus_data(IPAD, 1, ByteUnit::Gb).await.unwrap_err();
        assert!(matches!(err, ApiError::Command(_)));
    }

    #[tokio::test]
    async fn bonus_does_not_carry_into_the_next_occurrence() {
        let mock = logged_in().await;
        mock.set_now(monday_at(16, 0));
        mock.add_bonus_time(IPAD, 30).await.unwrap();

        // same block, next day: fresh occurrence, fresh counters
        mock.set_now(tuesday_at(16, 0));
        let usage = mock.device_usage(IPAD).await.unwrap();
        let current = usage.current_time_block.unwrap();
        assert_eq!(current.bonus_minutes, 0);
        assert_eq!(current.used_minutes, 0);
    }

    #[tokio::test]
    async fn usage_outside_all_blocks_has_no_current_block() {
        let mock = logged_in().await;
        mock.set_now(monday_at(12, 0));

        let usage = mock.device_usage(IPAD).await.unwrap();
        assert!(usage.current_time_block.is_none());
        // the morning block shows up as completed in the day roll-up
        let morning = &usage.all_blocks_today[0];
        assert!(morning.completed);
        assert!(!morning.active);
    }

    #[tokio::test]
    async fn status_counts_managed_and_blocked() {
        let mock = logged_in().await;
        // noon Monday: iPad and Smart TV block outside hours, console does not
        mock.set_now(monday_at(12, 0));

        let status = mock.status().await.unwrap();
        assert!(status.unifi_connected);
        assert_eq!(status.managed_devices, 3);
        assert_eq!(status.blocked_devices, 2);
    }

    #[tokio::test]
    async fn history_clamps_the_lookback_window() {
        let mock = logged_in().await;
        let points: Vec<HistoryPoint> = (1..=10)
            .map(|day| HistoryPoint {
                date: NaiveDate::from_ymd_opt(2026, 8, day).unwrap(),
                total_minutes: day * 10,
                total_bytes: 0,
            })
            .collect();
        mock.seed_history(IPAD, points);

        let history = mock.usage_history(IPAD, 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.last().unwrap().total_minutes, 100);

        // zero is clamped up to one day, huge values down to the max
        assert_eq!(mock.usage_history(IPAD, 0).await.unwrap().len(), 1);
        assert_eq!(mock.usage_history(IPAD, 9999).await.unwrap().len(), 10);

        let err = mock.usage_history("ff:ff:ff:ff:ff:ff", 7).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
