use crate::store::{load_json, save_json, KvStore, StoreKey, StoreKind};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// App configuration stored as a `config` snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configured timezone, minutes east of UTC
    #[serde(default)]
    pub tz_offset_minutes: i32,

    /// Whether starting a timer also starts a pomodoro work phase
    #[serde(default)]
    pub pomodoro_enabled: bool,

    #[serde(default = "default_work_secs")]
    pub work_secs: i64,
    #[serde(default = "default_short_break_secs")]
    pub short_break_secs: i64,
    #[serde(default = "default_long_break_secs")]
    pub long_break_secs: i64,
    /// Work sessions before a long break is suggested
    #[serde(default = "default_sessions_before_long_break")]
    pub sessions_before_long_break: u32,
}

fn default_work_secs() -> i64 {
    25 * 60
}

fn default_short_break_secs() -> i64 {
    5 * 60
}

fn default_long_break_secs() -> i64 {
    15 * 60
}

fn default_sessions_before_long_break() -> u32 {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tz_offset_minutes: 0,
            pomodoro_enabled: false,
            work_secs: default_work_secs(),
            short_break_secs: default_short_break_secs(),
            long_break_secs: default_long_break_secs(),
            sessions_before_long_break: default_sessions_before_long_break(),
        }
    }
}

impl AppConfig {
    /// Load configuration; missing or corrupt snapshots yield defaults
    pub fn load(store: &dyn KvStore) -> Self {
        load_json(store, &StoreKey::new(StoreKind::Config))
    }

    pub fn save(&self, store: &dyn KvStore) -> Result<()> {
        save_json(store, &StoreKey::new(StoreKind::Config), self)
    }
}
