//! Configuration sections

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::QuestType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; defaults to ~/.questline/questline.db
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Balance a user starts with when first seen
    #[serde(default)]
    pub starting_balance: Decimal,

    /// How many times a conflicted transaction is replayed before giving up
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    /// SQLite busy handler timeout
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::ZERO,
            max_conflict_retries: default_max_conflict_retries(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSettings {
    /// Grant the reward in the same step the target is reached.
    /// When false, completed quests wait for an explicit claim.
    #[serde(default = "default_auto_claim")]
    pub auto_claim: bool,

    /// Max concurrently active quests a user may hold, per type
    #[serde(default = "default_daily_cap")]
    pub daily_cap: u32,
    #[serde(default = "default_weekly_cap")]
    pub weekly_cap: u32,
    #[serde(default = "default_special_cap")]
    pub special_cap: u32,

    /// Quests generated per period, per type
    #[serde(default = "default_daily_count")]
    pub daily_count: u32,
    #[serde(default = "default_weekly_count")]
    pub weekly_count: u32,
    #[serde(default = "default_special_count")]
    pub special_count: u32,

    #[serde(default = "default_special_duration_days")]
    pub special_duration_days: i64,
}

fn default_auto_claim() -> bool {
    true
}

fn default_daily_cap() -> u32 {
    3
}

fn default_weekly_cap() -> u32 {
    2
}

fn default_special_cap() -> u32 {
    1
}

fn default_daily_count() -> u32 {
    3
}

fn default_weekly_count() -> u32 {
    2
}

fn default_special_count() -> u32 {
    1
}

fn default_special_duration_days() -> i64 {
    14
}

impl Default for QuestSettings {
    fn default() -> Self {
        Self {
            auto_claim: default_auto_claim(),
            daily_cap: default_daily_cap(),
            weekly_cap: default_weekly_cap(),
            special_cap: default_special_cap(),
            daily_count: default_daily_count(),
            weekly_count: default_weekly_count(),
            special_count: default_special_count(),
            special_duration_days: default_special_duration_days(),
        }
    }
}

impl QuestSettings {
    pub fn cap_for(&self, quest_type: QuestType) -> u32 {
        match quest_type {
            QuestType::Daily => self.daily_cap,
            QuestType::Weekly => self.weekly_cap,
            QuestType::Special => self.special_cap,
        }
    }

    pub fn count_for(&self, quest_type: QuestType) -> u32 {
        match quest_type {
            QuestType::Daily => self.daily_count,
            QuestType::Weekly => self.weekly_count,
            QuestType::Special => self.special_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakSettings {
    /// Streak type driven by the daily check-in
    #[serde(default = "default_check_in_streak")]
    pub check_in_streak: String,
}

fn default_check_in_streak() -> String {
    "daily_check_in".to_string()
}

impl Default for StreakSettings {
    fn default() -> Self {
        Self {
            check_in_streak: default_check_in_streak(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// TOML file replacing the built-in reference data
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceSettings {
    /// Seconds between background sweeps
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    300
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}
