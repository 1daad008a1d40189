//! Read models returned across the engine boundary

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{
    Difficulty, EntryKind, GamificationEvent, QuestState, QuestType, Rarity, Reward, StreakUnit,
    UserId,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStatistics {
    pub user_id: UserId,
    pub level: u32,
    pub level_title: String,
    pub xp: u64,
    pub total_xp: u64,
    pub xp_to_next_level: u64,
    pub token_balance: Decimal,
    pub current_streak: u32,
    pub longest_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelChange {
    pub old_level: u32,
    pub new_level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestView {
    pub quest_id: String,
    pub title: String,
    pub description: String,
    pub quest_type: QuestType,
    pub difficulty: Difficulty,
    pub category: String,
    pub target_value: u32,
    pub progress: u32,
    pub reward: Reward,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub state: QuestState,
    pub completed_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementView {
    pub key: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub rarity: Rarity,
    pub is_secret: bool,
    pub criteria_type: String,
    pub criteria_value: u32,
    pub progress: u32,
    pub is_unlocked: bool,
    pub earned_at: Option<DateTime<Utc>>,
    pub reward: Reward,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RarityCount {
    pub rarity: Rarity,
    pub unlocked: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementStats {
    pub total: usize,
    pub unlocked: usize,
    /// Unlocked secrets; locked ones are not counted anywhere
    pub secrets_unlocked: usize,
    pub completion_percent: f64,
    pub tokens_earned: Decimal,
    pub xp_earned: u64,
    pub by_rarity: Vec<RarityCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreakView {
    pub streak_type: String,
    pub name: String,
    pub unit: StreakUnit,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity: Option<DateTime<Utc>>,
    pub total_milestones_reached: u32,
}

/// One journal row; every balance or XP change has exactly one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: UserId,
    pub kind: EntryKind,
    pub token_delta: Decimal,
    pub xp_delta: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub previous_balance: Decimal,
    pub balance: Decimal,
    pub previous_xp: u64,
    pub xp: u64,
}

impl ReconcileReport {
    pub fn drifted(&self) -> bool {
        self.previous_balance != self.balance || self.previous_xp != self.xp
    }
}

/// What a single emitted activity caused
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityReport {
    pub quests_progressed: usize,
    pub achievements_unlocked: Vec<String>,
    pub events: Vec<GamificationEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub quests_expired: usize,
    pub streaks_reset: usize,
    pub quests_generated: usize,
    pub assignments_created: usize,
}
