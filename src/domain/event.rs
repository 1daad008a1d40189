use rust_decimal::Decimal;
use serde::Serialize;

use super::{Rarity, Reward};

/// Events that can happen while an engine operation runs.
///
/// Collected per transaction and handed back to the caller only after commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GamificationEvent {
    TokensAwarded {
        amount: Decimal,
        reason: String,
    },
    TokensDeducted {
        amount: Decimal,
        reason: String,
    },
    XpAwarded {
        amount: u64,
        reason: String,
    },
    LevelUp {
        old_level: u32,
        new_level: u32,
        title: String,
    },
    StreakExtended {
        streak_type: String,
        count: u32,
    },
    StreakReset {
        streak_type: String,
    },
    MilestoneReached {
        streak_type: String,
        count: u32,
        reward: Reward,
    },
    QuestCompleted {
        quest_id: String,
        title: String,
    },
    QuestClaimed {
        quest_id: String,
        reward: Reward,
    },
    AchievementUnlocked {
        key: String,
        name: String,
        rarity: Rarity,
        reward: Reward,
    },
}
