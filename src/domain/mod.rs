//! Core domain types for questline

mod activity;
mod event;
mod kinds;
mod outcome;
mod reward;
mod views;

pub use activity::{actions, ActivityEvent, UserId};
pub use event::GamificationEvent;
pub use kinds::{Difficulty, EntryKind, QuestState, QuestType, Rarity, StreakUnit};
pub use outcome::{
    CheckInOutcome, ClaimOutcome, DeductOutcome, NotEligibleReason, ProgressUpdate, StartOutcome,
};
pub use reward::Reward;
pub use views::{
    AchievementStats, AchievementView, ActivityReport, LedgerEntry, LevelChange,
    MaintenanceReport, QuestView, RarityCount, ReconcileReport, StreakView, UserStatistics,
};
