//! AchievementEngine: permanent unlocks driven by counted history
//!
//! An activity is mapped to the achievements whose counter it can move
//! ([`ProgressCounter::is_triggered_by`]); only those are recounted.
//! Unlocking happens once per user and pays through the ledger.

mod counters;
mod unlock;

pub use counters::{
    ActivityCount, CounterContext, CounterRegistry, DistinctCategories, LevelReached,
    ProgressCounter, QuestCompletions, StreakLength,
};
pub use unlock::{check_and_unlock, list, reset, settle, stats, MAX_CASCADE_ROUNDS};
