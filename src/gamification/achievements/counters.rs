//! Progress counters keyed by criteria type
//!
//! Each counter knows which actions can move it and how to count a user's
//! progress from their history. Families of achievements (progressive
//! thresholds, category mastery) reuse one counter with different params.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension};

use crate::catalog::{Catalog, CriteriaParams};
use crate::domain::{actions, UserId};
use crate::error::Result;

/// What a counter may read
pub struct CounterContext<'a> {
    pub conn: &'a Connection,
    pub catalog: &'a Catalog,
    pub user_id: &'a UserId,
}

pub trait ProgressCounter: Send + Sync {
    /// Registry key, referenced by `AchievementDef::criteria_type`
    fn criteria_type(&self) -> &'static str;

    /// Whether `action_type` can change this counter for the given params
    fn is_triggered_by(&self, params: &CriteriaParams, action_type: &str, catalog: &Catalog) -> bool;

    fn count(&self, ctx: &CounterContext<'_>, params: &CriteriaParams) -> Result<u64>;

    /// Reject params the counter cannot work with
    fn validate(&self, _params: &CriteriaParams) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Sum of `value` over logged activity, optionally within a category
pub struct ActivityCount;

impl ProgressCounter for ActivityCount {
    fn criteria_type(&self) -> &'static str {
        "activity_count"
    }

    fn is_triggered_by(&self, params: &CriteriaParams, action_type: &str, _catalog: &Catalog) -> bool {
        params.action.as_deref() == Some(action_type)
    }

    fn count(&self, ctx: &CounterContext<'_>, params: &CriteriaParams) -> Result<u64> {
        let total: i64 = ctx.conn.query_row(
            r#"
            SELECT COALESCE(SUM(value), 0) FROM activity_log
            WHERE user_id = ?1 AND action_type = ?2 AND (?3 IS NULL OR category = ?3)
            "#,
            (ctx.user_id, &params.action, &params.category),
            |r| r.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    fn validate(&self, params: &CriteriaParams) -> std::result::Result<(), String> {
        match params.action {
            Some(_) => Ok(()),
            None => Err("activity_count needs an action".into()),
        }
    }
}

/// Number of different categories an action was performed in
pub struct DistinctCategories;

impl ProgressCounter for DistinctCategories {
    fn criteria_type(&self) -> &'static str {
        "distinct_categories"
    }

    fn is_triggered_by(&self, params: &CriteriaParams, action_type: &str, _catalog: &Catalog) -> bool {
        params.action.as_deref() == Some(action_type)
    }

    fn count(&self, ctx: &CounterContext<'_>, params: &CriteriaParams) -> Result<u64> {
        let distinct: i64 = ctx.conn.query_row(
            r#"
            SELECT COUNT(DISTINCT category) FROM activity_log
            WHERE user_id = ?1 AND action_type = ?2 AND category IS NOT NULL
            "#,
            (ctx.user_id, &params.action),
            |r| r.get(0),
        )?;
        Ok(distinct as u64)
    }

    fn validate(&self, params: &CriteriaParams) -> std::result::Result<(), String> {
        match params.action {
            Some(_) => Ok(()),
            None => Err("distinct_categories needs an action".into()),
        }
    }
}

/// Completed quests, optionally filtered by difficulty and category
pub struct QuestCompletions;

impl ProgressCounter for QuestCompletions {
    fn criteria_type(&self) -> &'static str {
        "quests_completed"
    }

    fn is_triggered_by(&self, _params: &CriteriaParams, action_type: &str, _catalog: &Catalog) -> bool {
        action_type == actions::QUEST_COMPLETED
    }

    fn count(&self, ctx: &CounterContext<'_>, params: &CriteriaParams) -> Result<u64> {
        let completed: i64 = ctx.conn.query_row(
            r#"
            SELECT COUNT(*) FROM user_quests uq JOIN quests q ON q.id = uq.quest_id
            WHERE uq.user_id = ?1 AND uq.is_completed = 1
              AND (?2 IS NULL OR q.difficulty = ?2)
              AND (?3 IS NULL OR q.category = ?3)
            "#,
            (ctx.user_id, params.difficulty, &params.category),
            |r| r.get(0),
        )?;
        Ok(completed as u64)
    }
}

/// Best length ever reached by one streak type
pub struct StreakLength;

impl ProgressCounter for StreakLength {
    fn criteria_type(&self) -> &'static str {
        "streak_length"
    }

    fn is_triggered_by(&self, params: &CriteriaParams, action_type: &str, catalog: &Catalog) -> bool {
        params
            .streak_type
            .as_deref()
            .and_then(|key| catalog.streak_type(key))
            .is_some_and(|streak| streak.trigger_actions.iter().any(|a| a == action_type))
    }

    fn count(&self, ctx: &CounterContext<'_>, params: &CriteriaParams) -> Result<u64> {
        let longest: Option<u32> = ctx
            .conn
            .query_row(
                "SELECT longest_streak FROM user_streaks WHERE user_id = ?1 AND streak_type = ?2",
                (ctx.user_id, &params.streak_type),
                |r| r.get(0),
            )
            .optional()?;
        Ok(longest.unwrap_or(0) as u64)
    }

    fn validate(&self, params: &CriteriaParams) -> std::result::Result<(), String> {
        match params.streak_type {
            Some(_) => Ok(()),
            None => Err("streak_length needs a streak_type".into()),
        }
    }
}

/// The user's current level number
pub struct LevelReached;

impl ProgressCounter for LevelReached {
    fn criteria_type(&self) -> &'static str {
        "level_reached"
    }

    fn is_triggered_by(&self, _params: &CriteriaParams, action_type: &str, _catalog: &Catalog) -> bool {
        action_type == actions::LEVEL_UP
    }

    fn count(&self, ctx: &CounterContext<'_>, _params: &CriteriaParams) -> Result<u64> {
        let level: Option<u32> = ctx
            .conn
            .query_row(
                "SELECT level_number FROM user_levels WHERE user_id = ?1",
                [ctx.user_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(level.unwrap_or(0) as u64)
    }
}

/// Counters available to the achievement engine, keyed by criteria type
#[derive(Default)]
pub struct CounterRegistry {
    counters: HashMap<&'static str, Box<dyn ProgressCounter>>,
}

impl CounterRegistry {
    /// Registry with every counter the built-in catalog needs
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register(ActivityCount);
        registry.register(DistinctCategories);
        registry.register(QuestCompletions);
        registry.register(StreakLength);
        registry.register(LevelReached);
        registry
    }

    /// Add or replace a counter
    pub fn register<C: ProgressCounter + 'static>(&mut self, counter: C) {
        self.counters.insert(counter.criteria_type(), Box::new(counter));
    }

    pub fn get(&self, criteria_type: &str) -> Option<&dyn ProgressCounter> {
        self.counters.get(criteria_type).map(|c| c.as_ref())
    }

    pub fn contains(&self, criteria_type: &str) -> bool {
        self.counters.contains_key(criteria_type)
    }

    pub fn criteria_types(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.counters.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for CounterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterRegistry")
            .field("criteria_types", &self.criteria_types())
            .finish()
    }
}
