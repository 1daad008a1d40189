//! StreakTracker: per-user consecutive-activity counters
//!
//! Calendar streaks (days, weeks) advance once per period, restart after a
//! skipped period and decay passively through [`reset_if_expired`].
//! Item and transaction streaks advance on every qualifying action and never
//! expire by time.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use super::{ledger, Session};
use crate::catalog::{Catalog, StreakTypeDef};
use crate::db::{opt_from_millis, to_millis};
use crate::domain::{GamificationEvent, Reward, StreakUnit, StreakView, UserId};
use crate::error::{EngineError, Result};
use crate::period::{day_bucket, units_between};

/// What a qualifying action does to a streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Already acted this period; nothing changes
    Duplicate,
    /// Exactly one period later (or a progress-based unit)
    Extend,
    /// First activity, or the streak was broken
    Restart,
}

/// Decide the transition for an action at `now`
pub fn decide(unit: StreakUnit, last: Option<DateTime<Utc>>, current: u32, now: DateTime<Utc>) -> Transition {
    let Some(last) = last else {
        return Transition::Restart;
    };
    match units_between(unit, last, now) {
        None => Transition::Extend,
        Some(gap) if gap <= 0 => Transition::Duplicate,
        Some(1) if current > 0 => Transition::Extend,
        Some(_) => Transition::Restart,
    }
}

/// Whether an idle streak has aged past its breaking threshold
pub fn is_expired(unit: StreakUnit, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    matches!(units_between(unit, last, now), Some(gap) if gap > 1)
}

/// Result of an accepted action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakAdvance {
    pub streak_type: String,
    pub current: u32,
    pub longest: u32,
    pub restarted: bool,
    pub milestone: bool,
    /// Base reward plus milestone bonus granted for this step
    pub reward: Reward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreakUpdate {
    Duplicate,
    Advanced(StreakAdvance),
}

#[derive(Debug, Clone, Default)]
struct StreakRow {
    current: u32,
    longest: u32,
    last_activity: Option<DateTime<Utc>>,
    milestones: u32,
}

fn load(conn: &Connection, user_id: &UserId, key: &str) -> Result<Option<StreakRow>> {
    let row = conn
        .query_row(
            r#"
            SELECT current_streak, longest_streak, last_activity, total_milestones_reached
            FROM user_streaks WHERE user_id = ?1 AND streak_type = ?2
            "#,
            (user_id, key),
            |r| {
                Ok(StreakRow {
                    current: r.get(0)?,
                    longest: r.get(1)?,
                    last_activity: opt_from_millis(r.get(2)?),
                    milestones: r.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

fn store(s: &Session<'_>, user_id: &UserId, key: &str, row: &StreakRow) -> Result<()> {
    s.conn.execute(
        r#"
        INSERT INTO user_streaks (user_id, streak_type, current_streak, longest_streak,
                                  last_activity, last_activity_day, total_milestones_reached, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(user_id, streak_type) DO UPDATE SET
            current_streak = ?3, longest_streak = ?4, last_activity = ?5,
            last_activity_day = ?6, total_milestones_reached = ?7, updated_at = ?8
        "#,
        (
            user_id,
            key,
            row.current,
            row.longest,
            row.last_activity.map(to_millis),
            row.last_activity.map(day_bucket),
            row.milestones,
            to_millis(s.now),
        ),
    )?;
    Ok(())
}

/// Apply a qualifying action to one streak
pub fn record(s: &mut Session<'_>, user_id: &UserId, streak: &StreakTypeDef) -> Result<StreakUpdate> {
    let mut row = load(s.conn, user_id, &streak.key)?.unwrap_or_default();

    let transition = decide(streak.unit, row.last_activity, row.current, s.now);
    if transition == Transition::Duplicate {
        debug!("{} already advanced '{}' this period", user_id, streak.key);
        return Ok(StreakUpdate::Duplicate);
    }

    row.current = match transition {
        Transition::Extend => row.current.saturating_add(1),
        _ => 1,
    };
    row.longest = row.longest.max(row.current);
    row.last_activity = Some(s.now);
    let milestone = row.current % streak.milestone_interval == 0;
    if milestone {
        row.milestones = row.milestones.saturating_add(1);
    }
    store(s, user_id, &streak.key, &row)?;

    let mut reward = Reward::ZERO;
    if !streak.base_reward.is_zero() {
        ledger::award_reward(
            s,
            user_id,
            streak.base_reward,
            &format!("streak:{}:{}", streak.key, row.current),
        )?;
        reward += streak.base_reward;
    }
    s.emit(GamificationEvent::StreakExtended {
        streak_type: streak.key.clone(),
        count: row.current,
    });

    if milestone {
        if !streak.milestone_reward.is_zero() {
            ledger::award_reward(
                s,
                user_id,
                streak.milestone_reward,
                &format!("streak_milestone:{}:{}", streak.key, row.current),
            )?;
            reward += streak.milestone_reward;
        }
        info!("{} reached a {}-{} '{}' milestone", user_id, row.current, streak.unit, streak.key);
        s.emit(GamificationEvent::MilestoneReached {
            streak_type: streak.key.clone(),
            count: row.current,
            reward: streak.milestone_reward,
        });
    }

    if streak.key == s.config.streaks.check_in_streak {
        ledger::set_streak(s, user_id, row.current, row.longest)?;
    }

    debug!(
        "{} streak '{}' -> {} ({:?})",
        user_id, streak.key, row.current, transition
    );
    Ok(StreakUpdate::Advanced(StreakAdvance {
        streak_type: streak.key.clone(),
        current: row.current,
        longest: row.longest,
        restarted: transition == Transition::Restart,
        milestone,
        reward,
    }))
}

/// Live calendar streaks that have aged past their threshold at `now`
pub fn expired_candidates(conn: &Connection, catalog: &Catalog, now: DateTime<Utc>) -> Result<Vec<(UserId, String)>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT user_id, streak_type, last_activity FROM user_streaks
        WHERE current_streak > 0 AND last_activity IS NOT NULL
        ORDER BY user_id, streak_type
        "#,
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, UserId>(0)?,
                r.get::<_, String>(1)?,
                opt_from_millis(r.get(2)?),
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows
        .into_iter()
        .filter_map(|(user, key, last)| {
            let unit = catalog.streak_type(&key)?.unit;
            let last = last?;
            is_expired(unit, last, now).then_some((user, key))
        })
        .collect())
}

/// Break one streak if it is still expired; re-checked inside the transaction
pub fn reset_if_expired(s: &mut Session<'_>, user_id: &UserId, key: &str) -> Result<bool> {
    let streak = s
        .catalog
        .streak_type(key)
        .ok_or_else(|| EngineError::UnknownStreakType(key.to_string()))?;
    let unit = streak.unit;

    let Some(mut row) = load(s.conn, user_id, key)? else {
        return Ok(false);
    };
    let Some(last) = row.last_activity else {
        return Ok(false);
    };
    if row.current == 0 || !is_expired(unit, last, s.now) {
        return Ok(false);
    }

    info!("Streak '{}' of {} broken after {} {}", key, user_id, row.current, unit);
    row.current = 0;
    store(s, user_id, key, &row)?;
    s.emit(GamificationEvent::StreakReset {
        streak_type: key.to_string(),
    });

    if key == s.config.streaks.check_in_streak {
        ledger::set_streak(s, user_id, 0, row.longest)?;
    }
    Ok(true)
}

/// Every catalog streak for a user, zeroed where never started
pub fn list(conn: &Connection, catalog: &Catalog, user_id: &UserId) -> Result<Vec<StreakView>> {
    let mut views = Vec::with_capacity(catalog.streak_types.len());
    for streak in &catalog.streak_types {
        let row = load(conn, user_id, &streak.key)?.unwrap_or_default();
        views.push(StreakView {
            streak_type: streak.key.clone(),
            name: streak.name.clone(),
            unit: streak.unit,
            current_streak: row.current,
            longest_streak: row.longest,
            last_activity: row.last_activity,
            total_milestones_reached: row.milestones,
        });
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_first_action_starts_streak() {
        assert_eq!(decide(StreakUnit::Days, None, 0, day(1, 9)), Transition::Restart);
    }

    #[test]
    fn test_same_day_is_duplicate() {
        assert_eq!(
            decide(StreakUnit::Days, Some(day(1, 1)), 1, day(1, 23)),
            Transition::Duplicate
        );
    }

    #[test]
    fn test_next_day_extends_and_gap_restarts() {
        assert_eq!(
            decide(StreakUnit::Days, Some(day(1, 23)), 4, day(2, 0)),
            Transition::Extend
        );
        assert_eq!(
            decide(StreakUnit::Days, Some(day(1, 9)), 4, day(3, 9)),
            Transition::Restart
        );
    }

    #[test]
    fn test_broken_streak_restarts_even_next_day() {
        assert_eq!(
            decide(StreakUnit::Days, Some(day(1, 9)), 0, day(2, 9)),
            Transition::Restart
        );
    }

    #[test]
    fn test_weeks_compare_iso_weeks() {
        // Sunday 10th -> Monday 11th is the next ISO week
        assert_eq!(
            decide(StreakUnit::Weeks, Some(day(10, 12)), 1, day(11, 8)),
            Transition::Extend
        );
        // Monday 4th -> Sunday 10th is the same week
        assert_eq!(
            decide(StreakUnit::Weeks, Some(day(4, 8)), 1, day(10, 8)),
            Transition::Duplicate
        );
    }

    #[test]
    fn test_progress_units_always_extend() {
        let last = day(1, 9);
        assert_eq!(decide(StreakUnit::Items, Some(last), 3, last), Transition::Extend);
        assert_eq!(
            decide(StreakUnit::Transactions, Some(last), 3, last + Duration::days(90)),
            Transition::Extend
        );
        assert!(!is_expired(StreakUnit::Items, last, last + Duration::days(90)));
    }

    #[test]
    fn test_expiry_threshold() {
        assert!(!is_expired(StreakUnit::Days, day(1, 9), day(2, 23)));
        assert!(is_expired(StreakUnit::Days, day(1, 9), day(3, 0)));
        assert!(!is_expired(StreakUnit::Weeks, day(4, 9), day(17, 9)));
        assert!(is_expired(StreakUnit::Weeks, day(4, 9), day(18, 9)));
    }
}
