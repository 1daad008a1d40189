use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::counters::CounterContext;
use crate::catalog::{AchievementDef, Catalog};
use crate::db::{opt_from_millis, to_millis};
use crate::domain::{
    actions, AchievementStats, AchievementView, GamificationEvent, Rarity, RarityCount, UserId,
};
use crate::error::{EngineError, Result};
use crate::gamification::{ledger, Session};

/// Level-up cascades re-run evaluation at most this many times
pub const MAX_CASCADE_ROUNDS: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
struct Earned {
    progress: u32,
    is_unlocked: bool,
    earned_at: Option<DateTime<Utc>>,
}

fn earned_by_key(conn: &Connection, user_id: &UserId) -> Result<HashMap<String, Earned>> {
    let mut stmt = conn.prepare(
        "SELECT achievement_key, progress, is_unlocked, earned_at FROM user_achievements WHERE user_id = ?1",
    )?;
    let rows = stmt
        .query_map([user_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                Earned {
                    progress: r.get(1)?,
                    is_unlocked: r.get(2)?,
                    earned_at: opt_from_millis(r.get(3)?),
                },
            ))
        })?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(rows)
}

fn save_progress(s: &Session<'_>, user_id: &UserId, key: &str, progress: u32) -> Result<()> {
    s.conn.execute(
        r#"
        INSERT INTO user_achievements (user_id, achievement_key, progress)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(user_id, achievement_key) DO UPDATE SET progress = excluded.progress
        WHERE user_achievements.is_unlocked = 0
        "#,
        (user_id, key, progress),
    )?;
    Ok(())
}

/// One-time transition to unlocked; false if someone got there first
fn unlock(s: &mut Session<'_>, user_id: &UserId, def: &AchievementDef) -> Result<bool> {
    let changed = s.conn.execute(
        r#"
        INSERT INTO user_achievements (user_id, achievement_key, progress, is_unlocked, earned_at)
        VALUES (?1, ?2, ?3, 1, ?4)
        ON CONFLICT(user_id, achievement_key) DO UPDATE SET
            progress = excluded.progress, is_unlocked = 1, earned_at = excluded.earned_at
        WHERE user_achievements.is_unlocked = 0
        "#,
        (user_id, &def.key, def.criteria_value, to_millis(s.now)),
    )?;
    if changed == 0 {
        return Ok(false);
    }

    if !def.reward.is_zero() {
        ledger::award_reward(s, user_id, def.reward, &format!("achievement:{}", def.key))?;
    }
    info!("{} unlocked achievement '{}' ({})", user_id, def.name, def.rarity);
    s.emit(GamificationEvent::AchievementUnlocked {
        key: def.key.clone(),
        name: def.name.clone(),
        rarity: def.rarity,
        reward: def.reward,
    });
    Ok(true)
}

/// Re-evaluate every locked achievement an action can move.
///
/// Returns the keys unlocked by this call.
pub fn check_and_unlock(s: &mut Session<'_>, user_id: &UserId, action_type: &str) -> Result<Vec<String>> {
    let catalog = s.catalog;
    let counters = s.counters;
    let earned = earned_by_key(s.conn, user_id)?;

    let mut unlocked = Vec::new();
    for def in &catalog.achievements {
        if earned.get(&def.key).is_some_and(|e| e.is_unlocked) {
            continue;
        }
        let Some(counter) = counters.get(&def.criteria_type) else {
            continue;
        };
        if !counter.is_triggered_by(&def.params, action_type, catalog) {
            continue;
        }

        let ctx = CounterContext {
            conn: s.conn,
            catalog,
            user_id,
        };
        let count = counter.count(&ctx, &def.params)?;
        let progress = count.min(def.criteria_value as u64) as u32;

        if progress >= def.criteria_value {
            if unlock(s, user_id, def)? {
                unlocked.push(def.key.clone());
            }
        } else {
            save_progress(s, user_id, &def.key, progress)?;
        }
    }

    if !unlocked.is_empty() {
        debug!("{} via {} unlocked {:?}", user_id, action_type, unlocked);
    }
    Ok(unlocked)
}

/// Follow level-ups caused by rewards until the user's state is stable
pub fn settle(s: &mut Session<'_>, user_id: &UserId) -> Result<Vec<String>> {
    let mut unlocked = Vec::new();
    for _ in 0..MAX_CASCADE_ROUNDS {
        if !s.take_level_up() {
            return Ok(unlocked);
        }
        unlocked.extend(check_and_unlock(s, user_id, actions::LEVEL_UP)?);
    }
    if s.take_level_up() {
        warn!("Achievement cascade for {} cut after {} rounds", user_id, MAX_CASCADE_ROUNDS);
    }
    Ok(unlocked)
}

/// Achievements visible to the user; locked secrets are hidden
pub fn list(conn: &Connection, catalog: &Catalog, user_id: &UserId) -> Result<Vec<AchievementView>> {
    let earned = earned_by_key(conn, user_id)?;
    let views = catalog
        .achievements
        .iter()
        .filter_map(|def| {
            let state = earned.get(&def.key).copied().unwrap_or_default();
            if def.is_secret && !state.is_unlocked {
                return None;
            }
            Some(AchievementView {
                key: def.key.clone(),
                name: def.name.clone(),
                description: def.description.clone(),
                category: def.category.clone(),
                rarity: def.rarity,
                is_secret: def.is_secret,
                criteria_type: def.criteria_type.clone(),
                criteria_value: def.criteria_value,
                progress: state.progress,
                is_unlocked: state.is_unlocked,
                earned_at: state.earned_at,
                reward: def.reward,
            })
        })
        .collect();
    Ok(views)
}

pub fn stats(conn: &Connection, catalog: &Catalog, user_id: &UserId) -> Result<AchievementStats> {
    let views = list(conn, catalog, user_id)?;
    let unlocked: Vec<&AchievementView> = views.iter().filter(|v| v.is_unlocked).collect();

    let by_rarity = Rarity::ALL
        .into_iter()
        .map(|rarity| RarityCount {
            rarity,
            unlocked: unlocked.iter().filter(|v| v.rarity == rarity).count(),
            total: views.iter().filter(|v| v.rarity == rarity).count(),
        })
        .collect();

    let completion_percent = if views.is_empty() {
        0.0
    } else {
        unlocked.len() as f64 * 100.0 / views.len() as f64
    };

    Ok(AchievementStats {
        total: views.len(),
        unlocked: unlocked.len(),
        secrets_unlocked: unlocked.iter().filter(|v| v.is_secret).count(),
        completion_percent,
        tokens_earned: unlocked.iter().map(|v| v.reward.tokens).sum::<Decimal>(),
        xp_earned: unlocked.iter().map(|v| v.reward.xp).sum(),
        by_rarity,
    })
}

/// Administrative re-lock; rewards already paid stay paid
pub fn reset(s: &mut Session<'_>, user_id: &UserId, key: &str) -> Result<bool> {
    if s.catalog.achievement(key).is_none() {
        return Err(EngineError::UnknownAchievement(key.to_string()));
    }
    let changed = s.conn.execute(
        r#"
        UPDATE user_achievements SET is_unlocked = 0, progress = 0, earned_at = NULL
        WHERE user_id = ?1 AND achievement_key = ?2 AND is_unlocked = 1
        "#,
        (user_id, key),
    )?;
    if changed > 0 {
        warn!("Achievement '{}' reset for {}", key, user_id);
    }
    Ok(changed > 0)
}
