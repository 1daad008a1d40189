//! LevelProgression: derives a user's level from cumulative XP
//!
//! The level table comes from the catalog and is sorted by `level_number`
//! with strictly increasing `xp_required` (checked at startup).

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use super::Session;
use crate::catalog::LevelDef;
use crate::db::to_millis;
use crate::domain::{GamificationEvent, LevelChange, UserId};
use crate::error::{EngineError, Result};

/// Per-user level state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserLevel {
    pub level_number: u32,
    pub current_xp: u64,
    /// High-water mark of XP ever held
    pub total_xp: u64,
    pub xp_to_next: u64,
}

/// Highest level whose threshold is covered by `xp`
pub fn level_for_xp(levels: &[LevelDef], xp: u64) -> Option<&LevelDef> {
    levels
        .iter()
        .rev()
        .find(|l| xp >= l.xp_required)
        .or_else(|| levels.first())
}

/// The level right after `level_number` (None at max level)
pub fn next_level(levels: &[LevelDef], level_number: u32) -> Option<&LevelDef> {
    levels.iter().find(|l| l.level_number > level_number)
}

/// XP still missing for the next level; 0 at max level
pub fn xp_to_next(levels: &[LevelDef], level_number: u32, current_xp: u64) -> u64 {
    next_level(levels, level_number)
        .map(|next| next.xp_required.saturating_sub(current_xp))
        .unwrap_or(0)
}

/// Advance through every level the new XP covers.
///
/// Supports multi-level jumps, never lowers the level and is idempotent for
/// repeated calls with the same XP.
pub fn apply_xp_change(levels: &[LevelDef], current: UserLevel, new_xp: u64) -> UserLevel {
    let total_xp = current.total_xp.max(new_xp);

    let mut level_number = current.level_number;
    while let Some(next) = next_level(levels, level_number) {
        if total_xp < next.xp_required {
            break;
        }
        level_number = next.level_number;
    }

    UserLevel {
        level_number,
        current_xp: new_xp,
        total_xp,
        xp_to_next: xp_to_next(levels, level_number, new_xp),
    }
}

/// Level state computed from scratch, ignoring history (administrative path)
pub fn recompute(levels: &[LevelDef], xp: u64) -> UserLevel {
    let level_number = level_for_xp(levels, xp).map(|l| l.level_number).unwrap_or(1);
    UserLevel {
        level_number,
        current_xp: xp,
        total_xp: xp,
        xp_to_next: xp_to_next(levels, level_number, xp),
    }
}

pub(crate) fn create(s: &Session<'_>, user_id: &UserId) -> Result<()> {
    let initial = recompute(&s.catalog.levels, 0);
    store(s, user_id, &initial)
}

pub fn load(conn: &Connection, user_id: &UserId) -> Result<Option<UserLevel>> {
    let level = conn
        .query_row(
            "SELECT level_number, current_xp, total_xp, xp_to_next FROM user_levels WHERE user_id = ?1",
            [user_id],
            |r| {
                Ok(UserLevel {
                    level_number: r.get(0)?,
                    current_xp: r.get::<_, i64>(1)? as u64,
                    total_xp: r.get::<_, i64>(2)? as u64,
                    xp_to_next: r.get::<_, i64>(3)? as u64,
                })
            },
        )
        .optional()?;
    Ok(level)
}

fn store(s: &Session<'_>, user_id: &UserId, level: &UserLevel) -> Result<()> {
    s.conn.execute(
        r#"
        INSERT INTO user_levels (user_id, level_number, current_xp, total_xp, xp_to_next, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(user_id) DO UPDATE SET
            level_number = ?2, current_xp = ?3, total_xp = ?4, xp_to_next = ?5, updated_at = ?6
        "#,
        (
            user_id,
            level.level_number,
            level.current_xp as i64,
            level.total_xp as i64,
            level.xp_to_next as i64,
            to_millis(s.now),
        ),
    )?;
    Ok(())
}

fn title_of(s: &Session<'_>, level_number: u32) -> String {
    s.catalog
        .level(level_number)
        .map(|l| l.title.clone())
        .unwrap_or_default()
}

/// Apply a new XP value to the stored level, reporting a level-up
pub(crate) fn apply(s: &mut Session<'_>, user_id: &UserId, new_xp: u64) -> Result<Option<LevelChange>> {
    let current = load(s.conn, user_id)?
        .ok_or_else(|| EngineError::MissingReferenceData(format!("no level row for user {}", user_id)))?;
    let updated = apply_xp_change(&s.catalog.levels, current, new_xp);
    store(s, user_id, &updated)?;

    if updated.level_number > current.level_number {
        Ok(Some(level_up(s, user_id, current.level_number, updated.level_number)))
    } else {
        Ok(None)
    }
}

/// Recompute the stored level from scratch; may lower it
pub(crate) fn reset_to(s: &mut Session<'_>, user_id: &UserId, xp: u64) -> Result<Option<LevelChange>> {
    let previous = load(s.conn, user_id)?.map(|l| l.level_number).unwrap_or(1);
    let updated = recompute(&s.catalog.levels, xp);
    store(s, user_id, &updated)?;

    if updated.level_number > previous {
        Ok(Some(level_up(s, user_id, previous, updated.level_number)))
    } else if updated.level_number < previous {
        info!(
            "Level of {} lowered by adjustment: {} -> {}",
            user_id, previous, updated.level_number
        );
        Ok(Some(LevelChange {
            old_level: previous,
            new_level: updated.level_number,
        }))
    } else {
        Ok(None)
    }
}

fn level_up(s: &mut Session<'_>, user_id: &UserId, old_level: u32, new_level: u32) -> LevelChange {
    let title = title_of(s, new_level);
    info!("{} leveled up: {} -> {} ({})", user_id, old_level, new_level, title);
    s.emit(GamificationEvent::LevelUp {
        old_level,
        new_level,
        title,
    });
    s.mark_level_up();
    LevelChange {
        old_level,
        new_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<LevelDef> {
        [(1, 0), (2, 100), (3, 250), (4, 450)]
            .into_iter()
            .map(|(n, xp)| LevelDef {
                level_number: n,
                xp_required: xp,
                title: format!("L{n}"),
            })
            .collect()
    }

    fn start() -> UserLevel {
        recompute(&table(), 0)
    }

    #[test]
    fn test_level_for_xp() {
        let levels = table();
        assert_eq!(level_for_xp(&levels, 0).unwrap().level_number, 1);
        assert_eq!(level_for_xp(&levels, 99).unwrap().level_number, 1);
        assert_eq!(level_for_xp(&levels, 100).unwrap().level_number, 2);
        assert_eq!(level_for_xp(&levels, 10_000).unwrap().level_number, 4);
    }

    #[test]
    fn test_multi_level_jump() {
        let levels = table();
        let after = apply_xp_change(&levels, start(), 300);
        assert_eq!(after.level_number, 3);
        assert_eq!(after.xp_to_next, 150);
    }

    #[test]
    fn test_idempotent_for_same_xp() {
        let levels = table();
        let once = apply_xp_change(&levels, start(), 120);
        let twice = apply_xp_change(&levels, once, 120);
        assert_eq!(once, twice);
        assert_eq!(twice.xp_to_next, 130);
    }

    #[test]
    fn test_never_decreases() {
        let levels = table();
        let high = apply_xp_change(&levels, start(), 260);
        let lower = apply_xp_change(&levels, high, 50);
        assert_eq!(lower.level_number, 3);
        assert_eq!(lower.total_xp, 260);
    }

    #[test]
    fn test_max_level_has_nothing_to_next() {
        let levels = table();
        let max = apply_xp_change(&levels, start(), 5_000);
        assert_eq!(max.level_number, 4);
        assert_eq!(max.xp_to_next, 0);
    }

    #[test]
    fn test_exact_threshold_reaches_level() {
        let levels = table();
        let at = apply_xp_change(&levels, start(), 100);
        assert_eq!(at.level_number, 2);
        assert_eq!(at.xp_to_next, 150);
    }
}
