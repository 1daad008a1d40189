//! QuestEngine: quest instances, assignment and progress
//!
//! Quests are generated from catalog templates per period (see
//! [`generator`]), assigned to users under per-type caps and advanced by
//! activity through their structured triggers (see [`progress`]).
//!
//! A quest is *live* while it is active and `start_date <= now < end_date`.

pub mod generator;
pub mod progress;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::Session;
use crate::db::{decimal_at, from_millis, opt_from_millis, to_millis};
use crate::domain::{QuestState, QuestType, QuestView, Reward, StartOutcome, UserId};
use crate::error::{EngineError, Result};

/// SQL predicate for a live quest aliased `q`, with `now` bound as `?2`
const LIVE: &str = "q.is_active = 1 AND q.start_date <= ?2 AND (q.end_date IS NULL OR q.end_date > ?2)";

/// Quest instance as stored
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestRow {
    pub id: String,
    pub title: String,
    pub quest_type: QuestType,
    pub target_value: u32,
    pub reward: Reward,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl QuestRow {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && self.end_date.is_none_or(|end| end > now)
    }
}

/// One user's hold on a quest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Assignment {
    pub progress: u32,
    pub completed: bool,
    pub claimed: bool,
}

pub(crate) fn load_quest(conn: &Connection, quest_id: &str) -> Result<Option<QuestRow>> {
    let quest = conn
        .query_row(
            r#"
            SELECT id, title, quest_type, target_value, token_reward, xp_reward,
                   start_date, end_date, is_active
            FROM quests WHERE id = ?1
            "#,
            [quest_id],
            |r| {
                Ok(QuestRow {
                    id: r.get(0)?,
                    title: r.get(1)?,
                    quest_type: r.get(2)?,
                    target_value: r.get(3)?,
                    reward: Reward::new(decimal_at(r, 4)?, r.get::<_, i64>(5)? as u64),
                    start_date: from_millis(r.get(6)?),
                    end_date: opt_from_millis(r.get(7)?),
                    is_active: r.get(8)?,
                })
            },
        )
        .optional()?;
    Ok(quest)
}

pub(crate) fn require_quest(conn: &Connection, quest_id: &str) -> Result<QuestRow> {
    load_quest(conn, quest_id)?.ok_or_else(|| EngineError::UnknownQuest(quest_id.to_string()))
}

pub(crate) fn load_assignment(conn: &Connection, user_id: &UserId, quest_id: &str) -> Result<Option<Assignment>> {
    let assignment = conn
        .query_row(
            r#"
            SELECT current_progress, is_completed, date_claimed IS NOT NULL
            FROM user_quests WHERE user_id = ?1 AND quest_id = ?2
            "#,
            (user_id, quest_id),
            |r| {
                Ok(Assignment {
                    progress: r.get(0)?,
                    completed: r.get(1)?,
                    claimed: r.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(assignment)
}

const VIEW_COLUMNS: &str = r#"
    q.id, q.title, q.description, q.quest_type, q.difficulty, q.category, q.target_value,
    q.token_reward, q.xp_reward, q.start_date, q.end_date,
    uq.current_progress, uq.is_completed, uq.completed_at, uq.date_claimed
"#;

fn view_from_row(r: &Row<'_>) -> rusqlite::Result<QuestView> {
    let progress: u32 = r.get::<_, Option<u32>>(11)?.unwrap_or(0);
    let completed: bool = r.get::<_, Option<bool>>(12)?.unwrap_or(false);
    let completed_at = opt_from_millis(r.get(13)?);
    let claimed_at = opt_from_millis(r.get(14)?);
    Ok(QuestView {
        quest_id: r.get(0)?,
        title: r.get(1)?,
        description: r.get(2)?,
        quest_type: r.get(3)?,
        difficulty: r.get(4)?,
        category: r.get(5)?,
        target_value: r.get(6)?,
        progress,
        reward: Reward::new(decimal_at(r, 7)?, r.get::<_, i64>(8)? as u64),
        start_date: from_millis(r.get(9)?),
        end_date: opt_from_millis(r.get(10)?),
        state: QuestState::derive(progress, completed, claimed_at.is_some()),
        completed_at,
        claimed_at,
    })
}

fn query_views(conn: &Connection, filter: &str, user_id: &UserId, now: DateTime<Utc>) -> Result<Vec<QuestView>> {
    let sql = format!(
        "SELECT {VIEW_COLUMNS} FROM quests q \
         LEFT JOIN user_quests uq ON uq.quest_id = q.id AND uq.user_id = ?1 \
         WHERE {filter} ORDER BY q.start_date, q.quest_type, q.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let views = stmt
        .query_map((user_id, to_millis(now)), view_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(views)
}

/// Assigned, not yet completed and still live
pub fn active(conn: &Connection, user_id: &UserId, now: DateTime<Utc>) -> Result<Vec<QuestView>> {
    query_views(
        conn,
        &format!("uq.user_id IS NOT NULL AND uq.is_completed = 0 AND {LIVE}"),
        user_id,
        now,
    )
}

/// Completed quests, claimed or not, including expired ones
pub fn completed(conn: &Connection, user_id: &UserId, now: DateTime<Utc>) -> Result<Vec<QuestView>> {
    query_views(
        conn,
        "uq.user_id IS NOT NULL AND uq.is_completed = 1 AND uq.completed_at <= ?2",
        user_id,
        now,
    )
}

/// Live quests the user does not hold yet
pub fn available(conn: &Connection, user_id: &UserId, now: DateTime<Utc>) -> Result<Vec<QuestView>> {
    query_views(conn, &format!("uq.user_id IS NULL AND {LIVE}"), user_id, now)
}

/// Live, uncompleted quests of one type the user holds
fn active_count(conn: &Connection, user_id: &UserId, quest_type: QuestType, now: DateTime<Utc>) -> Result<u32> {
    let sql = format!(
        "SELECT COUNT(*) FROM user_quests uq JOIN quests q ON q.id = uq.quest_id \
         WHERE uq.user_id = ?1 AND uq.is_completed = 0 AND q.quest_type = ?3 AND {LIVE}"
    );
    let count = conn.query_row(&sql, (user_id, to_millis(now), quest_type), |r| r.get(0))?;
    Ok(count)
}

fn insert_assignment(s: &Session<'_>, user_id: &UserId, quest_id: &str) -> Result<bool> {
    let inserted = s.conn.execute(
        r#"
        INSERT OR IGNORE INTO user_quests (user_id, quest_id, assigned_at)
        VALUES (?1, ?2, ?3)
        "#,
        (user_id, quest_id, to_millis(s.now)),
    )?;
    Ok(inserted > 0)
}

/// Take on a quest explicitly
pub fn start(s: &mut Session<'_>, user_id: &UserId, quest_id: &str) -> Result<StartOutcome> {
    let quest = require_quest(s.conn, quest_id)?;
    if load_assignment(s.conn, user_id, quest_id)?.is_some() {
        return Ok(StartOutcome::AlreadyStarted);
    }
    if !quest.is_live(s.now) {
        return Ok(StartOutcome::Unavailable);
    }
    let cap = s.config.quests.cap_for(quest.quest_type);
    if active_count(s.conn, user_id, quest.quest_type, s.now)? >= cap {
        debug!("{} is at the {} quest cap ({})", user_id, quest.quest_type, cap);
        return Ok(StartOutcome::LimitReached);
    }

    insert_assignment(s, user_id, quest_id)?;
    info!("{} started quest '{}' ({})", user_id, quest.title, quest_id);
    Ok(StartOutcome::Started)
}

/// Hand quests to one user, honoring the per-type caps.
///
/// Quests the user already holds or that are no longer live are skipped.
/// Returns the number of assignments created.
pub fn assign_to_user(s: &mut Session<'_>, user_id: &UserId, quest_ids: &[String]) -> Result<usize> {
    let mut created = 0;
    for quest_id in quest_ids {
        let Some(quest) = load_quest(s.conn, quest_id)? else {
            continue;
        };
        if !quest.is_live(s.now) || load_assignment(s.conn, user_id, quest_id)?.is_some() {
            continue;
        }
        let cap = s.config.quests.cap_for(quest.quest_type);
        if active_count(s.conn, user_id, quest.quest_type, s.now)? >= cap {
            continue;
        }
        if insert_assignment(s, user_id, quest_id)? {
            created += 1;
        }
    }
    if created > 0 {
        debug!("Assigned {} quests to {}", created, user_id);
    }
    Ok(created)
}

/// Deactivate quests past their end date; history is kept
pub fn expire(s: &mut Session<'_>) -> Result<usize> {
    let expired = s.conn.execute(
        r#"
        UPDATE quests SET is_active = 0
        WHERE is_active = 1 AND end_date IS NOT NULL AND end_date <= ?1
        "#,
        [to_millis(s.now)],
    )?;
    if expired > 0 {
        info!("Expired {} quests", expired);
    }
    Ok(expired)
}

/// Ids of every live quest, oldest first
pub fn live_ids(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT q.id FROM quests q WHERE {LIVE} ORDER BY q.start_date, q.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let now = to_millis(now);
    let ids = stmt
        .query_map((now, now), |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::Config;
    use crate::db::Db;
    use crate::gamification::achievements::CounterRegistry;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    pub(crate) struct Fixture {
        pub db: Db,
        pub catalog: Catalog,
        pub counters: CounterRegistry,
        pub config: Config,
        pub now: DateTime<Utc>,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self::with_catalog(Catalog::builtin())
        }

        pub fn with_catalog(catalog: Catalog) -> Self {
            let db = Db::open_in_memory().unwrap();
            catalog.seed(&db.conn()).unwrap();
            Self {
                db,
                catalog,
                counters: CounterRegistry::builtin(),
                config: Config::default(),
                now: Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap(),
            }
        }

        pub fn run<T>(&self, f: impl FnOnce(&mut Session<'_>) -> T) -> T {
            let conn = self.db.conn();
            let mut s = Session::new(&conn, &self.catalog, &self.counters, &self.config, self.now);
            f(&mut s)
        }
    }

    /// Insert a quest by hand, bypassing the generator
    pub(crate) fn insert_quest(
        s: &Session<'_>,
        id: &str,
        quest_type: QuestType,
        target: u32,
        end: Option<DateTime<Utc>>,
        trigger: (&str, Option<&str>),
    ) {
        s.conn
            .execute(
                r#"
                INSERT INTO quests (id, template_key, title, description, quest_type, difficulty,
                                    category, target_value, token_reward, xp_reward,
                                    start_date, end_date, is_active, created_at)
                VALUES (?1, 'manual', ?1, '', ?2, 'easy', 'selling', ?3, '10', 50, ?4, ?5, 1, ?4)
                "#,
                (
                    id,
                    quest_type,
                    target,
                    to_millis(s.now - Duration::hours(1)),
                    end.map(to_millis),
                ),
            )
            .unwrap();
        s.conn
            .execute(
                "INSERT INTO quest_triggers (quest_id, action_type, category) VALUES (?1, ?2, ?3)",
                (id, trigger.0, trigger.1),
            )
            .unwrap();
    }

    fn bob() -> UserId {
        UserId::from("bob")
    }

    #[test]
    fn test_start_then_already_started() {
        let fx = Fixture::new();
        fx.run(|s| {
            insert_quest(s, "q1", QuestType::Daily, 3, None, ("item_listed", None));
            assert_eq!(start(s, &bob(), "q1").unwrap(), StartOutcome::Started);
            assert_eq!(start(s, &bob(), "q1").unwrap(), StartOutcome::AlreadyStarted);

            let views = active(s.conn, &bob(), s.now).unwrap();
            assert_eq!(views.len(), 1);
            assert_eq!(views[0].state, QuestState::NotStarted);
            assert_eq!(views[0].reward, Reward::new(dec!(10), 50));
        });
    }

    #[test]
    fn test_unknown_quest_is_an_error() {
        let fx = Fixture::new();
        fx.run(|s| {
            assert!(matches!(
                start(s, &bob(), "nope"),
                Err(EngineError::UnknownQuest(_))
            ));
        });
    }

    #[test]
    fn test_special_cap_limits_start() {
        let fx = Fixture::new();
        fx.run(|s| {
            insert_quest(s, "s1", QuestType::Special, 5, None, ("post_created", None));
            insert_quest(s, "s2", QuestType::Special, 5, None, ("post_created", None));
            assert_eq!(start(s, &bob(), "s1").unwrap(), StartOutcome::Started);
            assert_eq!(start(s, &bob(), "s2").unwrap(), StartOutcome::LimitReached);
        });
    }

    #[test]
    fn test_assign_respects_caps_and_skips_held() {
        let fx = Fixture::new();
        fx.run(|s| {
            let ids: Vec<String> = (1..=4).map(|n| format!("d{n}")).collect();
            for id in &ids {
                insert_quest(s, id, QuestType::Daily, 3, None, ("item_listed", None));
            }
            assert_eq!(assign_to_user(s, &bob(), &ids).unwrap(), 3);
            assert_eq!(assign_to_user(s, &bob(), &ids).unwrap(), 0);
            assert_eq!(available(s.conn, &bob(), s.now).unwrap().len(), 1);
        });
    }

    #[test]
    fn test_expire_deactivates_past_quests() {
        let fx = Fixture::new();
        fx.run(|s| {
            let past = s.now - Duration::minutes(1);
            insert_quest(s, "old", QuestType::Daily, 3, Some(past), ("item_listed", None));
            insert_quest(s, "new", QuestType::Daily, 3, None, ("item_listed", None));

            assert_eq!(expire(s).unwrap(), 1);
            assert_eq!(expire(s).unwrap(), 0);
            assert_eq!(live_ids(s.conn, s.now).unwrap(), vec!["new".to_string()]);
            assert_eq!(start(s, &bob(), "old").unwrap(), StartOutcome::Unavailable);
        });
    }
}
