//! Engine facade: the command and query surface other subsystems call
//!
//! Every operation runs in one IMMEDIATE transaction. A stale optimistic
//! lock or a busy database rolls the transaction back and replays it, up to
//! `ledger.max_conflict_retries` times, before surfacing
//! [`EngineError::PersistenceConflict`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::config::Config;
use crate::db::Db;
use crate::domain::{
    actions, AchievementStats, AchievementView, ActivityEvent, ActivityReport, CheckInOutcome,
    ClaimOutcome, DeductOutcome, GamificationEvent, LedgerEntry, LevelChange, MaintenanceReport,
    ProgressUpdate, QuestType, QuestView, ReconcileReport, Reward, StartOutcome, StreakView, UserId,
    UserStatistics,
};
use crate::error::{EngineError, Result};
use crate::gamification::achievements::{self, CounterRegistry};
use crate::gamification::quests::{self, generator, progress};
use crate::gamification::streaks::{self, StreakUpdate};
use crate::gamification::{activity, ledger, Session};

struct Inner {
    db: Db,
    catalog: Catalog,
    counters: CounterRegistry,
    config: Config,
    clock: Clock,
}

/// Cheap to clone; all clones share one database and catalog
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

/// Side effects of one applied activity
struct Applied {
    quests_progressed: usize,
    unlocked: Vec<String>,
}

impl Engine {
    /// Open the configured database and catalog.
    ///
    /// Fails with `MissingReferenceData` when the catalog is incomplete.
    pub fn open(config: Config, clock: Clock) -> Result<Self> {
        let busy = Duration::from_millis(config.ledger.busy_timeout_ms);
        let db = Db::open(&config.database_path(), busy)?;
        let catalog = match &config.catalog.path {
            Some(path) => Catalog::from_file(path)?,
            None => Catalog::builtin(),
        };
        Self::with_parts(db, catalog, CounterRegistry::builtin(), config, clock)
    }

    /// Assemble an engine from explicit parts, validating and seeding the catalog
    pub fn with_parts(
        db: Db,
        catalog: Catalog,
        counters: CounterRegistry,
        config: Config,
        clock: Clock,
    ) -> Result<Self> {
        catalog.validate(&config.streaks.check_in_streak, &counters)?;
        catalog.seed(&db.conn())?;
        info!(
            "Engine ready: {} levels, {} streak types, {} quest templates, {} achievements",
            catalog.levels.len(),
            catalog.streak_types.len(),
            catalog.quest_templates.len(),
            catalog.achievements.len()
        );
        Ok(Self {
            inner: Arc::new(Inner {
                db,
                catalog,
                counters,
                config,
                clock,
            }),
        })
    }

    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // ========================================
    // Transactions
    // ========================================

    fn transact<T>(
        &self,
        op: &str,
        mut f: impl FnMut(&mut Session<'_>) -> Result<T>,
    ) -> Result<(T, Vec<GamificationEvent>)> {
        let retries = self.inner.config.ledger.max_conflict_retries;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.try_once(&mut f) {
                Ok(done) => return Ok(done),
                Err(e) if e.is_retryable() && attempt <= retries => {
                    warn!("{} conflicted (attempt {}/{}): {}", op, attempt, retries + 1, e);
                    // Lock is released here; give the other writer room
                    std::thread::sleep(Duration::from_millis(5 * attempt as u64));
                }
                Err(e) if e.is_retryable() => {
                    warn!("{} gave up after {} attempts: {}", op, attempt, e);
                    return Err(EngineError::PersistenceConflict { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_once<T>(
        &self,
        f: &mut impl FnMut(&mut Session<'_>) -> Result<T>,
    ) -> Result<(T, Vec<GamificationEvent>)> {
        let inner = &*self.inner;
        let mut conn = inner.db.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut session = Session::new(
            &tx,
            &inner.catalog,
            &inner.counters,
            &inner.config,
            inner.clock.now(),
        );
        let value = f(&mut session)?;
        let events = session.into_events();
        tx.commit()?;
        Ok((value, events))
    }

    fn write<T>(&self, op: &str, f: impl FnMut(&mut Session<'_>) -> Result<T>) -> Result<T> {
        let (value, events) = self.transact(op, f)?;
        if !events.is_empty() {
            debug!("{} committed {} events", op, events.len());
        }
        Ok(value)
    }

    fn read<T>(&self, f: impl FnOnce(&Connection, DateTime<Utc>) -> Result<T>) -> Result<T> {
        let conn = self.inner.db.conn();
        f(&conn, self.inner.clock.now())
    }

    // ========================================
    // Activity
    // ========================================

    /// Eagerly create a user's ledger; otherwise it happens on first access
    pub fn register_user(&self, user_id: &UserId) -> Result<UserStatistics> {
        self.write("register_user", |s| {
            ledger::ensure_user(s, user_id)?;
            ledger::statistics(s, user_id)
        })
    }

    /// Feed one activity to streaks, quests and achievements.
    ///
    /// A `check_in` action takes the check-in path; a duplicate check-in
    /// leaves no trace.
    pub fn emit_activity(&self, event: ActivityEvent) -> Result<ActivityReport> {
        let ((quests_progressed, achievements_unlocked), events) =
            self.transact("emit_activity", |s| {
                if event.action_type == actions::CHECK_IN {
                    return Ok(match check_in_session(s, &event)? {
                        (_, Some(applied)) => (applied.quests_progressed, applied.unlocked),
                        (_, None) => (0, Vec::new()),
                    });
                }
                ledger::ensure_user(s, &event.user_id)?;
                activity::record(s, &event)?;
                let catalog = s.catalog;
                for streak in catalog.streak_types_for_action(&event.action_type) {
                    streaks::record(s, &event.user_id, streak)?;
                }
                let applied = fan_out(s, &event)?;
                Ok((applied.quests_progressed, applied.unlocked))
            })?;

        debug!(
            "{} {}: {} quests progressed, {} events",
            event.user_id,
            event.action_type,
            quests_progressed,
            events.len()
        );
        Ok(ActivityReport {
            quests_progressed,
            achievements_unlocked,
            events,
        })
    }

    /// Daily check-in: advances the check-in streak once per day
    pub fn check_in(&self, user_id: &UserId) -> Result<CheckInOutcome> {
        let event = ActivityEvent::new(user_id.clone(), actions::CHECK_IN, 1);
        self.write("check_in", |s| Ok(check_in_session(s, &event)?.0))
    }

    // ========================================
    // Quests
    // ========================================

    pub fn get_active_quests(&self, user_id: &UserId) -> Result<Vec<QuestView>> {
        self.read(|conn, now| quests::active(conn, user_id, now))
    }

    pub fn get_completed_quests(&self, user_id: &UserId) -> Result<Vec<QuestView>> {
        self.read(|conn, now| quests::completed(conn, user_id, now))
    }

    pub fn get_available_quests(&self, user_id: &UserId) -> Result<Vec<QuestView>> {
        self.read(|conn, now| quests::available(conn, user_id, now))
    }

    pub fn start_quest(&self, user_id: &UserId, quest_id: &str) -> Result<StartOutcome> {
        self.write("start_quest", |s| {
            ledger::ensure_user(s, user_id)?;
            quests::start(s, user_id, quest_id)
        })
    }

    /// Pay out a completed quest; a second call reports `NotEligible`
    pub fn claim_quest_reward(&self, user_id: &UserId, quest_id: &str) -> Result<ClaimOutcome> {
        self.write("claim_quest_reward", |s| {
            let outcome = progress::claim(s, user_id, quest_id)?;
            achievements::settle(s, user_id)?;
            Ok(outcome)
        })
    }

    /// Apply a progress delta to one quest directly
    pub fn record_progress(
        &self,
        user_id: &UserId,
        quest_id: &str,
        delta: u32,
        action_type: &str,
    ) -> Result<Option<ProgressUpdate>> {
        self.write("record_progress", |s| {
            let update = progress::record_progress(s, user_id, quest_id, delta, action_type)?;
            achievements::settle(s, user_id)?;
            Ok(update)
        })
    }

    /// Create missing quests of one type for the current period
    pub fn generate_quests(&self, quest_type: QuestType) -> Result<Vec<String>> {
        self.write("generate_quests", |s| generator::generate(s, quest_type))
    }

    /// Assign quests to every known user, one transaction per user
    pub fn assign_to_all_users(&self, quest_ids: &[String]) -> Result<usize> {
        let users = self.read(|conn, _| ledger::user_ids(conn))?;
        let mut created = 0;
        for user_id in &users {
            created += self.write("assign_quests", |s| quests::assign_to_user(s, user_id, quest_ids))?;
        }
        Ok(created)
    }

    pub fn expire_quests(&self) -> Result<usize> {
        self.write("expire_quests", quests::expire)
    }

    // ========================================
    // Streaks
    // ========================================

    pub fn streaks(&self, user_id: &UserId) -> Result<Vec<StreakView>> {
        self.read(|conn, _| streaks::list(conn, &self.inner.catalog, user_id))
    }

    /// Break calendar streaks whose last activity is too old.
    ///
    /// Candidates are found up front; each user is then reset in its own
    /// transaction so the sweep never holds the lock across users.
    pub fn reset_expired_streaks(&self) -> Result<usize> {
        let candidates = self.read(|conn, now| streaks::expired_candidates(conn, &self.inner.catalog, now))?;

        let mut reset = 0;
        let mut i = 0;
        while i < candidates.len() {
            let user_id = &candidates[i].0;
            let end = candidates[i..]
                .iter()
                .position(|(u, _)| u != user_id)
                .map_or(candidates.len(), |n| i + n);
            let keys: Vec<&str> = candidates[i..end].iter().map(|(_, k)| k.as_str()).collect();

            reset += self.write("reset_expired_streaks", |s| {
                let mut count = 0;
                for key in &keys {
                    if streaks::reset_if_expired(s, user_id, key)? {
                        count += 1;
                    }
                }
                Ok(count)
            })?;
            i = end;
        }
        Ok(reset)
    }

    // ========================================
    // Achievements
    // ========================================

    pub fn get_achievements(&self, user_id: &UserId) -> Result<Vec<AchievementView>> {
        self.read(|conn, _| achievements::list(conn, &self.inner.catalog, user_id))
    }

    pub fn get_achievement_stats(&self, user_id: &UserId) -> Result<AchievementStats> {
        self.read(|conn, _| achievements::stats(conn, &self.inner.catalog, user_id))
    }

    /// Re-lock one achievement; paid rewards are kept
    pub fn reset_achievement(&self, user_id: &UserId, key: &str) -> Result<bool> {
        self.write("reset_achievement", |s| achievements::reset(s, user_id, key))
    }

    // ========================================
    // Ledger
    // ========================================

    pub fn get_user_statistics(&self, user_id: &UserId) -> Result<UserStatistics> {
        self.write("get_user_statistics", |s| ledger::statistics(s, user_id))
    }

    pub fn award_tokens(&self, user_id: &UserId, amount: Decimal, reason: &str) -> Result<Decimal> {
        self.write("award_tokens", |s| ledger::award_tokens(s, user_id, amount, reason))
    }

    pub fn deduct_tokens(&self, user_id: &UserId, amount: Decimal, reason: &str) -> Result<DeductOutcome> {
        self.write("deduct_tokens", |s| ledger::deduct_tokens(s, user_id, amount, reason))
    }

    pub fn award_xp(&self, user_id: &UserId, amount: u64, reason: &str) -> Result<Option<LevelChange>> {
        self.write("award_xp", |s| {
            let change = ledger::award_xp(s, user_id, amount, reason)?;
            achievements::settle(s, user_id)?;
            Ok(change)
        })
    }

    /// Tokens and XP together; both apply or neither does
    pub fn award_tokens_and_xp(
        &self,
        user_id: &UserId,
        tokens: Decimal,
        xp: u64,
        reason: &str,
    ) -> Result<Option<LevelChange>> {
        self.write("award_tokens_and_xp", |s| {
            let change = ledger::award_reward(s, user_id, Reward::new(tokens, xp), reason)?;
            achievements::settle(s, user_id)?;
            Ok(change)
        })
    }

    /// Administrative override; may lower the level
    pub fn set_absolute(
        &self,
        user_id: &UserId,
        token_balance: Decimal,
        xp: u64,
        reason: &str,
    ) -> Result<Option<LevelChange>> {
        self.write("set_absolute", |s| {
            let change = ledger::set_absolute(s, user_id, token_balance, xp, reason)?;
            achievements::settle(s, user_id)?;
            Ok(change)
        })
    }

    pub fn reconcile(&self, user_id: &UserId) -> Result<ReconcileReport> {
        self.write("reconcile", |s| ledger::reconcile(s, user_id))
    }

    /// Journal entries, newest first
    pub fn ledger_history(&self, user_id: &UserId, limit: usize) -> Result<Vec<LedgerEntry>> {
        self.read(|conn, _| ledger::history(conn, user_id, limit))
    }

    // ========================================
    // Maintenance
    // ========================================

    /// One full sweep: expire, decay, generate, assign
    pub fn run_maintenance(&self) -> Result<MaintenanceReport> {
        let quests_expired = self.expire_quests()?;
        let streaks_reset = self.reset_expired_streaks()?;

        let mut quests_generated = 0;
        for quest_type in QuestType::ALL {
            quests_generated += self.generate_quests(quest_type)?.len();
        }
        let live = self.read(quests::live_ids)?;
        let assignments_created = self.assign_to_all_users(&live)?;

        let report = MaintenanceReport {
            quests_expired,
            streaks_reset,
            quests_generated,
            assignments_created,
        };
        info!(
            "Maintenance: {} quests expired, {} streaks reset, {} quests generated, {} assignments",
            report.quests_expired,
            report.streaks_reset,
            report.quests_generated,
            report.assignments_created
        );
        Ok(report)
    }
}

/// The check-in path shared by `check_in` and `emit_activity`
fn check_in_session(s: &mut Session<'_>, event: &ActivityEvent) -> Result<(CheckInOutcome, Option<Applied>)> {
    let user_id = &event.user_id;
    let catalog = s.catalog;
    let config = s.config;
    let key = &config.streaks.check_in_streak;
    let streak = catalog
        .streak_type(key)
        .ok_or_else(|| EngineError::MissingReferenceData(format!("check-in streak type '{}'", key)))?;

    ledger::ensure_user(s, user_id)?;
    let advance = match streaks::record(s, user_id, streak)? {
        StreakUpdate::Duplicate => {
            debug!("{} already checked in today", user_id);
            return Ok((CheckInOutcome::AlreadyCheckedInToday, None));
        }
        StreakUpdate::Advanced(advance) => advance,
    };

    activity::record(s, event)?;
    for other in catalog.streak_types_for_action(&event.action_type) {
        if other.key != streak.key {
            streaks::record(s, user_id, other)?;
        }
    }
    let applied = fan_out(s, event)?;

    info!("{} checked in: streak {}", user_id, advance.current);
    Ok((
        CheckInOutcome::CheckedIn {
            tokens_earned: advance.reward.tokens,
            xp_earned: advance.reward.xp,
            streak: advance.current,
            milestone: advance.milestone,
        },
        Some(applied),
    ))
}

/// Quests, achievements and the level-up cascade for a logged activity
fn fan_out(s: &mut Session<'_>, event: &ActivityEvent) -> Result<Applied> {
    let quests_progressed = progress::trigger_by_action(s, event)?.len();
    let mut unlocked = achievements::check_and_unlock(s, &event.user_id, &event.action_type)?;
    unlocked.extend(achievements::settle(s, &event.user_id)?);
    Ok(Applied {
        quests_progressed,
        unlocked,
    })
}
