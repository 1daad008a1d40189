//! StatisticsLedger: the single source of truth for token balance and XP
//!
//! Every change writes the aggregate row (guarded by its `version` column)
//! and one journal entry, so the balance always equals the sum of the
//! journal. Users are created lazily on first access.

use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::{levels, Session};
use crate::db::{decimal_at, from_millis, to_millis};
use crate::domain::{
    DeductOutcome, EntryKind, GamificationEvent, LedgerEntry, LevelChange, ReconcileReport, Reward,
    UserId, UserStatistics,
};
use crate::error::{EngineError, Result};

/// Row of `user_stats`
#[derive(Debug, Clone, PartialEq)]
struct StatsRow {
    token_balance: Decimal,
    current_xp: u64,
    current_streak: u32,
    longest_streak: u32,
    version: i64,
}

/// XP totals are stored as SQLite integers
pub const MAX_XP: u64 = i64::MAX as u64;

fn xp_out_of_range(amount: u64) -> EngineError {
    EngineError::InvalidAmount {
        what: "xp",
        amount: Decimal::from(amount),
    }
}

fn overflow(what: &'static str, user_id: &UserId) -> EngineError {
    EngineError::Overflow {
        what,
        user_id: user_id.to_string(),
    }
}

/// Create the user's ledger if this is the first time we see them
pub fn ensure_user(s: &mut Session<'_>, user_id: &UserId) -> Result<()> {
    let starting = s.config.ledger.starting_balance;
    let now = to_millis(s.now);
    let inserted = s.conn.execute(
        r#"
        INSERT OR IGNORE INTO user_stats (user_id, token_balance, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        "#,
        (user_id, starting.to_string(), now),
    )?;
    if inserted == 0 {
        return Ok(());
    }

    levels::create(s, user_id)?;
    if starting > Decimal::ZERO {
        journal(s, user_id, EntryKind::StartingBalance, starting, 0, "starting balance")?;
    }
    debug!("Created ledger for {} (starting balance {})", user_id, starting);
    Ok(())
}

fn load(conn: &Connection, user_id: &UserId) -> Result<StatsRow> {
    let row = conn.query_row(
        r#"
        SELECT token_balance, current_xp, current_streak, longest_streak, version
        FROM user_stats WHERE user_id = ?1
        "#,
        [user_id],
        |r| {
            Ok(StatsRow {
                token_balance: decimal_at(r, 0)?,
                current_xp: r.get::<_, i64>(1)? as u64,
                current_streak: r.get(2)?,
                longest_streak: r.get(3)?,
                version: r.get(4)?,
            })
        },
    )?;
    Ok(row)
}

/// Compare-and-swap on `version`; a miss means another writer got there first
fn store(s: &Session<'_>, user_id: &UserId, row: &StatsRow) -> Result<()> {
    let updated = s.conn.execute(
        r#"
        UPDATE user_stats
        SET token_balance = ?1, current_xp = ?2, current_streak = ?3, longest_streak = ?4,
            version = version + 1, updated_at = ?5
        WHERE user_id = ?6 AND version = ?7
        "#,
        (
            row.token_balance.normalize().to_string(),
            row.current_xp as i64,
            row.current_streak,
            row.longest_streak,
            to_millis(s.now),
            user_id,
            row.version,
        ),
    )?;
    if updated == 0 {
        return Err(EngineError::StaleWrite {
            user_id: user_id.to_string(),
        });
    }
    Ok(())
}

fn journal(
    s: &Session<'_>,
    user_id: &UserId,
    kind: EntryKind,
    token_delta: Decimal,
    xp_delta: i64,
    reason: &str,
) -> Result<()> {
    s.conn.execute(
        r#"
        INSERT INTO ledger_entries (user_id, kind, token_delta, xp_delta, reason, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        (
            user_id,
            kind,
            token_delta.normalize().to_string(),
            xp_delta,
            reason,
            to_millis(s.now),
        ),
    )?;
    Ok(())
}

/// Increase the balance
pub fn award_tokens(s: &mut Session<'_>, user_id: &UserId, amount: Decimal, reason: &str) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount { what: "token", amount });
    }
    credit(s, user_id, amount, 0, reason)?;
    Ok(load(s.conn, user_id)?.token_balance)
}

/// Increase XP and advance the level
pub fn award_xp(s: &mut Session<'_>, user_id: &UserId, amount: u64, reason: &str) -> Result<Option<LevelChange>> {
    if amount == 0 {
        return Err(EngineError::InvalidAmount {
            what: "xp",
            amount: Decimal::ZERO,
        });
    }
    if amount > MAX_XP {
        return Err(xp_out_of_range(amount));
    }
    credit(s, user_id, Decimal::ZERO, amount, reason)
}

/// Tokens and XP in one step: both apply or neither does
pub fn award_reward(s: &mut Session<'_>, user_id: &UserId, reward: Reward, reason: &str) -> Result<Option<LevelChange>> {
    if reward.tokens < Decimal::ZERO {
        return Err(EngineError::InvalidAmount {
            what: "token",
            amount: reward.tokens,
        });
    }
    if reward.is_zero() {
        return Err(EngineError::InvalidAmount {
            what: "reward",
            amount: Decimal::ZERO,
        });
    }
    if reward.xp > MAX_XP {
        return Err(xp_out_of_range(reward.xp));
    }
    credit(s, user_id, reward.tokens, reward.xp, reason)
}

fn credit(
    s: &mut Session<'_>,
    user_id: &UserId,
    tokens: Decimal,
    xp: u64,
    reason: &str,
) -> Result<Option<LevelChange>> {
    ensure_user(s, user_id)?;
    let mut row = load(s.conn, user_id)?;
    row.token_balance = row
        .token_balance
        .checked_add(tokens)
        .ok_or_else(|| overflow("token balance", user_id))?;
    row.current_xp = row
        .current_xp
        .checked_add(xp)
        .filter(|total| *total <= MAX_XP)
        .ok_or_else(|| overflow("xp", user_id))?;
    store(s, user_id, &row)?;
    journal(s, user_id, EntryKind::Award, tokens, xp as i64, reason)?;

    debug!("Awarded {} tokens / {} XP to {} ({})", tokens, xp, user_id, reason);
    if tokens > Decimal::ZERO {
        s.emit(GamificationEvent::TokensAwarded {
            amount: tokens,
            reason: reason.to_string(),
        });
    }
    if xp == 0 {
        return Ok(None);
    }
    s.emit(GamificationEvent::XpAwarded {
        amount: xp,
        reason: reason.to_string(),
    });
    levels::apply(s, user_id, row.current_xp)
}

/// Decrease the balance. Insufficient funds is reported, never raised.
pub fn deduct_tokens(s: &mut Session<'_>, user_id: &UserId, amount: Decimal, reason: &str) -> Result<DeductOutcome> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount { what: "token", amount });
    }
    ensure_user(s, user_id)?;
    let mut row = load(s.conn, user_id)?;
    if row.token_balance < amount {
        info!(
            "Rejected deduction of {} from {}: balance {}",
            amount, user_id, row.token_balance
        );
        return Ok(DeductOutcome::InsufficientBalance {
            balance: row.token_balance,
            requested: amount,
        });
    }

    row.token_balance = row
        .token_balance
        .checked_sub(amount)
        .ok_or_else(|| overflow("token balance", user_id))?;
    store(s, user_id, &row)?;
    journal(s, user_id, EntryKind::Deduction, -amount, 0, reason)?;
    debug!("Deducted {} tokens from {} ({})", amount, user_id, reason);
    s.emit(GamificationEvent::TokensDeducted {
        amount,
        reason: reason.to_string(),
    });
    Ok(DeductOutcome::Deducted {
        new_balance: row.token_balance,
    })
}

/// Administrative override of balance and XP.
///
/// The difference is journaled as an adjustment and the level is recomputed
/// from the new XP, which may lower it.
pub fn set_absolute(
    s: &mut Session<'_>,
    user_id: &UserId,
    token_balance: Decimal,
    xp: u64,
    reason: &str,
) -> Result<Option<LevelChange>> {
    if token_balance < Decimal::ZERO {
        return Err(EngineError::InvalidAmount {
            what: "balance",
            amount: token_balance,
        });
    }
    if xp > MAX_XP {
        return Err(xp_out_of_range(xp));
    }
    ensure_user(s, user_id)?;
    let mut row = load(s.conn, user_id)?;
    let token_delta = token_balance
        .checked_sub(row.token_balance)
        .ok_or_else(|| overflow("token balance", user_id))?;
    let xp_delta = xp as i64 - row.current_xp as i64;

    row.token_balance = token_balance;
    row.current_xp = xp;
    store(s, user_id, &row)?;
    journal(s, user_id, EntryKind::Adjustment, token_delta, xp_delta, reason)?;
    warn!(
        "Set {} to {} tokens / {} XP ({}), delta {} / {}",
        user_id, token_balance, xp, reason, token_delta, xp_delta
    );
    levels::reset_to(s, user_id, xp)
}

/// Recompute balance and XP from the journal and overwrite the aggregate
pub fn reconcile(s: &mut Session<'_>, user_id: &UserId) -> Result<ReconcileReport> {
    ensure_user(s, user_id)?;
    let mut row = load(s.conn, user_id)?;

    let mut stmt = s
        .conn
        .prepare("SELECT token_delta, xp_delta FROM ledger_entries WHERE user_id = ?1")?;
    let mut balance = Decimal::ZERO;
    let mut xp: i64 = 0;
    let mut rows = stmt.query([user_id])?;
    while let Some(r) = rows.next()? {
        balance = balance
            .checked_add(decimal_at(r, 0)?)
            .ok_or_else(|| overflow("token balance", user_id))?;
        xp = xp
            .checked_add(r.get::<_, i64>(1)?)
            .ok_or_else(|| overflow("xp", user_id))?;
    }
    let xp = xp.max(0) as u64;

    let report = ReconcileReport {
        previous_balance: row.token_balance,
        balance,
        previous_xp: row.current_xp,
        xp,
    };
    if report.drifted() {
        warn!(
            "Ledger drift for {}: balance {} -> {}, xp {} -> {}",
            user_id, report.previous_balance, balance, report.previous_xp, xp
        );
        row.token_balance = balance;
        row.current_xp = xp;
        store(s, user_id, &row)?;
        levels::reset_to(s, user_id, xp)?;
    } else {
        debug!("Ledger for {} is consistent", user_id);
    }
    Ok(report)
}

/// Mirror the check-in streak onto the aggregate row
pub(crate) fn set_streak(s: &mut Session<'_>, user_id: &UserId, current: u32, longest: u32) -> Result<()> {
    ensure_user(s, user_id)?;
    let mut row = load(s.conn, user_id)?;
    row.current_streak = current;
    row.longest_streak = row.longest_streak.max(longest).max(current);
    store(s, user_id, &row)
}

pub fn statistics(s: &mut Session<'_>, user_id: &UserId) -> Result<UserStatistics> {
    ensure_user(s, user_id)?;
    let row = load(s.conn, user_id)?;
    let level = levels::load(s.conn, user_id)?.unwrap_or_else(|| levels::recompute(&s.catalog.levels, row.current_xp));
    let level_title = s
        .catalog
        .level(level.level_number)
        .map(|l| l.title.clone())
        .unwrap_or_default();

    Ok(UserStatistics {
        user_id: user_id.clone(),
        level: level.level_number,
        level_title,
        xp: row.current_xp,
        total_xp: level.total_xp,
        xp_to_next_level: level.xp_to_next,
        token_balance: row.token_balance,
        current_streak: row.current_streak,
        longest_streak: row.longest_streak,
    })
}

/// Every user with a ledger
pub fn user_ids(conn: &Connection) -> Result<Vec<UserId>> {
    let mut stmt = conn.prepare("SELECT user_id FROM user_stats ORDER BY user_id")?;
    let ids = stmt
        .query_map([], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<UserId>>>()?;
    Ok(ids)
}

/// Journal entries, newest first
pub fn history(conn: &Connection, user_id: &UserId, limit: usize) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, user_id, kind, token_delta, xp_delta, reason, created_at
        FROM ledger_entries WHERE user_id = ?1
        ORDER BY id DESC LIMIT ?2
        "#,
    )?;
    let entries = stmt
        .query_map((user_id, limit as i64), |r| {
            Ok(LedgerEntry {
                id: r.get(0)?,
                user_id: r.get(1)?,
                kind: r.get(2)?,
                token_delta: decimal_at(r, 3)?,
                xp_delta: r.get(4)?,
                reason: r.get(5)?,
                created_at: from_millis(r.get(6)?),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::Config;
    use crate::db::Db;
    use crate::gamification::achievements::CounterRegistry;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    struct Fixture {
        db: Db,
        catalog: Catalog,
        counters: CounterRegistry,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let db = Db::open_in_memory().unwrap();
            let catalog = Catalog::builtin();
            catalog.seed(&db.conn()).unwrap();
            Self {
                db,
                catalog,
                counters: CounterRegistry::builtin(),
                config: Config::default(),
            }
        }

        fn run<T>(&self, f: impl FnOnce(&mut Session<'_>) -> T) -> T {
            let conn = self.db.conn();
            let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
            let mut s = Session::new(&conn, &self.catalog, &self.counters, &self.config, now);
            f(&mut s)
        }
    }

    fn alice() -> UserId {
        UserId::from("alice")
    }

    #[test]
    fn test_award_and_deduct_are_journaled() {
        let fx = Fixture::new();
        fx.run(|s| {
            award_tokens(s, &alice(), dec!(10), "gift").unwrap();
            let outcome = deduct_tokens(s, &alice(), dec!(4), "purchase").unwrap();
            assert_eq!(outcome, DeductOutcome::Deducted { new_balance: dec!(6) });

            let history = history(s.conn, &alice(), 10).unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(history[0].kind, EntryKind::Deduction);
            assert_eq!(history[0].token_delta, dec!(-4));
        });
    }

    #[test]
    fn test_insufficient_balance_changes_nothing() {
        let fx = Fixture::new();
        fx.run(|s| {
            award_tokens(s, &alice(), dec!(3), "gift").unwrap();
            let outcome = deduct_tokens(s, &alice(), dec!(5), "purchase").unwrap();
            assert_eq!(
                outcome,
                DeductOutcome::InsufficientBalance {
                    balance: dec!(3),
                    requested: dec!(5)
                }
            );
            assert_eq!(statistics(s, &alice()).unwrap().token_balance, dec!(3));
            assert_eq!(history(s.conn, &alice(), 10).unwrap().len(), 1);
        });
    }

    #[test]
    fn test_non_positive_amounts_are_rejected() {
        let fx = Fixture::new();
        fx.run(|s| {
            assert!(matches!(
                award_tokens(s, &alice(), dec!(0), "nothing"),
                Err(EngineError::InvalidAmount { .. })
            ));
            assert!(matches!(
                deduct_tokens(s, &alice(), dec!(-1), "negative"),
                Err(EngineError::InvalidAmount { .. })
            ));
            assert!(award_xp(s, &alice(), 0, "nothing").is_err());
        });
    }

    #[test]
    fn test_overflowing_totals_are_rejected_before_writing() {
        let fx = Fixture::new();
        fx.run(|s| {
            award_tokens(s, &alice(), Decimal::MAX, "jackpot").unwrap();
            assert!(matches!(
                award_tokens(s, &alice(), dec!(1), "one more"),
                Err(EngineError::Overflow { what: "token balance", .. })
            ));

            award_xp(s, &alice(), MAX_XP, "everything").unwrap();
            assert!(matches!(
                award_xp(s, &alice(), 1, "one more"),
                Err(EngineError::Overflow { what: "xp", .. })
            ));
            assert!(matches!(
                award_reward(s, &alice(), Reward::new(dec!(1), MAX_XP + 1), "too big"),
                Err(EngineError::InvalidAmount { what: "xp", .. })
            ));

            let stats = statistics(s, &alice()).unwrap();
            assert_eq!((stats.token_balance, stats.xp), (Decimal::MAX, MAX_XP));
            assert_eq!(history(s.conn, &alice(), 10).unwrap().len(), 2);
        });
    }

    #[test]
    fn test_xp_award_crosses_levels() {
        let fx = Fixture::new();
        fx.run(|s| {
            // 0 -> 300 XP crosses level 2 (100) and level 3 (250)
            let change = award_xp(s, &alice(), 300, "bonus").unwrap().unwrap();
            assert_eq!((change.old_level, change.new_level), (1, 3));

            let stats = statistics(s, &alice()).unwrap();
            assert_eq!(stats.level, 3);
            assert_eq!(stats.xp_to_next_level, 150);
            assert!(s.take_level_up());
        });
    }

    #[test]
    fn test_starting_balance_is_journaled() {
        let mut fx = Fixture::new();
        fx.config.ledger.starting_balance = dec!(50);
        fx.run(|s| {
            let stats = statistics(s, &alice()).unwrap();
            assert_eq!(stats.token_balance, dec!(50));
            let report = reconcile(s, &alice()).unwrap();
            assert!(!report.drifted());
        });
    }

    #[test]
    fn test_set_absolute_can_lower_level() {
        let fx = Fixture::new();
        fx.run(|s| {
            award_reward(s, &alice(), Reward::new(dec!(20), 500), "quest").unwrap();
            let change = set_absolute(s, &alice(), dec!(5), 50, "support ticket").unwrap().unwrap();
            assert!(change.new_level < change.old_level);

            let stats = statistics(s, &alice()).unwrap();
            assert_eq!((stats.token_balance, stats.xp, stats.level), (dec!(5), 50, 1));
            // Adjustment keeps the journal summing to the balance
            assert!(!reconcile(s, &alice()).unwrap().drifted());
        });
    }

    #[test]
    fn test_reconcile_repairs_drift() {
        let fx = Fixture::new();
        fx.run(|s| {
            award_tokens(s, &alice(), dec!(10), "gift").unwrap();
            s.conn
                .execute(
                    "UPDATE user_stats SET token_balance = '999' WHERE user_id = 'alice'",
                    [],
                )
                .unwrap();

            let report = reconcile(s, &alice()).unwrap();
            assert!(report.drifted());
            assert_eq!(report.previous_balance, dec!(999));
            assert_eq!(statistics(s, &alice()).unwrap().token_balance, dec!(10));
        });
    }

    #[test]
    fn test_stale_version_is_detected() {
        let fx = Fixture::new();
        fx.run(|s| {
            ensure_user(s, &alice()).unwrap();
            let mut row = load(s.conn, &alice()).unwrap();
            s.conn
                .execute("UPDATE user_stats SET version = version + 1", [])
                .unwrap();
            row.token_balance = dec!(1);
            let err = store(s, &alice(), &row).unwrap_err();
            assert!(err.is_retryable());
        });
    }
}
