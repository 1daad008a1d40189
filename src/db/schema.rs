//! Versioned schema migrations

use rusqlite::Connection;

use crate::error::Result;

pub(super) const LATEST_VERSION: i64 = 2;

/// Apply every migration newer than the stored schema version
pub(super) fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    // Migration 1: reference data, per-user aggregates, journal
    if version < 1 {
        conn.execute_batch(INITIAL_SCHEMA)?;
        conn.execute("INSERT OR REPLACE INTO schema_version VALUES (1)", [])?;
    }

    // Migration 2: indexes for the hot quest and achievement lookups
    if version < 2 {
        conn.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS idx_user_quests_open ON user_quests(user_id, is_completed);
            CREATE INDEX IF NOT EXISTS idx_activity_category ON activity_log(user_id, action_type, category);
            CREATE INDEX IF NOT EXISTS idx_user_streaks_last ON user_streaks(streak_type, last_activity);
            "#,
        )?;
        conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
    }

    Ok(())
}

const INITIAL_SCHEMA: &str = r#"
-- ============================================
-- REFERENCE DATA (seeded from the catalog)
-- ============================================

CREATE TABLE IF NOT EXISTS levels (
    level_number INTEGER PRIMARY KEY,
    xp_required INTEGER NOT NULL,
    title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS streak_types (
    key TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    unit TEXT NOT NULL,
    milestone_interval INTEGER NOT NULL CHECK (milestone_interval > 0),
    definition TEXT NOT NULL            -- full definition as JSON
);

CREATE TABLE IF NOT EXISTS quest_templates (
    key TEXT PRIMARY KEY,
    quest_type TEXT NOT NULL,
    category TEXT NOT NULL,
    definition TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS achievements (
    key TEXT PRIMARY KEY,
    criteria_type TEXT NOT NULL,
    criteria_value INTEGER NOT NULL,
    rarity TEXT NOT NULL,
    is_secret INTEGER NOT NULL DEFAULT 0,
    definition TEXT NOT NULL
);

-- ============================================
-- PER-USER STATE
-- ============================================

-- Ledger aggregate; version is bumped on every write (optimistic lock)
CREATE TABLE IF NOT EXISTS user_stats (
    user_id TEXT PRIMARY KEY,
    token_balance TEXT NOT NULL DEFAULT '0',
    current_xp INTEGER NOT NULL DEFAULT 0 CHECK (current_xp >= 0),
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    version INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    CHECK (longest_streak >= current_streak)
);

CREATE TABLE IF NOT EXISTS user_levels (
    user_id TEXT PRIMARY KEY REFERENCES user_stats(user_id),
    level_number INTEGER NOT NULL,
    current_xp INTEGER NOT NULL DEFAULT 0,
    total_xp INTEGER NOT NULL DEFAULT 0,
    xp_to_next INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
);

-- Journal: one row per balance/XP change
CREATE TABLE IF NOT EXISTS ledger_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES user_stats(user_id),
    kind TEXT NOT NULL,
    token_delta TEXT NOT NULL,
    xp_delta INTEGER NOT NULL,
    reason TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_ledger_user ON ledger_entries(user_id, id);

-- Emitted activity (source for achievement counters)
CREATE TABLE IF NOT EXISTS activity_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    action_type TEXT NOT NULL,
    value INTEGER NOT NULL,
    category TEXT,
    payload TEXT,
    created_at INTEGER NOT NULL,
    day_bucket TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activity_user_action ON activity_log(user_id, action_type);

-- Generated quest instances
CREATE TABLE IF NOT EXISTS quests (
    id TEXT PRIMARY KEY,
    template_key TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    quest_type TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    category TEXT NOT NULL,
    target_value INTEGER NOT NULL CHECK (target_value > 0),
    token_reward TEXT NOT NULL,
    xp_reward INTEGER NOT NULL,
    start_date INTEGER NOT NULL,
    end_date INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_quests_active ON quests(quest_type, is_active);

CREATE TABLE IF NOT EXISTS quest_triggers (
    quest_id TEXT NOT NULL REFERENCES quests(id),
    action_type TEXT NOT NULL,
    category TEXT
);
CREATE INDEX IF NOT EXISTS idx_quest_triggers_action ON quest_triggers(action_type, quest_id);

CREATE TABLE IF NOT EXISTS user_quests (
    user_id TEXT NOT NULL,
    quest_id TEXT NOT NULL REFERENCES quests(id),
    current_progress INTEGER NOT NULL DEFAULT 0,
    is_completed INTEGER NOT NULL DEFAULT 0,
    completed_at INTEGER,
    date_claimed INTEGER,
    assigned_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, quest_id)
);

CREATE TABLE IF NOT EXISTS user_achievements (
    user_id TEXT NOT NULL,
    achievement_key TEXT NOT NULL REFERENCES achievements(key),
    progress INTEGER NOT NULL DEFAULT 0,
    is_unlocked INTEGER NOT NULL DEFAULT 0,
    earned_at INTEGER,
    PRIMARY KEY (user_id, achievement_key)
);

CREATE TABLE IF NOT EXISTS user_streaks (
    user_id TEXT NOT NULL,
    streak_type TEXT NOT NULL REFERENCES streak_types(key),
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_activity INTEGER,
    last_activity_day TEXT,
    total_milestones_reached INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, streak_type),
    CHECK (longest_streak >= current_streak)
);
"#;
