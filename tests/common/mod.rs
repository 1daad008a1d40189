//! Shared test utilities for engine integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use questline::catalog::{LevelDef, QuestTemplate, StreakTypeDef, TriggerDef};
use questline::db::Db;
use questline::gamification::achievements::CounterRegistry;
use questline::{actions, Catalog, Clock, Config, Difficulty, Engine, QuestType, Reward, StreakUnit};

/// Monday 2024-03-04 09:00 UTC
pub fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

pub fn reward(tokens: i64, xp: u64) -> Reward {
    Reward::new(Decimal::from(tokens), xp)
}

/// Engine on a temporary database file, with a frozen clock
pub struct TestEngine {
    pub engine: Engine,
    pub dir: TempDir,
}

impl TestEngine {
    pub fn clock(&self) -> &Clock {
        self.engine.clock()
    }
}

impl std::ops::Deref for TestEngine {
    type Target = Engine;

    fn deref(&self) -> &Engine {
        &self.engine
    }
}

/// Config pointing at a database inside `dir`
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.database.path = Some(dir.path().join("questline.db"));
    config.quests.daily_count = 1;
    config.quests.weekly_count = 1;
    config.quests.special_count = 1;
    config
}

pub fn build(catalog: Catalog, configure: impl FnOnce(&mut Config)) -> TestEngine {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = test_config(&dir);
    configure(&mut config);

    let db = Db::open(&config.database_path(), std::time::Duration::from_millis(500))
        .expect("Failed to open database");
    let engine = Engine::with_parts(
        db,
        catalog,
        CounterRegistry::builtin(),
        config,
        Clock::frozen(monday()),
    )
    .expect("Failed to build engine");
    TestEngine { engine, dir }
}

/// Engine with the small test catalog and default settings
pub fn engine() -> TestEngine {
    build(test_catalog(), |_| {})
}

fn template(
    key: &str,
    quest_type: QuestType,
    action: &str,
    target: u32,
    reward: Reward,
) -> QuestTemplate {
    QuestTemplate {
        key: key.into(),
        title: key.replace('_', " "),
        description: String::new(),
        quest_type,
        difficulty: Difficulty::Easy,
        category: "selling".into(),
        target_value: target,
        reward,
        triggers: vec![TriggerDef {
            action_type: action.into(),
            category: None,
        }],
    }
}

/// Minimal catalog with round numbers and no achievements, so balances in
/// scenarios come out exact
pub fn test_catalog() -> Catalog {
    Catalog {
        levels: [(1, 0), (2, 100), (3, 250), (4, 450), (5, 700)]
            .into_iter()
            .map(|(n, xp)| LevelDef {
                level_number: n,
                xp_required: xp,
                title: format!("Level {n}"),
            })
            .collect(),
        streak_types: vec![StreakTypeDef {
            key: "daily_check_in".into(),
            name: "Daily Check-in".into(),
            unit: StreakUnit::Days,
            trigger_actions: vec![actions::CHECK_IN.into()],
            milestone_interval: 7,
            base_reward: reward(2, 5),
            milestone_reward: reward(10, 25),
        }],
        quest_templates: vec![
            template("list_three", QuestType::Daily, actions::ITEM_LISTED, 3, reward(10, 50)),
            template("sell_two", QuestType::Weekly, actions::ITEM_SOLD, 2, reward(30, 120)),
            template("post_five", QuestType::Special, actions::POST_CREATED, 5, reward(50, 200)),
        ],
        achievements: Vec::new(),
    }
}
