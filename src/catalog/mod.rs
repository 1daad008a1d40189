//! Reference data: level table, streak types, quest templates and achievements
//!
//! Shared, read-mostly definitions. A built-in catalog ships with the crate;
//! a TOML file can replace it wholesale. Either way the catalog is validated
//! once at startup and a broken one refuses to start the engine.

mod builtin;
mod store;

pub use builtin::BUILTIN;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Difficulty, QuestType, Rarity, Reward, StreakUnit};
use crate::error::{EngineError, Result};
use crate::gamification::achievements::CounterRegistry;
use crate::gamification::ledger::MAX_XP;

/// One row of the level table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub level_number: u32,
    pub xp_required: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakTypeDef {
    pub key: String,
    pub name: String,
    pub unit: StreakUnit,
    /// Action types that advance this streak
    #[serde(default)]
    pub trigger_actions: Vec<String>,
    pub milestone_interval: u32,
    #[serde(default)]
    pub base_reward: Reward,
    #[serde(default)]
    pub milestone_reward: Reward,
}

/// Structured (action, category) association carried by quests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerDef {
    pub action_type: String,
    /// When set, only events tagged with this category count
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestTemplate {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub quest_type: QuestType,
    pub difficulty: Difficulty,
    pub category: String,
    pub target_value: u32,
    pub reward: Reward,
    pub triggers: Vec<TriggerDef>,
}

/// Parameters handed to a progress counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDef {
    pub key: String,
    pub name: String,
    pub description: String,
    /// Grouping for display
    pub category: String,
    /// Registry key of the counter computing progress
    pub criteria_type: String,
    pub criteria_value: u32,
    pub rarity: Rarity,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub params: CriteriaParams,
    #[serde(default)]
    pub reward: Reward,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "level")]
    pub levels: Vec<LevelDef>,
    #[serde(default, rename = "streak_type")]
    pub streak_types: Vec<StreakTypeDef>,
    #[serde(default, rename = "quest_template")]
    pub quest_templates: Vec<QuestTemplate>,
    #[serde(default, rename = "achievement")]
    pub achievements: Vec<AchievementDef>,
}

impl Catalog {
    /// The catalog compiled into the crate
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Load a catalog from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Catalog(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| EngineError::Catalog(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Check the catalog is complete and self-consistent.
    ///
    /// Every failure is fatal: the engine must not run on partial reference data.
    pub fn validate(&self, check_in_streak: &str, counters: &CounterRegistry) -> Result<()> {
        let missing = |msg: String| -> Result<()> { Err(EngineError::MissingReferenceData(msg)) };

        let Some(first) = self.levels.first() else {
            return missing("level table is empty".into());
        };
        if first.xp_required != 0 {
            return missing(format!(
                "level {} must start at 0 XP, found {}",
                first.level_number, first.xp_required
            ));
        }
        for pair in self.levels.windows(2) {
            if pair[1].level_number <= pair[0].level_number {
                return missing(format!(
                    "level numbers must be unique and ascending (level {} after {})",
                    pair[1].level_number, pair[0].level_number
                ));
            }
            if pair[1].xp_required <= pair[0].xp_required {
                return missing(format!(
                    "xp_required must strictly increase (level {})",
                    pair[1].level_number
                ));
            }
        }

        if let Some(last) = self.levels.last() {
            if last.xp_required > MAX_XP {
                return missing(format!(
                    "level {} needs {} XP, above the storable maximum",
                    last.level_number, last.xp_required
                ));
            }
        }

        if self.streak_type(check_in_streak).is_none() {
            return missing(format!("check-in streak type '{}' is not defined", check_in_streak));
        }
        let mut seen = HashSet::new();
        for streak in &self.streak_types {
            if !seen.insert(streak.key.as_str()) {
                return missing(format!("duplicate streak type '{}'", streak.key));
            }
            if streak.milestone_interval == 0 {
                return missing(format!("streak type '{}' has milestone_interval 0", streak.key));
            }
        }

        for quest_type in QuestType::ALL {
            if self.templates_for(quest_type).next().is_none() {
                return missing(format!("no {} quest templates", quest_type));
            }
        }
        let mut seen = HashSet::new();
        for template in &self.quest_templates {
            if !seen.insert(template.key.as_str()) {
                return missing(format!("duplicate quest template '{}'", template.key));
            }
            if template.target_value == 0 {
                return missing(format!("quest template '{}' has target_value 0", template.key));
            }
            if template.triggers.is_empty() {
                return missing(format!("quest template '{}' has no triggers", template.key));
            }
        }

        let mut seen = HashSet::new();
        for achievement in &self.achievements {
            if !seen.insert(achievement.key.as_str()) {
                return missing(format!("duplicate achievement '{}'", achievement.key));
            }
            let Some(counter) = counters.get(&achievement.criteria_type) else {
                return missing(format!(
                    "achievement '{}' uses unregistered criteria type '{}'",
                    achievement.key, achievement.criteria_type
                ));
            };
            if let Err(reason) = counter.validate(&achievement.params) {
                return missing(format!("achievement '{}': {}", achievement.key, reason));
            }
            if achievement.criteria_value == 0 {
                return missing(format!("achievement '{}' has criteria_value 0", achievement.key));
            }
            if let Some(streak) = &achievement.params.streak_type {
                if self.streak_type(streak).is_none() {
                    return missing(format!(
                        "achievement '{}' refers to unknown streak type '{}'",
                        achievement.key, streak
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn level(&self, level_number: u32) -> Option<&LevelDef> {
        self.levels.iter().find(|l| l.level_number == level_number)
    }

    pub fn streak_type(&self, key: &str) -> Option<&StreakTypeDef> {
        self.streak_types.iter().find(|s| s.key == key)
    }

    /// Streak types advanced by an action
    pub fn streak_types_for_action<'a>(
        &'a self,
        action_type: &'a str,
    ) -> impl Iterator<Item = &'a StreakTypeDef> + 'a {
        self.streak_types
            .iter()
            .filter(move |s| s.trigger_actions.iter().any(|a| a == action_type))
    }

    pub fn templates_for(&self, quest_type: QuestType) -> impl Iterator<Item = &QuestTemplate> {
        self.quest_templates
            .iter()
            .filter(move |t| t.quest_type == quest_type)
    }

    pub fn achievement(&self, key: &str) -> Option<&AchievementDef> {
        self.achievements.iter().find(|a| a.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters() -> CounterRegistry {
        CounterRegistry::builtin()
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        catalog.validate("daily_check_in", &counters()).unwrap();
        assert_eq!(catalog.levels.len(), 20);
    }

    #[test]
    fn test_missing_check_in_streak_is_fatal() {
        let catalog = Catalog::builtin();
        let err = catalog.validate("hourly_check_in", &counters()).unwrap_err();
        assert!(matches!(err, EngineError::MissingReferenceData(_)));
    }

    #[test]
    fn test_empty_level_table_is_fatal() {
        let mut catalog = Catalog::builtin();
        catalog.levels.clear();
        let err = catalog.validate("daily_check_in", &counters()).unwrap_err();
        assert!(err.to_string().contains("level table is empty"));
    }

    #[test]
    fn test_non_increasing_levels_are_fatal() {
        let mut catalog = Catalog::builtin();
        catalog.levels[3].xp_required = catalog.levels[2].xp_required;
        assert!(catalog.validate("daily_check_in", &counters()).is_err());
    }

    #[test]
    fn test_unstorable_level_threshold_is_fatal() {
        let mut catalog = Catalog::builtin();
        catalog.levels.last_mut().unwrap().xp_required = u64::MAX;
        let err = catalog.validate("daily_check_in", &counters()).unwrap_err();
        assert!(err.to_string().contains("storable maximum"));
    }

    #[test]
    fn test_unregistered_criteria_is_fatal() {
        let mut catalog = Catalog::builtin();
        catalog.achievements[0].criteria_type = "vibes".into();
        let err = catalog.validate("daily_check_in", &counters()).unwrap_err();
        assert!(err.to_string().contains("vibes"));
    }

    #[test]
    fn test_missing_quest_type_is_fatal() {
        let mut catalog = Catalog::builtin();
        catalog
            .quest_templates
            .retain(|t| t.quest_type != QuestType::Special);
        let err = catalog.validate("daily_check_in", &counters()).unwrap_err();
        assert!(err.to_string().contains("special"));
    }

    #[test]
    fn test_toml_override_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        let builtin = Catalog::builtin();
        std::fs::write(&path, toml::to_string_pretty(&builtin).unwrap()).unwrap();

        let loaded = Catalog::from_file(&path).unwrap();
        assert_eq!(loaded, builtin);
    }

    #[test]
    fn test_streak_types_for_action() {
        let catalog = Catalog::builtin();
        let keys: Vec<&str> = catalog
            .streak_types_for_action("item_listed")
            .map(|s| s.key.as_str())
            .collect();
        assert_eq!(keys, vec!["weekly_seller", "listing_run"]);
    }
}
