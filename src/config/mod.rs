//! Configuration loading and management

mod io;
mod sections;

pub use sections::{
    CatalogSettings, DatabaseSettings, LedgerSettings, MaintenanceSettings, QuestSettings,
    StreakSettings,
};

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Token ledger and conflict handling
    #[serde(default)]
    pub ledger: LedgerSettings,

    /// Quest generation, caps and claiming
    #[serde(default)]
    pub quests: QuestSettings,

    #[serde(default)]
    pub streaks: StreakSettings,

    /// Optional reference data override
    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub maintenance: MaintenanceSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.quests.auto_claim);
        assert_eq!(config.ledger.max_conflict_retries, 3);
        assert_eq!(config.streaks.check_in_streak, "daily_check_in");
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [ledger]
            starting_balance = "25.5"

            [quests]
            auto_claim = false
            daily_cap = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.starting_balance, dec!(25.5));
        assert_eq!(config.ledger.busy_timeout_ms, 5000);
        assert!(!config.quests.auto_claim);
        assert_eq!(config.quests.daily_cap, 5);
        assert_eq!(config.quests.weekly_cap, 2);
        assert_eq!(config.maintenance.interval_secs, 300);
    }
}
