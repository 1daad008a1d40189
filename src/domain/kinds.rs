use serde::{Deserialize, Serialize};

/// Period a quest is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestType {
    Daily,
    Weekly,
    /// Event quests with a fixed multi-day window
    Special,
}

impl QuestType {
    pub const ALL: [QuestType; 3] = [Self::Daily, Self::Weekly, Self::Special];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Special => "special",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "special" => Some(Self::Special),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Achievement rarity tier (ordered from most to least common)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "common" => Some(Self::Common),
            "uncommon" => Some(Self::Uncommon),
            "rare" => Some(Self::Rare),
            "epic" => Some(Self::Epic),
            "legendary" => Some(Self::Legendary),
            _ => None,
        }
    }
}

/// Cadence a streak is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakUnit {
    /// Calendar days (UTC)
    Days,
    /// ISO weeks starting Monday
    Weeks,
    /// One step per qualifying item; never expires by time
    Items,
    /// One step per qualifying transaction; never expires by time
    Transactions,
}

impl StreakUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Items => "items",
            Self::Transactions => "transactions",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "days" => Some(Self::Days),
            "weeks" => Some(Self::Weeks),
            "items" => Some(Self::Items),
            "transactions" => Some(Self::Transactions),
            _ => None,
        }
    }

    /// Whether the streak breaks when a calendar period is skipped.
    pub fn is_calendar(&self) -> bool {
        matches!(self, Self::Days | Self::Weeks)
    }
}

/// A user's position in a quest's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestState {
    NotStarted,
    InProgress,
    /// Target reached, reward not yet granted
    Completed,
    /// Reward granted; terminal
    Claimed,
}

impl QuestState {
    pub fn derive(progress: u32, completed: bool, claimed: bool) -> Self {
        match (completed, claimed) {
            (_, true) => Self::Claimed,
            (true, false) => Self::Completed,
            (false, false) if progress > 0 => Self::InProgress,
            _ => Self::NotStarted,
        }
    }
}

/// Why a ledger journal entry was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    StartingBalance,
    Award,
    Deduction,
    /// Administrative absolute override
    Adjustment,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartingBalance => "starting_balance",
            Self::Award => "award",
            Self::Deduction => "deduction",
            Self::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "starting_balance" => Some(Self::StartingBalance),
            "award" => Some(Self::Award),
            "deduction" => Some(Self::Deduction),
            "adjustment" => Some(Self::Adjustment),
            _ => None,
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

display_as_str!(QuestType, Difficulty, Rarity, StreakUnit, EntryKind);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quest_state_derivation() {
        assert_eq!(QuestState::derive(0, false, false), QuestState::NotStarted);
        assert_eq!(QuestState::derive(2, false, false), QuestState::InProgress);
        assert_eq!(QuestState::derive(3, true, false), QuestState::Completed);
        assert_eq!(QuestState::derive(3, true, true), QuestState::Claimed);
    }

    #[test]
    fn test_string_forms_match_serde() {
        for rarity in Rarity::ALL {
            let json = serde_json::to_string(&rarity).unwrap();
            assert_eq!(json, format!("\"{}\"", rarity.as_str()));
            assert_eq!(Rarity::from_str(rarity.as_str()), Some(rarity));
        }
        assert_eq!(StreakUnit::from_str("fortnights"), None);
        assert!(StreakUnit::Weeks.is_calendar());
        assert!(!StreakUnit::Items.is_calendar());
    }
}
