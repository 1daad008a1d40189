//! Reported outcomes for conditions callers routinely check for.
//!
//! None of these are errors: a rejected deduction or a repeated claim leaves
//! state untouched and tells the caller why.

use rust_decimal::Decimal;
use serde::Serialize;

use super::Reward;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeductOutcome {
    Deducted { new_balance: Decimal },
    InsufficientBalance { balance: Decimal, requested: Decimal },
}

impl DeductOutcome {
    pub fn is_deducted(&self) -> bool {
        matches!(self, Self::Deducted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotEligibleReason {
    /// The user does not hold this quest
    NotAssigned,
    NotCompleted,
    AlreadyClaimed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ClaimOutcome {
    Claimed(Reward),
    NotEligible(NotEligibleReason),
}

impl ClaimOutcome {
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckInOutcome {
    CheckedIn {
        tokens_earned: Decimal,
        xp_earned: u64,
        streak: u32,
        milestone: bool,
    },
    AlreadyCheckedInToday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyStarted,
    /// The per-type cap of concurrently active quests is reached
    LimitReached,
    /// Quest is deactivated or past its end date
    Unavailable,
}

/// Result of applying a progress delta to one quest instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub quest_id: String,
    pub progress: u32,
    pub target_value: u32,
    pub completed: bool,
    /// Set when the completion was auto-claimed in the same step
    pub claimed: Option<Reward>,
}
