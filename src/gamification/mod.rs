//! Reward-and-progression components
//!
//! Every component works on a [`Session`]: the open transaction plus the
//! shared reference data. Components never commit; the engine commits or
//! rolls back the whole session, so an operation applies fully or not at all.
//!
//! All balance and XP changes funnel through [`ledger`].

pub mod achievements;
pub mod activity;
pub mod ledger;
pub mod levels;
pub mod quests;
pub mod streaks;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::domain::GamificationEvent;
use achievements::CounterRegistry;

/// Context of one engine operation
pub struct Session<'a> {
    pub conn: &'a Connection,
    pub catalog: &'a Catalog,
    pub counters: &'a CounterRegistry,
    pub config: &'a Config,
    pub now: DateTime<Utc>,
    events: Vec<GamificationEvent>,
    level_up_pending: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        conn: &'a Connection,
        catalog: &'a Catalog,
        counters: &'a CounterRegistry,
        config: &'a Config,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            conn,
            catalog,
            counters,
            config,
            now,
            events: Vec::new(),
            level_up_pending: false,
        }
    }

    pub fn emit(&mut self, event: GamificationEvent) {
        self.events.push(event);
    }

    pub fn into_events(self) -> Vec<GamificationEvent> {
        self.events
    }

    pub(crate) fn mark_level_up(&mut self) {
        self.level_up_pending = true;
    }

    /// Consume the pending level-up flag
    pub(crate) fn take_level_up(&mut self) -> bool {
        std::mem::take(&mut self.level_up_pending)
    }
}
