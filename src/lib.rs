//! Questline - gamification engine for marketplace communities
//!
//! Questline turns what users do (listing items, posting, trading, checking
//! in) into tokens, XP, levels, streaks, quests and achievements.
//!
//! ## Components
//!
//! - **Ledger**: the only writer of token balance and XP, with a journal of
//!   every change so balances can be audited and reconciled.
//! - **Levels**: derived from XP through the catalog's level table.
//! - **Streaks**: daily/weekly cadence counters and progress-based runs.
//! - **Quests**: generated per period, assigned under caps, advanced by
//!   structured `(action, category)` triggers.
//! - **Achievements**: one-time unlocks computed by pluggable progress counters.
//!
//! Everything is reached through [`Engine`], which runs each operation in a
//! single SQLite transaction and retries on write conflicts.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod gamification;
pub mod maintenance;
pub mod period;

pub use catalog::Catalog;
pub use clock::Clock;
pub use config::Config;
pub use domain::*;
pub use engine::Engine;
pub use error::{EngineError, Result};
