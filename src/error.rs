//! Error taxonomy for the engine boundary.
//!
//! Idempotency checks (double claim, double check-in, already started) and
//! insufficient funds are not errors: they come back as outcome enums from
//! [`crate::domain`]. Everything here means "no state change occurred".

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Award or deduction amount was not positive, or XP above the storable range
    #[error("Invalid {what} amount: {amount}")]
    InvalidAmount { what: &'static str, amount: Decimal },

    /// Applying the change would push a balance or XP total out of range
    #[error("{what} overflow for user '{user_id}'")]
    Overflow { what: &'static str, user_id: String },

    /// Reference data absent or inconsistent; fatal at startup
    #[error("Missing reference data: {0}")]
    MissingReferenceData(String),

    /// Concurrent writers kept colliding after the retry budget was spent
    #[error("Persistence conflict: gave up after {attempts} attempts")]
    PersistenceConflict { attempts: u32 },

    /// Internal marker raised by an optimistic-lock miss; retried by the engine
    #[error("Stale write for user '{user_id}'")]
    StaleWrite { user_id: String },

    #[error("Unknown quest: {0}")]
    UnknownQuest(String),

    #[error("Unknown achievement: {0}")]
    UnknownAchievement(String),

    #[error("Unknown streak type: {0}")]
    UnknownStreakType(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether the whole transaction may be replayed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StaleWrite { .. } => true,
            Self::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_write_and_busy_are_retryable() {
        assert!(EngineError::StaleWrite { user_id: "u1".into() }.is_retryable());

        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(EngineError::Database(busy).is_retryable());
    }

    #[test]
    fn test_domain_errors_are_not_retryable() {
        assert!(!EngineError::UnknownQuest("q".into()).is_retryable());
        assert!(!EngineError::PersistenceConflict { attempts: 3 }.is_retryable());
        assert!(!EngineError::Database(rusqlite::Error::QueryReturnedNoRows).is_retryable());
    }
}
