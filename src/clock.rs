//! Time source shared by the engine.
//!
//! Production code reads the system clock; tests freeze it and step it
//! forward to cross day and week boundaries.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Default)]
pub struct Clock {
    frozen: Option<Arc<Mutex<DateTime<Utc>>>>,
}

impl Clock {
    pub fn system() -> Self {
        Self { frozen: None }
    }

    /// A clock that stays at `at` until advanced.
    pub fn frozen(at: DateTime<Utc>) -> Self {
        Self {
            frozen: Some(Arc::new(Mutex::new(at))),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        match &self.frozen {
            Some(at) => *at.lock().expect("clock lock poisoned"),
            None => Utc::now(),
        }
    }

    /// Move a frozen clock forward. No-op on the system clock.
    pub fn advance(&self, by: Duration) {
        if let Some(at) = &self.frozen {
            let mut guard = at.lock().expect("clock lock poisoned");
            *guard += by;
        }
    }

    /// Pin a frozen clock to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        if let Some(at) = &self.frozen {
            *at.lock().expect("clock lock poisoned") = to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_frozen_clock_advances_and_is_shared_between_clones() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = Clock::frozen(start);
        let other = clock.clone();

        clock.advance(Duration::days(1));
        assert_eq!(other.now(), start + Duration::days(1));
    }
}
