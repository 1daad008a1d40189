use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tokens plus XP granted together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reward {
    #[serde(default)]
    pub tokens: Decimal,
    #[serde(default)]
    pub xp: u64,
}

impl Reward {
    pub const ZERO: Reward = Reward {
        tokens: Decimal::ZERO,
        xp: 0,
    };

    pub fn new(tokens: Decimal, xp: u64) -> Self {
        Self { tokens, xp }
    }

    pub fn is_zero(&self) -> bool {
        self.tokens.is_zero() && self.xp == 0
    }
}

impl Add for Reward {
    type Output = Reward;

    /// Saturates; the ledger rejects a total it cannot store
    fn add(self, rhs: Reward) -> Reward {
        Reward {
            tokens: self.tokens.saturating_add(rhs.tokens),
            xp: self.xp.saturating_add(rhs.xp),
        }
    }
}

impl AddAssign for Reward {
    fn add_assign(&mut self, rhs: Reward) {
        *self = *self + rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reward_sum() {
        let mut total = Reward::ZERO;
        total += Reward::new(dec!(2), 5);
        total += Reward::new(dec!(10.5), 25);
        assert_eq!(total, Reward::new(dec!(12.5), 30));
        assert!(Reward::ZERO.is_zero());
        assert!(!total.is_zero());
    }

    #[test]
    fn test_reward_sum_saturates() {
        let total = Reward::new(Decimal::MAX, u64::MAX) + Reward::new(dec!(1), 1);
        assert_eq!(total, Reward::new(Decimal::MAX, u64::MAX));
    }
}
