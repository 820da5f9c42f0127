//! Liquidity pool state and per-basket open interest.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Snapshot of the shared liquidity pool.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolState {
    pub total_liquidity: Decimal,
    pub long_notional: Decimal,
    pub short_notional: Decimal,
}

impl PoolState {
    pub fn new(total_liquidity: Decimal, long_notional: Decimal, short_notional: Decimal) -> Self {
        Self {
            total_liquidity,
            long_notional,
            short_notional,
        }
    }

    /// Total outstanding notional on both sides. `None` on overflow.
    pub fn exposure(&self) -> Option<Decimal> {
        self.long_notional.checked_add(self.short_notional)
    }

    /// Exposure / liquidity, clamped to [0, 1].
    ///
    /// A pool without liquidity, or whose exposure does not fit in a
    /// `Decimal`, is reported as fully utilized.
    pub fn utilization(&self) -> Decimal {
        if self.total_liquidity <= Decimal::ZERO {
            return Decimal::ONE;
        }
        self.exposure()
            .and_then(|exposure| exposure.checked_div(self.total_liquidity))
            .map_or(Decimal::ONE, |u| u.clamp(Decimal::ZERO, Decimal::ONE))
    }
}

/// Outstanding long/short notional of one basket.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInterest {
    pub long_open_interest: Decimal,
    pub short_open_interest: Decimal,
}

impl OpenInterest {
    pub fn total(&self) -> Decimal {
        self.long_open_interest + self.short_open_interest
    }

    /// Absolute long/short difference.
    pub fn imbalance(&self) -> Decimal {
        (self.long_open_interest - self.short_open_interest).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_utilization() {
        let pool = PoolState::new(dec!(1000), dec!(300), dec!(200));
        assert_eq!(pool.utilization(), dec!(0.5));
    }

    #[test]
    fn test_utilization_clamped() {
        let pool = PoolState::new(dec!(100), dec!(300), dec!(200));
        assert_eq!(pool.utilization(), Decimal::ONE);

        let empty = PoolState::new(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
        assert_eq!(empty.utilization(), Decimal::ONE);
    }

    #[test]
    fn test_overflowing_exposure_is_fully_utilized() {
        let pool = PoolState::new(Decimal::MAX, Decimal::MAX, dec!(1));
        assert_eq!(pool.exposure(), None);
        assert_eq!(pool.utilization(), Decimal::ONE);
    }

    #[test]
    fn test_open_interest_imbalance() {
        let oi = OpenInterest {
            long_open_interest: dec!(100),
            short_open_interest: dec!(250),
        };
        assert_eq!(oi.total(), dec!(350));
        assert_eq!(oi.imbalance(), dec!(150));
    }
}
