//! Fee-skew configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, PricingResult};

/// Tunables of the fee-skew pricing model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSkewConfig {
    /// Divisor of the quadratic impact fee: notional^2 / impact_scalar.
    #[serde(default = "default_impact_scalar")]
    pub impact_scalar: Decimal,

    /// Borrow rate at 0% utilization.
    #[serde(default = "default_min_borrow_rate")]
    pub min_borrow_rate: Decimal,
    /// Borrow rate at `target_utilization`.
    #[serde(default = "default_target_borrow_rate")]
    pub target_borrow_rate: Decimal,
    /// Borrow rate at 100% utilization.
    #[serde(default = "default_max_borrow_rate")]
    pub max_borrow_rate: Decimal,
    /// Kink of the dual-slope borrow curve, in (0, 1).
    #[serde(default = "default_target_utilization")]
    pub target_utilization: Decimal,

    /// Imbalance ratio above which the penalty slope doubles.
    #[serde(default = "default_max_imbalance_ratio")]
    pub max_imbalance_ratio: Decimal,
    /// Fee per unit of imbalance-ratio change, per unit notional.
    #[serde(default = "default_imbalance_penalty_rate")]
    pub imbalance_penalty_rate: Decimal,

    /// Hard limit on the notional of a single open.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,
    /// Hard limit on notional / pool liquidity.
    #[serde(default = "default_max_pool_impact")]
    pub max_pool_impact: Decimal,
    /// Ceiling on the effective fee, enforced by the fee-skew risk check.
    #[serde(default = "default_max_total_fee_bps")]
    pub max_total_fee_bps: Decimal,
}

fn default_impact_scalar() -> Decimal {
    Decimal::from(1_000_000_000u64)
}

fn default_min_borrow_rate() -> Decimal {
    Decimal::new(1, 4) // 0.0001 = 1 bp
}

fn default_target_borrow_rate() -> Decimal {
    Decimal::new(1, 3) // 0.001 = 10 bps
}

fn default_max_borrow_rate() -> Decimal {
    Decimal::new(1, 2) // 0.01 = 100 bps
}

fn default_target_utilization() -> Decimal {
    Decimal::new(8, 1) // 0.8
}

fn default_max_imbalance_ratio() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_imbalance_penalty_rate() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn default_max_position_size() -> Decimal {
    Decimal::from(1_000_000u64)
}

fn default_max_pool_impact() -> Decimal {
    Decimal::new(1, 1) // 0.1 = 10% of pool
}

fn default_max_total_fee_bps() -> Decimal {
    Decimal::from(200)
}

impl Default for FeeSkewConfig {
    fn default() -> Self {
        Self {
            impact_scalar: default_impact_scalar(),
            min_borrow_rate: default_min_borrow_rate(),
            target_borrow_rate: default_target_borrow_rate(),
            max_borrow_rate: default_max_borrow_rate(),
            target_utilization: default_target_utilization(),
            max_imbalance_ratio: default_max_imbalance_ratio(),
            imbalance_penalty_rate: default_imbalance_penalty_rate(),
            max_position_size: default_max_position_size(),
            max_pool_impact: default_max_pool_impact(),
            max_total_fee_bps: default_max_total_fee_bps(),
        }
    }
}

impl FeeSkewConfig {
    /// Reject configurations the engine cannot price with.
    pub fn validate(&self) -> PricingResult<()> {
        if self.impact_scalar <= Decimal::ZERO {
            return Err(PricingError::InvalidConfig(format!(
                "impact_scalar must be positive, got {}",
                self.impact_scalar
            )));
        }
        if self.min_borrow_rate.is_sign_negative()
            || self.min_borrow_rate > self.target_borrow_rate
            || self.target_borrow_rate > self.max_borrow_rate
        {
            return Err(PricingError::InvalidConfig(format!(
                "borrow curve must satisfy 0 <= min <= target <= max, got {} / {} / {}",
                self.min_borrow_rate, self.target_borrow_rate, self.max_borrow_rate
            )));
        }
        if self.target_utilization <= Decimal::ZERO || self.target_utilization >= Decimal::ONE {
            return Err(PricingError::InvalidConfig(format!(
                "target_utilization must be in (0, 1), got {}",
                self.target_utilization
            )));
        }
        if self.max_imbalance_ratio.is_sign_negative() || self.max_imbalance_ratio > Decimal::ONE {
            return Err(PricingError::InvalidConfig(format!(
                "max_imbalance_ratio must be in [0, 1], got {}",
                self.max_imbalance_ratio
            )));
        }
        if self.imbalance_penalty_rate.is_sign_negative() {
            return Err(PricingError::InvalidConfig(
                "imbalance_penalty_rate must not be negative".to_string(),
            ));
        }
        if self.max_position_size <= Decimal::ZERO
            || self.max_pool_impact <= Decimal::ZERO
            || self.max_total_fee_bps <= Decimal::ZERO
        {
            return Err(PricingError::InvalidConfig(
                "size, pool-impact and fee limits must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FeeSkewConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_borrow_curve_rejected() {
        let config = FeeSkewConfig {
            min_borrow_rate: dec!(0.01),
            target_borrow_rate: dec!(0.001),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PricingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: FeeSkewConfig = toml::from_str("impact_scalar = \"5000000\"").unwrap();
        assert_eq!(config.impact_scalar, dec!(5000000));
        assert_eq!(config.max_total_fee_bps, dec!(200));
    }
}
