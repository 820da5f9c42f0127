//! Risk check limits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::check::CHECK_NAMES;
use crate::error::{RiskError, RiskResult};

/// Limits shared by the risk checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCheckConfig {
    /// Maximum leverage as a multiplier (10 = 10x).
    #[serde(default = "default_max_leverage")]
    pub max_leverage: Decimal,
    /// Cap on a user's total open notional including the new order.
    #[serde(default = "default_max_user_exposure")]
    pub max_user_exposure: Decimal,
    /// Projected pool utilization above which opens are flagged (advisory).
    #[serde(default = "default_max_utilization")]
    pub max_utilization: Decimal,
    /// Maximum per-basket |L - S| / (L + S) after the order.
    #[serde(default = "default_max_skew_ratio")]
    pub max_skew_ratio: Decimal,
    #[serde(default = "default_max_positions_per_user")]
    pub max_positions_per_user: u32,
    /// Baskets whose open interest is below this fraction of pool liquidity
    /// are exempt from the skew limit.
    #[serde(default = "default_bootstrap_threshold_ratio")]
    pub bootstrap_threshold_ratio: Decimal,
    /// Extra liquidity required on top of the order's notional.
    #[serde(default = "default_liquidity_buffer_ratio")]
    pub liquidity_buffer_ratio: Decimal,
    /// Notional limit of a single open.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,
    /// Checks that are registered but skipped.
    #[serde(default)]
    pub disabled_checks: Vec<String>,
}

fn default_max_leverage() -> Decimal {
    Decimal::from(10)
}

fn default_max_user_exposure() -> Decimal {
    Decimal::from(5_000_000u64)
}

fn default_max_utilization() -> Decimal {
    Decimal::new(9, 1) // 0.9
}

fn default_max_skew_ratio() -> Decimal {
    Decimal::new(7, 1) // 0.7
}

fn default_max_positions_per_user() -> u32 {
    50
}

fn default_bootstrap_threshold_ratio() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_liquidity_buffer_ratio() -> Decimal {
    Decimal::new(1, 1) // 0.1
}

fn default_max_position_size() -> Decimal {
    Decimal::from(1_000_000u64)
}

impl Default for RiskCheckConfig {
    fn default() -> Self {
        Self {
            max_leverage: default_max_leverage(),
            max_user_exposure: default_max_user_exposure(),
            max_utilization: default_max_utilization(),
            max_skew_ratio: default_max_skew_ratio(),
            max_positions_per_user: default_max_positions_per_user(),
            bootstrap_threshold_ratio: default_bootstrap_threshold_ratio(),
            liquidity_buffer_ratio: default_liquidity_buffer_ratio(),
            max_position_size: default_max_position_size(),
            disabled_checks: Vec::new(),
        }
    }
}

impl RiskCheckConfig {
    pub fn is_enabled(&self, check: &str) -> bool {
        !self.disabled_checks.iter().any(|c| c == check)
    }

    pub fn validate(&self) -> RiskResult<()> {
        let positive = [
            ("max_leverage", self.max_leverage),
            ("max_user_exposure", self.max_user_exposure),
            ("max_utilization", self.max_utilization),
            ("max_position_size", self.max_position_size),
        ];
        for (name, value) in positive {
            if value <= Decimal::ZERO {
                return Err(RiskError::ConfigError(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let ratios = [
            ("max_skew_ratio", self.max_skew_ratio),
            ("bootstrap_threshold_ratio", self.bootstrap_threshold_ratio),
        ];
        for (name, value) in ratios {
            if value.is_sign_negative() || value > Decimal::ONE {
                return Err(RiskError::ConfigError(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }

        if self.liquidity_buffer_ratio.is_sign_negative() {
            return Err(RiskError::ConfigError(
                "liquidity_buffer_ratio must not be negative".to_string(),
            ));
        }
        if self.max_positions_per_user == 0 {
            return Err(RiskError::ConfigError(
                "max_positions_per_user must be at least 1".to_string(),
            ));
        }
        if let Some(unknown) = self
            .disabled_checks
            .iter()
            .find(|c| !CHECK_NAMES.contains(&c.as_str()))
        {
            return Err(RiskError::ConfigError(format!(
                "unknown check in disabled_checks: {unknown}"
            )));
        }
        Ok(())
    }
}
