//! Fee-skew execution pricing.
//!
//! Converts a base price (basket NAV or limit price) into an execution price
//! that embeds the protocol fee for an opening order. The fee has three parts:
//!
//! 1. Impact: `notional^2 / impact_scalar` (quadratic market-depth cost)
//! 2. Utilization: `notional * borrow_rate(pool utilization)`, where the
//!    borrow rate is piecewise linear through
//!    `(0, min) -> (target_utilization, target) -> (1, max)`
//! 3. Imbalance: reward or penalty for the change in the pool's
//!    `|long - short| / (long + short)` ratio caused by the order
//!
//! The fee is applied as a price multiplier `total_fee / notional`: longs pay
//! `price * (1 + m)`, shorts receive `price * (1 - m)`. Close orders are never
//! skewed.

use baskt_core::{PoolState, Price, BPS_DENOMINATOR};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::FeeSkewConfig;
use crate::error::{PricingError, PricingResult};

/// The part of an order the pricing model needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderDetail {
    pub is_long: bool,
    pub notional_value: Decimal,
    pub is_open: bool,
}

/// Fee components in collateral units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub impact_fee: Decimal,
    pub utilization_fee: Decimal,
    /// Negative when the order improves pool balance.
    pub imbalance_fee: Decimal,
    /// Sum of the components, floored at zero.
    pub total_fee: Decimal,
}

/// Output of the pricing engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSkewResult {
    pub base_price: Price,
    pub skewed_price: Price,
    pub fees: FeeBreakdown,
    pub effective_fee_bps: Decimal,
    pub price_skew_bps: Decimal,
    pub borrow_rate: Decimal,
    /// Pool utilization before the order; drives `borrow_rate`.
    pub utilization: Decimal,
    /// Utilization including the order; advisory.
    pub projected_utilization: Decimal,
    /// Advisory only; never a reason to reject.
    pub warnings: Vec<String>,
    /// Order-level hard limit that was hit.
    pub rejection: Option<String>,
    /// Set when the skewed price fell back to the base price.
    pub error: Option<String>,
}

impl FeeSkewResult {
    /// Result that leaves the price untouched and charges nothing.
    pub fn unchanged(base_price: Price) -> Self {
        Self {
            base_price,
            skewed_price: base_price,
            fees: FeeBreakdown::default(),
            effective_fee_bps: Decimal::ZERO,
            price_skew_bps: Decimal::ZERO,
            borrow_rate: Decimal::ZERO,
            utilization: Decimal::ZERO,
            projected_utilization: Decimal::ZERO,
            warnings: Vec::new(),
            rejection: None,
            error: None,
        }
    }

    fn rejected(base_price: Price, reason: String) -> Self {
        Self {
            rejection: Some(reason),
            ..Self::unchanged(base_price)
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }
}

/// `|long - short| / (long + short)`, or zero for an empty book.
pub fn imbalance_ratio(long: Decimal, short: Decimal) -> PricingResult<Decimal> {
    let total = long
        .checked_add(short)
        .ok_or(PricingError::Overflow("imbalance ratio"))?;
    if total <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    long.checked_sub(short)
        .and_then(|diff| diff.abs().checked_div(total))
        .ok_or(PricingError::Overflow("imbalance ratio"))
}

/// Dual-slope borrow rate at `utilization` (clamped to [0, 1]).
pub fn borrow_rate(config: &FeeSkewConfig, utilization: Decimal) -> Decimal {
    let u = utilization.clamp(Decimal::ZERO, Decimal::ONE);
    let target_u = config.target_utilization;

    if u <= target_u {
        if target_u.is_zero() {
            return config.target_borrow_rate;
        }
        config.min_borrow_rate + (config.target_borrow_rate - config.min_borrow_rate) * u / target_u
    } else {
        let span = Decimal::ONE - target_u;
        if span.is_zero() {
            return config.max_borrow_rate;
        }
        config.target_borrow_rate
            + (config.max_borrow_rate - config.target_borrow_rate) * (u - target_u) / span
    }
}

/// Fee-skew pricing engine.
#[derive(Debug, Clone)]
pub struct FeeSkewEngine {
    config: FeeSkewConfig,
}

impl FeeSkewEngine {
    pub fn new(config: FeeSkewConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeeSkewConfig {
        &self.config
    }

    /// Price an order against the current pool.
    ///
    /// Hard-limit violations are reported through `rejection`, not `Err`.
    /// `Err` means the inputs could not be priced at all, including any
    /// arithmetic overflow on pool figures.
    ///
    /// Above `max_imbalance_ratio` the imbalance penalty is tiered so the fee
    /// stays continuous in notional. The total fee is floored at zero, so an
    /// open whose discount outweighs its other fees executes at the base price.
    pub fn calculate(
        &self,
        base_price: Price,
        order: &OrderDetail,
        pool: &PoolState,
    ) -> PricingResult<FeeSkewResult> {
        if !base_price.is_positive() {
            return Err(PricingError::InvalidBasePrice(base_price.to_string()));
        }

        if !order.is_open {
            return Ok(FeeSkewResult::unchanged(base_price));
        }

        let notional = order.notional_value;
        if notional <= Decimal::ZERO {
            return Err(PricingError::InvalidNotional(notional.to_string()));
        }

        if let Some(reason) = self.check_limits(notional, pool)? {
            debug!(%notional, %reason, "fee-skew hard limit hit");
            return Ok(FeeSkewResult::rejected(base_price, reason));
        }

        let mut warnings = Vec::new();

        let utilization = pool.utilization();
        let projected_utilization = pool
            .exposure()
            .and_then(|exposure| exposure.checked_add(notional))
            .and_then(|exposure| exposure.checked_div(pool.total_liquidity))
            .ok_or(PricingError::Overflow("projected utilization"))?
            .clamp(Decimal::ZERO, Decimal::ONE);
        if projected_utilization > self.config.target_utilization {
            warnings.push(format!(
                "projected utilization {:.4} above target {}",
                projected_utilization, self.config.target_utilization
            ));
        }

        let rate = borrow_rate(&self.config, utilization);
        let impact_fee = self.impact_fee(notional)?;
        let utilization_fee = notional
            .checked_mul(rate)
            .ok_or(PricingError::Overflow("utilization fee"))?;
        let imbalance_fee = self.imbalance_fee(order, pool)?;

        let (long_after, short_after) = projected_sides(order, pool)?;
        if imbalance_ratio(long_after, short_after)? > self.config.max_imbalance_ratio {
            warnings.push(format!(
                "projected imbalance above max {}",
                self.config.max_imbalance_ratio
            ));
        }

        let total_fee = impact_fee
            .checked_add(utilization_fee)
            .and_then(|f| f.checked_add(imbalance_fee))
            .ok_or(PricingError::Overflow("total fee"))?
            .max(Decimal::ZERO);

        let multiplier = total_fee
            .checked_div(notional)
            .ok_or(PricingError::Overflow("fee multiplier"))?;

        let factor = if order.is_long {
            Decimal::ONE.checked_add(multiplier)
        } else {
            Decimal::ONE.checked_sub(multiplier)
        };
        let candidate = factor
            .and_then(|f| base_price.inner().checked_mul(f))
            .ok_or(PricingError::Overflow("skewed price"))?;

        let (skewed_price, error) = if candidate > Decimal::ZERO {
            (Price::new(candidate), None)
        } else {
            warn!(
                base_price = %base_price,
                multiplier = %multiplier,
                "skewed price not positive, falling back to base price"
            );
            (
                base_price,
                Some(format!(
                    "skewed price {candidate} not positive, using base price"
                )),
            )
        };

        let effective_fee_bps = multiplier
            .checked_mul(BPS_DENOMINATOR)
            .ok_or(PricingError::Overflow("effective fee bps"))?;
        let price_skew_bps = skewed_price.bps_from(base_price).unwrap_or(Decimal::ZERO);

        Ok(FeeSkewResult {
            base_price,
            skewed_price,
            fees: FeeBreakdown {
                impact_fee,
                utilization_fee,
                imbalance_fee,
                total_fee,
            },
            effective_fee_bps,
            price_skew_bps,
            borrow_rate: rate,
            utilization,
            projected_utilization,
            warnings,
            rejection: None,
            error,
        })
    }

    /// Order-level hard limits, independent of price.
    fn check_limits(&self, notional: Decimal, pool: &PoolState) -> PricingResult<Option<String>> {
        if notional > self.config.max_position_size {
            return Ok(Some(format!(
                "notional {} exceeds max position size {}",
                notional, self.config.max_position_size
            )));
        }
        if pool.total_liquidity <= Decimal::ZERO {
            return Ok(Some("pool has no liquidity".to_string()));
        }
        let pool_impact = notional
            .checked_div(pool.total_liquidity)
            .ok_or(PricingError::Overflow("pool impact"))?;
        if pool_impact > self.config.max_pool_impact {
            return Ok(Some(format!(
                "pool impact {:.4} exceeds max {}",
                pool_impact, self.config.max_pool_impact
            )));
        }
        Ok(None)
    }

    /// Quadratic impact fee.
    pub fn impact_fee(&self, notional: Decimal) -> PricingResult<Decimal> {
        notional
            .checked_mul(notional)
            .and_then(|sq| sq.checked_div(self.config.impact_scalar))
            .ok_or(PricingError::Overflow("impact fee"))
    }

    /// Imbalance reward (negative) or penalty (positive).
    ///
    /// Above `max_imbalance_ratio` the penalty slope doubles; the part of the
    /// increase below the maximum keeps the proportional slope so the fee is
    /// continuous in notional.
    pub fn imbalance_fee(&self, order: &OrderDetail, pool: &PoolState) -> PricingResult<Decimal> {
        let notional = order.notional_value;
        let rate = self.config.imbalance_penalty_rate;
        let max_ratio = self.config.max_imbalance_ratio;

        let before = imbalance_ratio(pool.long_notional, pool.short_notional)?;
        let (long_after, short_after) = projected_sides(order, pool)?;
        let after = imbalance_ratio(long_after, short_after)?;

        let per_unit = if after < before {
            -((before - after) * rate)
        } else if after > max_ratio {
            let below_max = (max_ratio - before).max(Decimal::ZERO);
            let excess = after - max_ratio;
            below_max * rate + excess * rate * Decimal::TWO
        } else {
            (after - before) * rate
        };

        per_unit
            .checked_mul(notional)
            .ok_or(PricingError::Overflow("imbalance fee"))
    }
}

fn projected_sides(order: &OrderDetail, pool: &PoolState) -> PricingResult<(Decimal, Decimal)> {
    let grow = |side: Decimal| {
        side.checked_add(order.notional_value)
            .ok_or(PricingError::Overflow("projected open interest"))
    };
    if order.is_long {
        Ok((grow(pool.long_notional)?, pool.short_notional))
    } else {
        Ok((pool.long_notional, grow(pool.short_notional)?))
    }
}
