//! User exposure cap and per-basket skew limit. Opens only.

use baskt_core::{OpenParams, Order, PositionFilter};
use baskt_query::{BoxFuture, DynQueryClient};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::debug;

use crate::check::{RiskCheck, RiskCheckContext, RiskCheckResult, Severity, EXPOSURE};
use crate::config::RiskCheckConfig;
use crate::error::RiskResult;

pub struct ExposureCheck {
    max_user_exposure: Decimal,
    max_skew_ratio: Decimal,
    bootstrap_threshold_ratio: Decimal,
    enabled: bool,
    query: DynQueryClient,
}

impl ExposureCheck {
    pub fn new(config: &RiskCheckConfig, query: DynQueryClient) -> Self {
        Self {
            max_user_exposure: config.max_user_exposure,
            max_skew_ratio: config.max_skew_ratio,
            bootstrap_threshold_ratio: config.bootstrap_threshold_ratio,
            enabled: config.is_enabled(EXPOSURE),
            query,
        }
    }

    async fn evaluate(&self, order: &Order, open: &OpenParams) -> RiskCheckResult {
        let notional = open.notional_value;

        // User cap: existing open notional plus this order.
        let filter = PositionFilter::active_for_user(order.owner.clone());
        let positions = match self.query.get_positions(&filter).await {
            Ok(positions) => positions,
            Err(e) => return RiskCheckResult::unavailable(EXPOSURE, &e),
        };
        let existing: Decimal = positions.iter().map(|p| p.notional()).sum();
        let user_total = existing + notional;
        if user_total > self.max_user_exposure {
            return RiskCheckResult::fail(
                EXPOSURE,
                Severity::High,
                format!(
                    "user exposure {} exceeds max {}",
                    user_total, self.max_user_exposure
                ),
            );
        }

        // Basket skew after this order.
        let oi = match self.query.get_open_interest(&order.basket_id).await {
            Ok(oi) => oi,
            Err(e) => return RiskCheckResult::unavailable(EXPOSURE, &e),
        };
        let pool = match self.query.get_liquidity_pool().await {
            Ok(pool) => pool,
            Err(e) => return RiskCheckResult::unavailable(EXPOSURE, &e),
        };

        let (long, short) = if open.is_long {
            (oi.long_open_interest + notional, oi.short_open_interest)
        } else {
            (oi.long_open_interest, oi.short_open_interest + notional)
        };
        let total = long + short;
        let imbalance = (long - short).abs();
        let skew = if total > Decimal::ZERO {
            imbalance / total
        } else {
            Decimal::ZERO
        };

        let details = json!({
            "userExposure": user_total,
            "projectedSkew": skew,
        });

        if skew <= self.max_skew_ratio {
            return RiskCheckResult::pass(EXPOSURE).with_details(details);
        }

        let bootstrap_limit = self.bootstrap_threshold_ratio * pool.total_liquidity;
        if total < bootstrap_limit {
            debug!(basket_id = %order.basket_id, %total, %bootstrap_limit, "skew limit waived during bootstrap");
            return RiskCheckResult::pass(EXPOSURE).with_details(details);
        }
        if imbalance < oi.imbalance() {
            debug!(basket_id = %order.basket_id, %skew, "order reduces basket imbalance");
            return RiskCheckResult::pass(EXPOSURE).with_details(details);
        }

        RiskCheckResult::fail(
            EXPOSURE,
            Severity::Medium,
            format!(
                "basket skew {:.4} exceeds max {}",
                skew, self.max_skew_ratio
            ),
        )
        .with_details(details)
    }
}

impl RiskCheck for ExposureCheck {
    fn name(&self) -> &'static str {
        EXPOSURE
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn check<'a>(&'a self, ctx: &'a RiskCheckContext) -> BoxFuture<'a, RiskResult<RiskCheckResult>> {
        Box::pin(async move {
            Ok(match ctx.open() {
                Some(open) => self.evaluate(ctx.order(), open).await,
                None => RiskCheckResult::pass(EXPOSURE),
            })
        })
    }
}
