//! Fee-skew pricing check.
//!
//! Prices opens with [`FeeSkewEngine`] and proposes the skewed price as the
//! new execution price. Rejects when the engine's hard limits trip or the
//! effective fee exceeds `max_total_fee_bps`.
//!
//! Internal errors (pool unavailable, pricing failure) fail open: the order
//! passes with its price unchanged and a `fail_open` metric is recorded.

use baskt_pricing::{FeeSkewConfig, FeeSkewEngine, OrderDetail};
use baskt_query::{BoxFuture, DynQueryClient};
use baskt_telemetry::Metrics;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, warn};

use crate::check::{RiskCheck, RiskCheckContext, RiskCheckResult, Severity, FEE_SKEW};
use crate::config::RiskCheckConfig;
use crate::error::RiskResult;

pub struct FeeSkewCheck {
    engine: FeeSkewEngine,
    max_total_fee_bps: Decimal,
    enabled: bool,
    query: DynQueryClient,
}

impl FeeSkewCheck {
    pub fn new(config: &RiskCheckConfig, fee_skew: FeeSkewConfig, query: DynQueryClient) -> Self {
        Self {
            max_total_fee_bps: fee_skew.max_total_fee_bps,
            engine: FeeSkewEngine::new(fee_skew),
            enabled: config.is_enabled(FEE_SKEW),
            query,
        }
    }

    fn fail_open(ctx: &RiskCheckContext, error: &dyn std::fmt::Display) -> RiskCheckResult {
        warn!(
            request_id = %ctx.request.request_id,
            error = %error,
            "fee-skew pricing failed, admitting at unadjusted price"
        );
        Metrics::fail_open(FEE_SKEW);
        RiskCheckResult::pass(FEE_SKEW).with_details(json!({
            "failOpen": error.to_string(),
        }))
    }
}

impl RiskCheck for FeeSkewCheck {
    fn name(&self) -> &'static str {
        FEE_SKEW
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn check<'a>(&'a self, ctx: &'a RiskCheckContext) -> BoxFuture<'a, RiskResult<RiskCheckResult>> {
        Box::pin(async move {
            let Some(open) = ctx.open() else {
                return Ok(RiskCheckResult::pass(FEE_SKEW));
            };

            let pool = match self.query.get_liquidity_pool().await {
                Ok(pool) => pool,
                Err(e) => return Ok(Self::fail_open(ctx, &e)),
            };

            let detail = OrderDetail {
                is_long: open.is_long,
                notional_value: open.notional_value,
                is_open: true,
            };
            let priced = match self.engine.calculate(ctx.execution_price, &detail, &pool) {
                Ok(priced) => priced,
                Err(e) => return Ok(Self::fail_open(ctx, &e)),
            };

            if let Some(reason) = &priced.rejection {
                return Ok(RiskCheckResult::fail(FEE_SKEW, Severity::High, reason.clone()));
            }

            if let Some(err) = &priced.error {
                warn!(request_id = %ctx.request.request_id, error = %err, "fee-skew price fell back to base");
            }

            Metrics::fee_skew_observed(
                open.is_long,
                priced.effective_fee_bps.to_f64().unwrap_or(0.0),
            );

            let details = json!({
                "basePrice": priced.base_price,
                "skewedPrice": priced.skewed_price,
                "fees": priced.fees,
                "effectiveFeeBps": priced.effective_fee_bps,
                "priceSkewBps": priced.price_skew_bps,
                "warnings": priced.warnings,
            });

            if priced.effective_fee_bps > self.max_total_fee_bps {
                return Ok(RiskCheckResult::fail(
                    FEE_SKEW,
                    Severity::High,
                    format!(
                        "effective fee {:.2} bps exceeds max {} bps",
                        priced.effective_fee_bps, self.max_total_fee_bps
                    ),
                )
                .with_details(details));
            }

            debug!(
                request_id = %ctx.request.request_id,
                base = %priced.base_price,
                skewed = %priced.skewed_price,
                fee_bps = %priced.effective_fee_bps,
                "fee-skew applied"
            );

            Ok(RiskCheckResult::pass(FEE_SKEW)
                .with_details(details)
                .with_adjusted_price(priced.skewed_price))
        })
    }
}
