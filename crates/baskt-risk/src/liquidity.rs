//! Pool liquidity check.
//!
//! Required liquidity is the order's notional: the open notional, or for a
//! close `size * execution price` (limit closes use the limit price plus the
//! slippage allowance). The order passes iff
//! `required * (1 + buffer) <= pool liquidity`.

use baskt_core::{Order, OrderKind, OrderParams, Price};
use baskt_query::{BoxFuture, DynQueryClient};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::warn;

use crate::check::{RiskCheck, RiskCheckContext, RiskCheckResult, Severity, LIQUIDITY};
use crate::config::RiskCheckConfig;
use crate::error::RiskResult;

pub struct LiquidityCheck {
    buffer_ratio: Decimal,
    max_utilization: Decimal,
    enabled: bool,
    query: DynQueryClient,
}

impl LiquidityCheck {
    pub fn new(config: &RiskCheckConfig, query: DynQueryClient) -> Self {
        Self {
            buffer_ratio: config.liquidity_buffer_ratio,
            max_utilization: config.max_utilization,
            enabled: config.is_enabled(LIQUIDITY),
            query,
        }
    }
}

/// Notional the pool must be able to cover for `order`.
pub fn required_liquidity(order: &Order, execution_price: Price) -> Decimal {
    match &order.params {
        OrderParams::Open(open) => open.notional_value,
        OrderParams::Close(close) => match (&order.kind, &order.limit) {
            (OrderKind::Limit, Some(limit)) => {
                let base = close.size_as_contracts.notional(limit.limit_price);
                base + base * limit.slippage_fraction()
            }
            _ => close.size_as_contracts.notional(execution_price),
        },
    }
}

impl RiskCheck for LiquidityCheck {
    fn name(&self) -> &'static str {
        LIQUIDITY
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn check<'a>(&'a self, ctx: &'a RiskCheckContext) -> BoxFuture<'a, RiskResult<RiskCheckResult>> {
        Box::pin(async move {
            let pool = match self.query.get_liquidity_pool().await {
                Ok(pool) => pool,
                Err(e) => return Ok(RiskCheckResult::unavailable(LIQUIDITY, &e)),
            };

            let required = required_liquidity(ctx.order(), ctx.execution_price);
            let available = pool.total_liquidity;
            let Some(with_buffer) = required.checked_mul(Decimal::ONE + self.buffer_ratio) else {
                return Ok(RiskCheckResult::fail(
                    LIQUIDITY,
                    Severity::High,
                    format!("insufficient liquidity: need more than {required}, pool has {available}"),
                ));
            };

            if with_buffer > available {
                return Ok(RiskCheckResult::fail(
                    LIQUIDITY,
                    Severity::High,
                    format!(
                        "insufficient liquidity: need {with_buffer} (incl. buffer), pool has {available}"
                    ),
                ));
            }

            let mut details = json!({
                "required": required,
                "requiredWithBuffer": with_buffer,
                "available": available,
            });

            if ctx.order().is_open() && available > Decimal::ZERO {
                // Saturates when the pool figures overflow.
                let projected = pool
                    .exposure()
                    .and_then(|exposure| exposure.checked_add(required))
                    .and_then(|exposure| exposure.checked_div(available))
                    .unwrap_or(Decimal::MAX);
                if projected > self.max_utilization {
                    warn!(
                        request_id = %ctx.request.request_id,
                        projected_utilization = %projected,
                        max_utilization = %self.max_utilization,
                        "open pushes pool utilization above limit"
                    );
                    details["warning"] = json!(format!(
                        "projected utilization {projected:.4} above {}",
                        self.max_utilization
                    ));
                }
            }

            Ok(RiskCheckResult::pass(LIQUIDITY).with_details(details))
        })
    }
}
