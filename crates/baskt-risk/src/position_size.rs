//! Order sizing limits.
//!
//! Opens: positive notional within `max_position_size`, leverage in
//! `(0, max_leverage]` and positive collateral.
//! Closes: the target position exists, belongs to the caller, is open, and
//! is at least as large as the requested size. Partial closes are allowed.

use baskt_core::{CloseParams, OpenParams, Order, OrderParams, BPS_DENOMINATOR};
use baskt_query::{BoxFuture, DynQueryClient};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::trace;

use crate::check::{RiskCheck, RiskCheckContext, RiskCheckResult, Severity, POSITION_SIZE};
use crate::config::RiskCheckConfig;
use crate::error::RiskResult;

pub struct PositionSizeCheck {
    max_position_size: Decimal,
    max_leverage: Decimal,
    enabled: bool,
    query: DynQueryClient,
}

impl PositionSizeCheck {
    pub fn new(config: &RiskCheckConfig, query: DynQueryClient) -> Self {
        Self {
            max_position_size: config.max_position_size,
            max_leverage: config.max_leverage,
            enabled: config.is_enabled(POSITION_SIZE),
            query,
        }
    }

    fn check_open(&self, open: &OpenParams) -> RiskCheckResult {
        let notional = open.notional_value;
        if notional <= Decimal::ZERO {
            return RiskCheckResult::fail(
                POSITION_SIZE,
                Severity::High,
                format!("notional must be positive, got {notional}"),
            );
        }
        if notional > self.max_position_size {
            return RiskCheckResult::fail(
                POSITION_SIZE,
                Severity::High,
                format!(
                    "notional {} exceeds max position size {}",
                    notional, self.max_position_size
                ),
            );
        }

        let max_leverage_bps = self.max_leverage * BPS_DENOMINATOR;
        if open.leverage_bps == 0 || Decimal::from(open.leverage_bps) > max_leverage_bps {
            return RiskCheckResult::fail(
                POSITION_SIZE,
                Severity::High,
                format!(
                    "leverage {}x outside (0, {}x]",
                    open.leverage(),
                    self.max_leverage
                ),
            );
        }

        if open.collateral <= Decimal::ZERO {
            return RiskCheckResult::fail(
                POSITION_SIZE,
                Severity::High,
                format!("collateral must be positive, got {}", open.collateral),
            );
        }

        RiskCheckResult::pass(POSITION_SIZE).with_details(json!({
            "notional": notional,
            "leverage": open.leverage(),
        }))
    }

    async fn check_close(&self, order: &Order, close: &CloseParams) -> RiskCheckResult {
        let requested = close.size_as_contracts;
        if !requested.is_positive() {
            return RiskCheckResult::fail(
                POSITION_SIZE,
                Severity::High,
                format!("close size must be positive, got {requested}"),
            );
        }

        let position = match self.query.get_position(&close.target_position).await {
            Ok(Some(position)) => position,
            Ok(None) => {
                return RiskCheckResult::fail(
                    POSITION_SIZE,
                    Severity::High,
                    format!("position {} not found", close.target_position),
                )
            }
            Err(e) => return RiskCheckResult::unavailable(POSITION_SIZE, &e),
        };

        if position.owner != order.owner {
            return RiskCheckResult::fail(
                POSITION_SIZE,
                Severity::High,
                format!("position {} is not owned by {}", position.position_id, order.owner),
            );
        }
        if position.basket_id != order.basket_id {
            return RiskCheckResult::fail(
                POSITION_SIZE,
                Severity::High,
                format!(
                    "position {} belongs to basket {}, not {}",
                    position.position_id, position.basket_id, order.basket_id
                ),
            );
        }
        if !position.is_open() {
            return RiskCheckResult::fail(
                POSITION_SIZE,
                Severity::High,
                format!("position {} is {}", position.position_id, position.status),
            );
        }
        if requested > position.size {
            return RiskCheckResult::fail(
                POSITION_SIZE,
                Severity::High,
                format!(
                    "close size {} exceeds position size {}",
                    requested, position.size
                ),
            );
        }

        trace!(position_id = %position.position_id, %requested, "close size ok");
        RiskCheckResult::pass(POSITION_SIZE).with_details(json!({
            "positionSize": position.size,
            "closeSize": requested,
        }))
    }
}

impl RiskCheck for PositionSizeCheck {
    fn name(&self) -> &'static str {
        POSITION_SIZE
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn check<'a>(&'a self, ctx: &'a RiskCheckContext) -> BoxFuture<'a, RiskResult<RiskCheckResult>> {
        Box::pin(async move {
            let order = ctx.order();
            let result = match &order.params {
                OrderParams::Open(open) => self.check_open(open),
                OrderParams::Close(close) => self.check_close(order, close).await,
            };
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{close_order, context, open_context, open_order, position};
    use baskt_core::PositionStatus;
    use baskt_query::MemoryQueryClient;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn check_with(memory: Arc<MemoryQueryClient>) -> PositionSizeCheck {
        PositionSizeCheck::new(&RiskCheckConfig::default(), memory)
    }

    #[tokio::test]
    async fn test_open_within_limits() {
        let check = check_with(Arc::new(MemoryQueryClient::new()));
        let result = check.check(&open_context("alice", dec!(1000), true)).await.unwrap();
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_open_limits() {
        let check = check_with(Arc::new(MemoryQueryClient::new()));

        let too_big = check
            .check(&open_context("alice", dec!(1000001), true))
            .await
            .unwrap();
        assert!(!too_big.passed);
        assert_eq!(too_big.severity, Some(Severity::High));

        let mut order = open_order("alice", dec!(1000), true);
        if let OrderParams::Open(open) = &mut order.params {
            open.leverage_bps = 110_000;
        }
        let result = check.check(&context(order, dec!(100))).await.unwrap();
        assert!(result.reason.unwrap().contains("leverage"));

        let mut order = open_order("alice", dec!(1000), true);
        if let OrderParams::Open(open) = &mut order.params {
            open.collateral = dec!(0);
        }
        let result = check.check(&context(order, dec!(100))).await.unwrap();
        assert!(result.reason.unwrap().contains("collateral"));
    }

    #[tokio::test]
    async fn test_close_against_position() {
        let memory = Arc::new(MemoryQueryClient::new());
        memory.upsert_position(position("p1", "alice", dec!(5), dec!(100)));
        let check = check_with(memory.clone());

        let partial = check
            .check(&context(close_order("alice", "p1", dec!(2)), dec!(100)))
            .await
            .unwrap();
        assert!(partial.passed);

        let oversized = check
            .check(&context(close_order("alice", "p1", dec!(6)), dec!(100)))
            .await
            .unwrap();
        assert!(!oversized.passed);

        let foreign = check
            .check(&context(close_order("bob", "p1", dec!(1)), dec!(100)))
            .await
            .unwrap();
        assert!(foreign.reason.unwrap().contains("not owned"));

        let missing = check
            .check(&context(close_order("alice", "p9", dec!(1)), dec!(100)))
            .await
            .unwrap();
        assert!(missing.reason.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_open_without_positive_notional() {
        let check = check_with(Arc::new(MemoryQueryClient::new()));
        for notional in [dec!(0), dec!(-250)] {
            let result = check.check(&open_context("alice", notional, true)).await.unwrap();
            assert!(!result.passed);
            assert!(result.reason.unwrap().contains("notional must be positive"));
        }
    }

    #[tokio::test]
    async fn test_close_without_positive_size() {
        let memory = Arc::new(MemoryQueryClient::new());
        memory.upsert_position(position("p1", "alice", dec!(5), dec!(100)));
        let check = check_with(memory.clone());

        for size in [dec!(0), dec!(-1)] {
            let result = check
                .check(&context(close_order("alice", "p1", size), dec!(100)))
                .await
                .unwrap();
            assert!(!result.passed);
            assert!(result.reason.unwrap().contains("close size must be positive"));
        }
        assert!(memory.calls().is_empty(), "size is checked before the lookup");
    }

    #[tokio::test]
    async fn test_close_against_other_basket() {
        let memory = Arc::new(MemoryQueryClient::new());
        let mut elsewhere = position("p1", "alice", dec!(5), dec!(100));
        elsewhere.basket_id = "b2".to_string();
        memory.upsert_position(elsewhere);

        let result = check_with(memory)
            .check(&context(close_order("alice", "p1", dec!(1)), dec!(100)))
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.reason.unwrap(), "position p1 belongs to basket b2, not b1");
    }

    #[tokio::test]
    async fn test_close_of_closed_position() {
        let memory = Arc::new(MemoryQueryClient::new());
        let mut closed = position("p1", "alice", dec!(5), dec!(100));
        closed.status = PositionStatus::Liquidated;
        memory.upsert_position(closed);

        let result = check_with(memory)
            .check(&context(close_order("alice", "p1", dec!(1)), dec!(100)))
            .await
            .unwrap();
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn test_close_with_querier_down_fails_critical() {
        let memory = Arc::new(MemoryQueryClient::new());
        memory.set_unavailable(true);
        let result = check_with(memory)
            .check(&context(close_order("alice", "p1", dec!(1)), dec!(100)))
            .await
            .unwrap();
        assert_eq!(result.severity, Some(Severity::Critical));
    }
}
