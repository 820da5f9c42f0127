//! Per-user open position count.

use baskt_core::PositionFilter;
use baskt_query::{BoxFuture, DynQueryClient};
use serde_json::json;

use crate::check::{RiskCheck, RiskCheckContext, RiskCheckResult, Severity, USER_LIMIT};
use crate::config::RiskCheckConfig;
use crate::error::RiskResult;

pub struct UserLimitCheck {
    max_positions_per_user: u32,
    enabled: bool,
    query: DynQueryClient,
}

impl UserLimitCheck {
    pub fn new(config: &RiskCheckConfig, query: DynQueryClient) -> Self {
        Self {
            max_positions_per_user: config.max_positions_per_user,
            enabled: config.is_enabled(USER_LIMIT),
            query,
        }
    }
}

impl RiskCheck for UserLimitCheck {
    fn name(&self) -> &'static str {
        USER_LIMIT
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn check<'a>(&'a self, ctx: &'a RiskCheckContext) -> BoxFuture<'a, RiskResult<RiskCheckResult>> {
        Box::pin(async move {
            if !ctx.order().is_open() {
                return Ok(RiskCheckResult::pass(USER_LIMIT));
            }

            let filter = PositionFilter::active_for_user(ctx.order().owner.clone());
            let open_positions = match self.query.get_positions(&filter).await {
                Ok(positions) => positions.len(),
                Err(e) => return Ok(RiskCheckResult::unavailable(USER_LIMIT, &e)),
            };

            if open_positions >= self.max_positions_per_user as usize {
                return Ok(RiskCheckResult::fail(
                    USER_LIMIT,
                    Severity::Medium,
                    format!(
                        "user already has {} open positions (max {})",
                        open_positions, self.max_positions_per_user
                    ),
                ));
            }

            Ok(RiskCheckResult::pass(USER_LIMIT).with_details(json!({
                "openPositions": open_positions,
            })))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{close_order, context, open_context, position};
    use baskt_query::MemoryQueryClient;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn check(max: u32, memory: Arc<MemoryQueryClient>) -> UserLimitCheck {
        let config = RiskCheckConfig {
            max_positions_per_user: max,
            ..Default::default()
        };
        UserLimitCheck::new(&config, memory)
    }

    #[tokio::test]
    async fn test_limit_reached() {
        let memory = Arc::new(MemoryQueryClient::new());
        memory.upsert_position(position("p1", "alice", dec!(1), dec!(10)));
        memory.upsert_position(position("p2", "alice", dec!(1), dec!(10)));
        memory.upsert_position(position("p3", "bob", dec!(1), dec!(10)));

        let at_two = check(2, memory.clone());
        let result = at_two.check(&open_context("alice", dec!(10), true)).await.unwrap();
        assert!(!result.passed);
        assert_eq!(result.severity, Some(Severity::Medium));

        let bob = at_two.check(&open_context("bob", dec!(10), true)).await.unwrap();
        assert!(bob.passed);

        let close = at_two
            .check(&context(close_order("alice", "p1", dec!(1)), dec!(10)))
            .await
            .unwrap();
        assert!(close.passed);
    }

    #[tokio::test]
    async fn test_querier_down_fails_critical() {
        let memory = Arc::new(MemoryQueryClient::new());
        memory.set_unavailable(true);
        let result = check(5, memory)
            .check(&open_context("alice", dec!(10), true))
            .await
            .unwrap();
        assert_eq!(result.severity, Some(Severity::Critical));
    }
}
