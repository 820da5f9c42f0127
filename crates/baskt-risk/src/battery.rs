//! Risk check battery.
//!
//! Runs every enabled check concurrently against one shared context and
//! returns their results in registration order. A check that errors or
//! panics produces a failed critical result instead of aborting the order.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use baskt_pricing::FeeSkewConfig;
use baskt_query::DynQueryClient;
use baskt_telemetry::Metrics;
use futures_util::future::join_all;
use futures_util::FutureExt;
use tracing::{debug, error, warn};

use crate::check::{RiskCheck, RiskCheckContext, RiskCheckResult, Severity};
use crate::config::RiskCheckConfig;
use crate::exposure::ExposureCheck;
use crate::fee_skew::FeeSkewCheck;
use crate::liquidity::LiquidityCheck;
use crate::position_size::PositionSizeCheck;
use crate::user_limit::UserLimitCheck;

pub struct RiskCheckBattery {
    checks: Vec<Arc<dyn RiskCheck>>,
}

impl RiskCheckBattery {
    /// Battery over an explicit, ordered list of checks.
    pub fn new(checks: Vec<Arc<dyn RiskCheck>>) -> Self {
        Self { checks }
    }

    /// The production battery:
    /// position_size, liquidity, exposure, user_limit, fee_skew.
    pub fn standard(
        config: &RiskCheckConfig,
        fee_skew: FeeSkewConfig,
        query: DynQueryClient,
    ) -> Self {
        Self::new(vec![
            Arc::new(PositionSizeCheck::new(config, Arc::clone(&query))),
            Arc::new(LiquidityCheck::new(config, Arc::clone(&query))),
            Arc::new(ExposureCheck::new(config, Arc::clone(&query))),
            Arc::new(UserLimitCheck::new(config, Arc::clone(&query))),
            Arc::new(FeeSkewCheck::new(config, fee_skew, query)),
        ])
    }

    /// Names of the enabled checks, in registration order.
    pub fn enabled_checks(&self) -> Vec<&'static str> {
        self.checks
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| c.name())
            .collect()
    }

    /// Evaluate all enabled checks concurrently and wait for every one.
    pub async fn run(&self, ctx: &RiskCheckContext) -> Vec<RiskCheckResult> {
        let pending = self
            .checks
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| run_guarded(c.as_ref(), ctx));
        let results = join_all(pending).await;

        debug!(
            request_id = %ctx.request.request_id,
            checks = results.len(),
            failed = results.iter().filter(|r| !r.passed).count(),
            "risk checks complete"
        );
        results
    }
}

async fn run_guarded(check: &dyn RiskCheck, ctx: &RiskCheckContext) -> RiskCheckResult {
    let name = check.name();
    let start = Instant::now();

    let outcome = AssertUnwindSafe(async move { check.check(ctx).await })
        .catch_unwind()
        .await;

    Metrics::check_latency(name, start.elapsed().as_secs_f64() * 1000.0);

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(check = name, request_id = %ctx.request.request_id, error = %e, "risk check errored");
            Metrics::check_error(name);
            RiskCheckResult::fail(name, Severity::Critical, format!("internal error: {e}"))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(check = name, request_id = %ctx.request.request_id, panic = %message, "risk check panicked");
            Metrics::check_panic(name);
            RiskCheckResult::fail(name, Severity::Critical, format!("check panicked: {message}"))
        }
    }
}

/// Text of a caught panic payload, for logs and rejection reasons.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RiskError, RiskResult};
    use crate::testutil::open_context;
    use baskt_query::{BoxFuture, QueryError};
    use rust_decimal_macros::dec;

    enum Behavior {
        Pass,
        Fail,
        Error,
        Panic,
    }

    struct StubCheck {
        name: &'static str,
        enabled: bool,
        behavior: Behavior,
    }

    impl StubCheck {
        fn arc(name: &'static str, behavior: Behavior) -> Arc<dyn RiskCheck> {
            Arc::new(Self {
                name,
                enabled: true,
                behavior,
            })
        }
    }

    impl RiskCheck for StubCheck {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn check<'a>(
            &'a self,
            _ctx: &'a RiskCheckContext,
        ) -> BoxFuture<'a, RiskResult<RiskCheckResult>> {
            Box::pin(async move {
                match self.behavior {
                    Behavior::Pass => Ok(RiskCheckResult::pass(self.name)),
                    Behavior::Fail => Ok(RiskCheckResult::fail(self.name, Severity::Low, "nope")),
                    Behavior::Error => Err(RiskError::Query(QueryError::Unavailable(
                        "down".to_string(),
                    ))),
                    Behavior::Panic => panic!("boom"),
                }
            })
        }
    }

    #[tokio::test]
    async fn test_results_in_registration_order() {
        let battery = RiskCheckBattery::new(vec![
            StubCheck::arc("a", Behavior::Pass),
            StubCheck::arc("b", Behavior::Fail),
            StubCheck::arc("c", Behavior::Pass),
        ]);
        let results = battery.run(&open_context("alice", dec!(100), true)).await;
        let names: Vec<_> = results.iter().map(|r| r.check_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(!results[1].passed);
    }

    #[tokio::test]
    async fn test_error_and_panic_fail_closed() {
        let battery = RiskCheckBattery::new(vec![
            StubCheck::arc("err", Behavior::Error),
            StubCheck::arc("panic", Behavior::Panic),
            StubCheck::arc("ok", Behavior::Pass),
        ]);
        let results = battery.run(&open_context("alice", dec!(100), true)).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].severity, Some(Severity::Critical));
        assert!(results[0].reason.as_deref().unwrap().contains("down"));
        assert_eq!(results[1].severity, Some(Severity::Critical));
        assert!(results[1].reason.as_deref().unwrap().contains("boom"));
        assert!(results[2].passed);
    }

    #[tokio::test]
    async fn test_disabled_checks_skipped() {
        let battery = RiskCheckBattery::new(vec![
            StubCheck::arc("a", Behavior::Pass),
            Arc::new(StubCheck {
                name: "off",
                enabled: false,
                behavior: Behavior::Fail,
            }),
        ]);
        assert_eq!(battery.enabled_checks(), vec!["a"]);
        let results = battery.run(&open_context("alice", dec!(100), true)).await;
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_standard_registration_order() {
        let query: DynQueryClient = Arc::new(baskt_query::MemoryQueryClient::new());
        let battery =
            RiskCheckBattery::standard(&RiskCheckConfig::default(), FeeSkewConfig::default(), query);
        assert_eq!(
            battery.enabled_checks(),
            vec!["position_size", "liquidity", "exposure", "user_limit", "fee_skew"]
        );
    }

    #[test]
    fn test_panic_message_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("boom");
        let formatted: Box<dyn Any + Send> = Box::new(format!("bad pool {}", 7));
        let opaque: Box<dyn Any + Send> = Box::new(42_u32);

        assert_eq!(panic_message(literal.as_ref()), "boom");
        assert_eq!(panic_message(formatted.as_ref()), "bad pool 7");
        assert_eq!(panic_message(opaque.as_ref()), "unknown panic");
    }
}
