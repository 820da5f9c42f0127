//! Order admission coordinator.
//!
//! For each request:
//! 1. validate the order shape
//! 2. determine the execution price (limit price, else basket NAV)
//! 3. run the risk check battery
//! 4. reject on the first failing check in registration order, or accept at
//!    the price left by the checks' adjustments
//!
//! Every consumed request gets exactly one decision. Panics and errors in
//! the pipeline become a critical `system` rejection. The request is
//! acknowledged only after its decision is published.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use baskt_core::{OrderRequest, Price};
use baskt_query::DynQueryClient;
use baskt_risk::{panic_message, RiskCheckBattery, RiskCheckContext, Severity};
use baskt_telemetry::Metrics;
use futures_util::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::AdmissionResult;
use crate::stream::{Envelope, OrderAccepted, OrderRejected, OrderStream};

pub const CHECK_ORDER_VALIDATION: &str = "order_validation";
pub const CHECK_PRICE_FETCH: &str = "price_fetch";
pub const CHECK_SYSTEM: &str = "system";

const PRICE_FETCH_FAILURE: &str = "price-fetch failure";

/// Terminal decision for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Accepted(OrderAccepted),
    Rejected(OrderRejected),
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn as_rejected(&self) -> Option<&OrderRejected> {
        match self {
            Self::Rejected(r) => Some(r),
            Self::Accepted(_) => None,
        }
    }

    pub fn as_accepted(&self) -> Option<&OrderAccepted> {
        match self {
            Self::Accepted(a) => Some(a),
            Self::Rejected(_) => None,
        }
    }

    fn reject(
        request: &OrderRequest,
        check_name: &str,
        severity: Severity,
        reason: impl Into<String>,
    ) -> Self {
        Self::Rejected(OrderRejected {
            request: request.clone(),
            reason: reason.into(),
            check_name: check_name.to_string(),
            severity,
        })
    }
}

pub struct Coordinator {
    query: DynQueryClient,
    battery: RiskCheckBattery,
    stream: Arc<dyn OrderStream>,
}

impl Coordinator {
    pub fn new(query: DynQueryClient, battery: RiskCheckBattery, stream: Arc<dyn OrderStream>) -> Self {
        Self {
            query,
            battery,
            stream,
        }
    }

    /// Decide a request without publishing anything. Never fails.
    pub async fn evaluate(&self, request: &OrderRequest) -> Decision {
        match AssertUnwindSafe(self.decide(request)).catch_unwind().await {
            Ok(decision) => decision,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(request_id = %request.request_id, panic = %message, "admission pipeline panicked");
                Decision::reject(
                    request,
                    CHECK_SYSTEM,
                    Severity::Critical,
                    format!("internal error: {message}"),
                )
            }
        }
    }

    async fn decide(&self, request: &OrderRequest) -> Decision {
        let order = &request.order;

        if let Err(e) = order.validate() {
            debug!(request_id = %request.request_id, error = %e, "invalid order");
            return Decision::reject(request, CHECK_ORDER_VALIDATION, Severity::High, e.to_string());
        }

        let execution_price = match self.fetch_price(request).await {
            Some(price) => price,
            None => {
                Metrics::price_fetch_failed();
                return Decision::reject(
                    request,
                    CHECK_PRICE_FETCH,
                    Severity::Critical,
                    PRICE_FETCH_FAILURE,
                );
            }
        };

        let ctx = RiskCheckContext::new(request.clone(), execution_price);
        let results = self.battery.run(&ctx).await;

        if let Some(failed) = results.iter().find(|r| !r.passed) {
            return Decision::reject(
                request,
                &failed.check_name,
                failed.severity.unwrap_or(Severity::High),
                failed
                    .reason
                    .clone()
                    .unwrap_or_else(|| format!("{} check failed", failed.check_name)),
            );
        }

        // Adjustments apply in registration order; later checks see none of them.
        let mut final_price = execution_price;
        for adjusted in results.iter().filter_map(|r| r.adjusted_price) {
            final_price = adjusted;
        }

        Decision::Accepted(OrderAccepted {
            request: request.clone(),
            execution_price: final_price,
        })
    }

    /// Explicit limit price, else the basket NAV. `None` if neither is usable.
    async fn fetch_price(&self, request: &OrderRequest) -> Option<Price> {
        if let Some(limit) = request.order.limit_price() {
            return Some(limit);
        }

        match self.query.get_basket_nav(&request.order.basket_id).await {
            Ok(nav) if nav.nav.is_positive() => Some(nav.nav),
            Ok(nav) => {
                warn!(
                    request_id = %request.request_id,
                    basket_id = %request.order.basket_id,
                    nav = %nav.nav,
                    "basket NAV not positive"
                );
                None
            }
            Err(e) => {
                warn!(
                    request_id = %request.request_id,
                    basket_id = %request.order.basket_id,
                    error = %e,
                    "failed to fetch basket NAV"
                );
                None
            }
        }
    }

    /// Evaluate one delivered request, publish its decision, then ack it.
    pub async fn process(&self, envelope: Envelope<OrderRequest>) -> AdmissionResult<Decision> {
        let start = Instant::now();
        let request = &envelope.payload;
        let decision = self.evaluate(request).await;

        match &decision {
            Decision::Accepted(accepted) => {
                self.stream.publish_accepted(accepted.clone()).await?;
                Metrics::order_accepted();
                info!(
                    request_id = %request.request_id,
                    owner = %request.order.owner,
                    basket_id = %request.order.basket_id,
                    action = %request.order.action,
                    execution_price = %accepted.execution_price,
                    "order accepted"
                );
            }
            Decision::Rejected(rejected) => {
                self.stream.publish_rejected(rejected.clone()).await?;
                Metrics::order_rejected(&rejected.check_name, rejected.severity.as_str());
                info!(
                    request_id = %request.request_id,
                    owner = %request.order.owner,
                    basket_id = %request.order.basket_id,
                    check = %rejected.check_name,
                    severity = %rejected.severity,
                    reason = %rejected.reason,
                    "order rejected"
                );
            }
        }

        self.stream.ack(&envelope.id).await?;
        Metrics::decision_latency(start.elapsed().as_secs_f64() * 1000.0);
        Ok(decision)
    }

    /// Consume until the stream ends or `shutdown` turns true.
    ///
    /// A request whose decision cannot be published stays unacknowledged and
    /// is left for redelivery.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> AdmissionResult<()> {
        info!(checks = ?self.battery.enabled_checks(), "admission coordinator started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                next = self.stream.next() => match next? {
                    Some(envelope) => {
                        let id = envelope.id.clone();
                        if let Err(e) = self.process(envelope).await {
                            error!(id = %id, error = %e, "failed to complete request, leaving it pending");
                        }
                    }
                    None => {
                        info!("order stream closed");
                        break;
                    }
                },
            }
        }

        info!("admission coordinator stopped");
        Ok(())
    }
}
