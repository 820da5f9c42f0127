//! Risk check trait and result types.

use std::fmt;

use baskt_core::{OpenParams, Order, OrderRequest, Price};
use baskt_query::{BoxFuture, QueryError};
use serde::{Deserialize, Serialize};

use crate::error::RiskResult;

pub const POSITION_SIZE: &str = "position_size";
pub const LIQUIDITY: &str = "liquidity";
pub const EXPOSURE: &str = "exposure";
pub const USER_LIMIT: &str = "user_limit";
pub const FEE_SKEW: &str = "fee_skew";

/// Every check, in registration order.
pub const CHECK_NAMES: [&str; 5] = [POSITION_SIZE, LIQUIDITY, EXPOSURE, USER_LIMIT, FEE_SKEW];

/// Severity of a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only input shared by every check evaluating one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCheckContext {
    pub request: OrderRequest,
    pub execution_price: Price,
}

impl RiskCheckContext {
    pub fn new(request: OrderRequest, execution_price: Price) -> Self {
        Self {
            request,
            execution_price,
        }
    }

    pub fn order(&self) -> &Order {
        &self.request.order
    }

    /// Open parameters, or `None` for closes.
    pub fn open(&self) -> Option<&OpenParams> {
        self.request.order.open_params()
    }
}

/// Outcome of one check. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskCheckResult {
    pub passed: bool,
    pub check_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Execution price proposed by the check, applied after fan-in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_price: Option<Price>,
}

impl RiskCheckResult {
    pub fn pass(check_name: &str) -> Self {
        Self {
            passed: true,
            check_name: check_name.to_string(),
            reason: None,
            severity: None,
            details: None,
            adjusted_price: None,
        }
    }

    pub fn fail(check_name: &str, severity: Severity, reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            check_name: check_name.to_string(),
            reason: Some(reason.into()),
            severity: Some(severity),
            details: None,
            adjusted_price: None,
        }
    }

    /// Failed critical result for a collaborator that could not be reached.
    pub fn unavailable(check_name: &str, err: &QueryError) -> Self {
        Self::fail(
            check_name,
            Severity::Critical,
            format!("query service unavailable: {err}"),
        )
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_adjusted_price(mut self, price: Price) -> Self {
        self.adjusted_price = Some(price);
        self
    }
}

/// A single risk check.
///
/// `check` must not mutate the context; a new execution price is proposed
/// through [`RiskCheckResult::adjusted_price`].
pub trait RiskCheck: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    fn check<'a>(&'a self, ctx: &'a RiskCheckContext) -> BoxFuture<'a, RiskResult<RiskCheckResult>>;
}
