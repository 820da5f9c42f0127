//! Order request types.
//!
//! An order is either an open (new exposure, sized by notional) or a close
//! (sized in contracts against an existing position). Both may carry limit
//! parameters that pin the execution price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::{Price, Size, BPS_DENOMINATOR};
use crate::error::{CoreError, Result};

/// Order action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Open,
    Close,
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// Order kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Limit => write!(f, "limit"),
        }
    }
}

/// Parameters of an opening order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenParams {
    /// Notional value in collateral units.
    pub notional_value: Decimal,
    /// Leverage in basis points (10_000 = 1x).
    pub leverage_bps: u32,
    /// Collateral posted for the position.
    pub collateral: Decimal,
    pub is_long: bool,
}

impl OpenParams {
    /// Leverage as a plain multiplier (e.g. 50_000 bps -> 5).
    pub fn leverage(&self) -> Decimal {
        Decimal::from(self.leverage_bps) / BPS_DENOMINATOR
    }
}

/// Parameters of a closing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseParams {
    /// Contracts to close. Partial closes are allowed.
    pub size_as_contracts: Size,
    /// Position being closed.
    pub target_position: String,
}

/// Limit parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitParams {
    pub limit_price: Price,
    /// Slippage allowance in basis points.
    #[serde(default)]
    pub max_slippage_bps: u32,
}

impl LimitParams {
    /// Slippage allowance as a fraction (e.g. 50 bps -> 0.005).
    pub fn slippage_fraction(&self) -> Decimal {
        Decimal::from(self.max_slippage_bps) / BPS_DENOMINATOR
    }
}

/// Action-specific payload.
///
/// Serialized untagged: the `action` field on [`Order`] says which variant
/// is expected, and [`Order::validate`] checks they agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderParams {
    Open(OpenParams),
    Close(CloseParams),
}

/// A trade order as submitted by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub owner: String,
    pub action: OrderAction,
    pub kind: OrderKind,
    #[serde(rename = "basktId")]
    pub basket_id: String,
    pub params: OrderParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitParams>,
}

impl Order {
    /// Check the structural invariants not expressible in the type.
    ///
    /// - the payload variant matches `action`
    /// - limit orders carry limit parameters with a positive price
    /// - open notional and collateral are not negative
    pub fn validate(&self) -> Result<()> {
        match (&self.action, &self.params) {
            (OrderAction::Open, OrderParams::Open(open)) => {
                if open.notional_value.is_sign_negative() {
                    return Err(CoreError::InvalidOrder(format!(
                        "negative notional {}",
                        open.notional_value
                    )));
                }
                if open.collateral.is_sign_negative() {
                    return Err(CoreError::InvalidOrder(format!(
                        "negative collateral {}",
                        open.collateral
                    )));
                }
            }
            (OrderAction::Close, OrderParams::Close(close)) => {
                if close.target_position.is_empty() {
                    return Err(CoreError::InvalidOrder(
                        "close order without target position".to_string(),
                    ));
                }
            }
            (action, _) => {
                return Err(CoreError::InvalidOrder(format!(
                    "payload does not match action {action}"
                )));
            }
        }

        if self.kind == OrderKind::Limit && self.limit.is_none() {
            return Err(CoreError::InvalidOrder(
                "limit order without limit params".to_string(),
            ));
        }

        if let Some(limit) = &self.limit {
            if !limit.limit_price.is_positive() {
                return Err(CoreError::InvalidPrice(format!(
                    "limit price must be positive, got {}",
                    limit.limit_price
                )));
            }
        }

        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.action == OrderAction::Open
    }

    pub fn open_params(&self) -> Option<&OpenParams> {
        match &self.params {
            OrderParams::Open(p) => Some(p),
            OrderParams::Close(_) => None,
        }
    }

    pub fn close_params(&self) -> Option<&CloseParams> {
        match &self.params {
            OrderParams::Close(p) => Some(p),
            OrderParams::Open(_) => None,
        }
    }

    /// Explicit limit price, if any.
    pub fn limit_price(&self) -> Option<Price> {
        self.limit.as_ref().map(|l| l.limit_price)
    }
}

/// Request identifier carried through every stream message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Create a new unique request ID.
    ///
    /// Format: `ord_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("ord_{ts}_{uuid_short}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Payload of the `order.request` stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub request_id: RequestId,
    pub order: Order,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl OrderRequest {
    pub fn new(order: Order) -> Self {
        Self {
            request_id: RequestId::new(),
            order,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn open_order() -> Order {
        Order {
            owner: "alice".to_string(),
            action: OrderAction::Open,
            kind: OrderKind::Market,
            basket_id: "b1".to_string(),
            params: OrderParams::Open(OpenParams {
                notional_value: dec!(1000),
                leverage_bps: 20_000,
                collateral: dec!(500),
                is_long: true,
            }),
            limit: None,
        }
    }

    #[test]
    fn test_valid_open_order() {
        assert!(open_order().validate().is_ok());
        assert!(open_order().is_open());
        assert_eq!(open_order().open_params().unwrap().leverage(), dec!(2));
    }

    #[test]
    fn test_action_payload_mismatch() {
        let mut order = open_order();
        order.action = OrderAction::Close;
        assert!(matches!(order.validate(), Err(CoreError::InvalidOrder(_))));
    }

    #[test]
    fn test_limit_kind_requires_params() {
        let mut order = open_order();
        order.kind = OrderKind::Limit;
        assert!(order.validate().is_err());

        order.limit = Some(LimitParams {
            limit_price: Price::new(dec!(99)),
            max_slippage_bps: 50,
        });
        assert!(order.validate().is_ok());
        assert_eq!(order.limit_price(), Some(Price::new(dec!(99))));
        assert_eq!(order.limit.unwrap().slippage_fraction(), dec!(0.005));
    }

    #[test]
    fn test_close_order_wire_format() {
        let json = r#"{
            "owner": "bob",
            "action": "close",
            "kind": "market",
            "basktId": "b1",
            "params": {"sizeAsContracts": "2", "targetPosition": "pos-1"}
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        let close = order.close_params().unwrap();
        assert_eq!(close.size_as_contracts, Size::new(dec!(2)));
        assert_eq!(close.target_position, "pos-1");
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_request_id_format() {
        let id = RequestId::new();
        assert!(id.as_str().starts_with("ord_"));
        assert_ne!(id, RequestId::new());
    }
}
