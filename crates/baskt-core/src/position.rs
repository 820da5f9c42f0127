//! Read-only position view.
//!
//! Positions are created and mutated by the settlement layer; the admission
//! path only reads them through the query collaborator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Price, Size};

/// Position lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionStatus {
    Open,
    Closed,
    Liquidated,
    ForceClosed,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Liquidated => write!(f, "liquidated"),
            Self::ForceClosed => write!(f, "forceClosed"),
        }
    }
}

/// A settled position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub position_id: String,
    pub owner: String,
    #[serde(rename = "basktId")]
    pub basket_id: String,
    pub size: Size,
    pub collateral: Decimal,
    pub is_long: bool,
    pub entry_price: Price,
    pub status: PositionStatus,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Notional at entry: size * entry price.
    pub fn notional(&self) -> Decimal {
        self.size.notional(self.entry_price)
    }
}

/// Filter for position queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "basktId", skip_serializing_if = "Option::is_none")]
    pub basket_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl PositionFilter {
    /// Open positions of one user.
    pub fn active_for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            basket_id: None,
            is_active: Some(true),
        }
    }

    pub fn matches(&self, position: &Position) -> bool {
        if let Some(user) = &self.user_id {
            if &position.owner != user {
                return false;
            }
        }
        if let Some(basket) = &self.basket_id {
            if &position.basket_id != basket {
                return false;
            }
        }
        if let Some(active) = self.is_active {
            if position.is_open() != active {
                return false;
            }
        }
        true
    }

    /// Stable key used for caching query results.
    pub fn cache_key(&self) -> String {
        format!(
            "u={}|b={}|a={}",
            self.user_id.as_deref().unwrap_or("*"),
            self.basket_id.as_deref().unwrap_or("*"),
            self.is_active.map(|a| a.to_string()).unwrap_or_else(|| "*".to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(owner: &str, status: PositionStatus) -> Position {
        Position {
            position_id: "p1".to_string(),
            owner: owner.to_string(),
            basket_id: "b1".to_string(),
            size: Size::new(dec!(3)),
            collateral: dec!(100),
            is_long: true,
            entry_price: Price::new(dec!(50)),
            status,
        }
    }

    #[test]
    fn test_position_notional() {
        assert_eq!(position("alice", PositionStatus::Open).notional(), dec!(150));
    }

    #[test]
    fn test_filter_matches() {
        let filter = PositionFilter::active_for_user("alice");
        assert!(filter.matches(&position("alice", PositionStatus::Open)));
        assert!(!filter.matches(&position("alice", PositionStatus::Liquidated)));
        assert!(!filter.matches(&position("bob", PositionStatus::Open)));
        assert!(PositionFilter::default().matches(&position("bob", PositionStatus::Closed)));
    }

    #[test]
    fn test_filter_cache_key() {
        assert_eq!(
            PositionFilter::active_for_user("alice").cache_key(),
            "u=alice|b=*|a=true"
        );
    }

    #[test]
    fn test_status_wire_format() {
        let s: PositionStatus = serde_json::from_str("\"forceClosed\"").unwrap();
        assert_eq!(s, PositionStatus::ForceClosed);
    }
}
