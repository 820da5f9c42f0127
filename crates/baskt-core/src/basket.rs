//! Basket composition.
//!
//! A basket is an ordered list of weighted, directional legs. The same schema
//! is used for the baseline snapshot and the current snapshot; the NAV engine
//! compares the two.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Price;

/// Sum of leg weights in a fully allocated basket.
pub const WEIGHT_PRECISION: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Leg direction within a basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegDirection {
    Long,
    Short,
}

impl LegDirection {
    /// +1 for long legs, -1 for short legs.
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

/// One asset's entry in a basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub asset_id: String,
    /// Weight out of [`WEIGHT_PRECISION`].
    pub weight: Decimal,
    pub direction: LegDirection,
    pub baseline_price: Price,
}

impl Leg {
    pub fn new(
        asset_id: impl Into<String>,
        weight: Decimal,
        direction: LegDirection,
        baseline_price: Decimal,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            weight,
            direction,
            baseline_price: Price::new(baseline_price),
        }
    }
}

/// A basket with its baseline snapshot and last NAV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Basket {
    #[serde(rename = "basktId")]
    pub basket_id: String,
    pub legs: Vec<Leg>,
    pub nav: Price,
}

impl Basket {
    /// Total weight across legs.
    pub fn total_weight(&self) -> Decimal {
        self.legs.iter().map(|l| l.weight).sum()
    }

    /// Weights are non-negative and add up to [`WEIGHT_PRECISION`].
    pub fn is_fully_weighted(&self) -> bool {
        self.legs.iter().all(|l| !l.weight.is_sign_negative())
            && self.total_weight() == WEIGHT_PRECISION
    }
}

/// Response of the NAV query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketNav {
    pub nav: Price,
}
