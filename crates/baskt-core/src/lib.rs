//! Core domain types for basket order risk admission.
//!
//! This crate provides the types shared by every other crate:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `Order`, `OrderRequest`: Incoming order requests and their payloads
//! - `Position`: Read-only view of a settled position
//! - `Leg`, `Basket`: Weighted, directional basket composition
//! - `PoolState`, `OpenInterest`: Liquidity pool and per-basket exposure

pub mod basket;
pub mod decimal;
pub mod error;
pub mod order;
pub mod pool;
pub mod position;

pub use basket::{Basket, BasketNav, Leg, LegDirection, WEIGHT_PRECISION};
pub use decimal::{Price, Size, BPS_DENOMINATOR};
pub use error::{CoreError, Result};
pub use order::{
    CloseParams, LimitParams, OpenParams, Order, OrderAction, OrderKind, OrderParams,
    OrderRequest, RequestId,
};
pub use pool::{OpenInterest, PoolState};
pub use position::{Position, PositionFilter, PositionStatus};
