//! Risk check battery for basket orders.
//!
//! Every order is evaluated by a fixed, ordered list of checks that run
//! concurrently against a shared read-only [`RiskCheckContext`]:
//!
//! 1. `position_size`: notional, leverage and collateral limits; close sizing
//! 2. `liquidity`: pool can cover the order plus a buffer
//! 3. `exposure`: per-user notional cap and per-basket skew limit
//! 4. `user_limit`: open position count per user
//! 5. `fee_skew`: execution pricing and fee ceiling (fails open)
//!
//! A check that errors or panics fails closed with a critical result.

pub mod battery;
pub mod check;
pub mod config;
pub mod error;
pub mod exposure;
pub mod fee_skew;
pub mod liquidity;
pub mod position_size;
pub mod user_limit;

#[cfg(test)]
mod testutil;

pub use battery::{panic_message, RiskCheckBattery};
pub use check::{RiskCheck, RiskCheckContext, RiskCheckResult, Severity, CHECK_NAMES};
pub use config::RiskCheckConfig;
pub use error::{RiskError, RiskResult};
pub use exposure::ExposureCheck;
pub use fee_skew::FeeSkewCheck;
pub use liquidity::LiquidityCheck;
pub use position_size::PositionSizeCheck;
pub use user_limit::UserLimitCheck;
