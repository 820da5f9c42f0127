//! Basket valuation and execution pricing.
//!
//! - [`nav`]: Weighted, directional NAV recurrence (fails safe to the input NAV)
//! - [`fee_skew`]: Converts a base price into a fee-embedding execution price
//!   from impact, utilization and imbalance fees

pub mod config;
pub mod error;
pub mod fee_skew;
pub mod nav;

pub use config::FeeSkewConfig;
pub use error::{PricingError, PricingResult};
pub use fee_skew::{borrow_rate, imbalance_ratio, FeeBreakdown, FeeSkewEngine, FeeSkewResult, OrderDetail};
pub use nav::compute_basket_nav;
