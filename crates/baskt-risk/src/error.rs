//! Risk error types.

use baskt_pricing::PricingError;
use baskt_query::QueryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Query failed: {0}")]
    Query(#[from] QueryError),

    #[error("Pricing failed: {0}")]
    Pricing(#[from] PricingError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type RiskResult<T> = Result<T, RiskError>;
