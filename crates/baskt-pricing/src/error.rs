//! Pricing error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("Invalid base price: {0}")]
    InvalidBasePrice(String),

    #[error("Invalid notional: {0}")]
    InvalidNotional(String),

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PricingResult<T> = Result<T, PricingError>;
