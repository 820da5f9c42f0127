//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Query error: {0}")]
    Query(#[from] baskt_query::QueryError),

    #[error("Risk error: {0}")]
    Risk(#[from] baskt_risk::RiskError),

    #[error("Pricing error: {0}")]
    Pricing(#[from] baskt_pricing::PricingError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] baskt_telemetry::TelemetryError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AdmissionResult<T> = Result<T, AdmissionError>;
