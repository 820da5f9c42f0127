//! Prometheus metrics and structured logging for basket order admission.
//!
//! - Prometheus metrics for decisions, per-check rejections and latency
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
