//! Risk admission for leveraged basket orders.
//!
//! Consumes `order.request` messages, runs each order through the risk check
//! battery and publishes exactly one `order.accepted` or `order.rejected`
//! decision per request.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod stream;

pub use config::{AppConfig, CacheConfig, ConsumerConfig, QuerierConfig};
pub use coordinator::{
    Coordinator, Decision, CHECK_ORDER_VALIDATION, CHECK_PRICE_FETCH, CHECK_SYSTEM,
};
pub use error::{AdmissionError, AdmissionResult};
pub use stream::{
    Envelope, MemoryBroker, MemoryStream, OrderAccepted, OrderRejected, OrderStream, Published,
    ORDER_ACCEPTED, ORDER_REJECTED, ORDER_REQUEST,
};
