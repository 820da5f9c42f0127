//! Query collaborator for basket order admission.
//!
//! The admission path reads positions, pool state, open interest and basket
//! NAV through [`QueryClient`]. Implementations:
//! - [`HttpQueryClient`]: REST client for the querier service
//! - [`MemoryQueryClient`]: in-process state, NAV derived from basket legs
//! - [`CachedQueryClient`]: TTL-memoizing decorator over any client

pub mod cache;
pub mod cached;
pub mod client;
pub mod error;
pub mod http;
pub mod memory;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use cached::CachedQueryClient;
pub use client::{BoxFuture, DynQueryClient, QueryClient};
pub use error::{QueryError, QueryResult};
pub use http::HttpQueryClient;
pub use memory::{MemoryQueryClient, QuerierState};
