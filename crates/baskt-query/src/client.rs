//! Query collaborator trait.

use std::pin::Pin;
use std::sync::Arc;

use baskt_core::{BasketNav, OpenInterest, PoolState, Position, PositionFilter};

use crate::error::QueryResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Read-only view of protocol state.
///
/// Shared by the coordinator and every risk check as `Arc<dyn QueryClient>`.
pub trait QueryClient: Send + Sync {
    fn get_positions<'a>(
        &'a self,
        filter: &'a PositionFilter,
    ) -> BoxFuture<'a, QueryResult<Vec<Position>>>;

    /// `Ok(None)` when no position has this id.
    fn get_position<'a>(&'a self, position_id: &'a str)
        -> BoxFuture<'a, QueryResult<Option<Position>>>;

    fn get_liquidity_pool(&self) -> BoxFuture<'_, QueryResult<PoolState>>;

    fn get_basket_nav<'a>(&'a self, basket_id: &'a str) -> BoxFuture<'a, QueryResult<BasketNav>>;

    fn get_open_interest<'a>(
        &'a self,
        basket_id: &'a str,
    ) -> BoxFuture<'a, QueryResult<OpenInterest>>;
}

pub type DynQueryClient = Arc<dyn QueryClient>;
