//! TTL-memoizing decorator over a `QueryClient`.

use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use baskt_core::{BasketNav, OpenInterest, PoolState, Position, PositionFilter};
use baskt_telemetry::Metrics;
use tracing::trace;

use crate::cache::{Clock, SystemClock, TtlCache};
use crate::client::{BoxFuture, DynQueryClient, QueryClient};
use crate::error::QueryResult;

/// Caches each kind of read in its own `TtlCache`. Errors are never cached.
pub struct CachedQueryClient<C: Clock = SystemClock> {
    inner: DynQueryClient,
    positions: TtlCache<String, Vec<Position>, C>,
    position: TtlCache<String, Option<Position>, C>,
    pool: TtlCache<(), PoolState, C>,
    nav: TtlCache<String, BasketNav, C>,
    open_interest: TtlCache<String, OpenInterest, C>,
}

impl CachedQueryClient<SystemClock> {
    pub fn new(inner: DynQueryClient, ttl: Duration, max_size: usize) -> Self {
        Self::with_clock(inner, ttl, max_size, SystemClock)
    }
}

impl<C: Clock + Clone> CachedQueryClient<C> {
    pub fn with_clock(inner: DynQueryClient, ttl: Duration, max_size: usize, clock: C) -> Self {
        Self {
            inner,
            positions: TtlCache::with_clock(ttl, max_size, clock.clone()),
            position: TtlCache::with_clock(ttl, max_size, clock.clone()),
            pool: TtlCache::with_clock(ttl, max_size, clock.clone()),
            nav: TtlCache::with_clock(ttl, max_size, clock.clone()),
            open_interest: TtlCache::with_clock(ttl, max_size, clock),
        }
    }

    /// Hits and misses summed across all caches.
    pub fn stats(&self) -> (u64, u64) {
        let hits = self.positions.hits()
            + self.position.hits()
            + self.pool.hits()
            + self.nav.hits()
            + self.open_interest.hits();
        let misses = self.positions.misses()
            + self.position.misses()
            + self.pool.misses()
            + self.nav.misses()
            + self.open_interest.misses();
        (hits, misses)
    }
}

async fn memoize<K, V, C, F>(cache: &TtlCache<K, V, C>, name: &str, key: K, fetch: F) -> QueryResult<V>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
    F: Future<Output = QueryResult<V>>,
{
    if let Some(value) = cache.get(&key) {
        Metrics::cache_hit(name);
        trace!(cache = name, "cache hit");
        return Ok(value);
    }
    Metrics::cache_miss(name);
    let value = fetch.await?;
    cache.set(key, value.clone());
    Ok(value)
}

impl<C: Clock + Clone> QueryClient for CachedQueryClient<C> {
    fn get_positions<'a>(
        &'a self,
        filter: &'a PositionFilter,
    ) -> BoxFuture<'a, QueryResult<Vec<Position>>> {
        Box::pin(memoize(
            &self.positions,
            "positions",
            filter.cache_key(),
            self.inner.get_positions(filter),
        ))
    }

    fn get_position<'a>(
        &'a self,
        position_id: &'a str,
    ) -> BoxFuture<'a, QueryResult<Option<Position>>> {
        Box::pin(memoize(
            &self.position,
            "position",
            position_id.to_string(),
            self.inner.get_position(position_id),
        ))
    }

    fn get_liquidity_pool(&self) -> BoxFuture<'_, QueryResult<PoolState>> {
        Box::pin(memoize(&self.pool, "pool", (), self.inner.get_liquidity_pool()))
    }

    fn get_basket_nav<'a>(&'a self, basket_id: &'a str) -> BoxFuture<'a, QueryResult<BasketNav>> {
        Box::pin(memoize(
            &self.nav,
            "nav",
            basket_id.to_string(),
            self.inner.get_basket_nav(basket_id),
        ))
    }

    fn get_open_interest<'a>(
        &'a self,
        basket_id: &'a str,
    ) -> BoxFuture<'a, QueryResult<OpenInterest>> {
        Box::pin(memoize(
            &self.open_interest,
            "open_interest",
            basket_id.to_string(),
            self.inner.get_open_interest(basket_id),
        ))
    }
}
