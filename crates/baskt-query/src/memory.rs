//! In-process query collaborator.
//!
//! Holds pool state, positions and baskets in memory. Basket NAV is not
//! stored directly: each basket keeps its baseline legs, its current legs
//! and the NAV at baseline, and every read runs the NAV engine over them.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use baskt_core::{
    Basket, BasketNav, Leg, OpenInterest, PoolState, Position, PositionFilter, Price,
};
use baskt_pricing::compute_basket_nav;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::client::{BoxFuture, QueryClient};
use crate::error::{QueryError, QueryResult};

#[derive(Debug, Clone)]
struct BasketState {
    baseline: Vec<Leg>,
    current: Vec<Leg>,
    baseline_nav: Decimal,
    open_interest: OpenInterest,
}

/// Seed for [`MemoryQueryClient`], loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerierState {
    #[serde(default)]
    pub pool: PoolState,
    #[serde(default)]
    pub baskets: Vec<Basket>,
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Keyed by basket id.
    #[serde(default)]
    pub open_interest: HashMap<String, OpenInterest>,
}

/// `QueryClient` over in-memory state.
///
/// Failure toggles make the collaborator unavailable for tests, and every
/// call is appended to a log so callers can assert on ordering.
#[derive(Debug, Default)]
pub struct MemoryQueryClient {
    pool: RwLock<PoolState>,
    positions: RwLock<BTreeMap<String, Position>>,
    baskets: RwLock<HashMap<String, BasketState>>,
    unavailable: AtomicBool,
    pool_unavailable: AtomicBool,
    nav_unavailable: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MemoryQueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(pool: PoolState) -> Self {
        let client = Self::default();
        client.set_pool(pool);
        client
    }

    pub fn from_state(state: QuerierState) -> Self {
        let client = Self::with_pool(state.pool);
        let baskets = state.baskets.len();
        for basket in state.baskets {
            client.insert_basket(basket);
        }
        for position in state.positions {
            client.upsert_position(position);
        }
        for (basket_id, oi) in state.open_interest {
            client.set_open_interest(&basket_id, oi);
        }
        debug!(baskets, positions = client.positions.read().len(), "memory querier seeded");
        client
    }

    pub fn set_pool(&self, pool: PoolState) {
        *self.pool.write() = pool;
    }

    pub fn upsert_position(&self, position: Position) {
        self.positions
            .write()
            .insert(position.position_id.clone(), position);
    }

    /// Register a basket; its legs become both baseline and current snapshot.
    pub fn insert_basket(&self, basket: Basket) {
        self.baskets.write().insert(
            basket.basket_id.clone(),
            BasketState {
                baseline: basket.legs.clone(),
                current: basket.legs,
                baseline_nav: basket.nav.inner(),
                open_interest: OpenInterest::default(),
            },
        );
    }

    /// Move one asset's current price. Returns `false` if nothing matched.
    pub fn set_leg_price(&self, basket_id: &str, asset_id: &str, price: Price) -> bool {
        let mut baskets = self.baskets.write();
        let Some(state) = baskets.get_mut(basket_id) else {
            return false;
        };
        let mut matched = false;
        for leg in state.current.iter_mut().filter(|l| l.asset_id == asset_id) {
            leg.baseline_price = price;
            matched = true;
        }
        matched
    }

    /// Overwrite the NAV at baseline.
    pub fn set_baseline_nav(&self, basket_id: &str, nav: Decimal) -> bool {
        match self.baskets.write().get_mut(basket_id) {
            Some(state) => {
                state.baseline_nav = nav;
                true
            }
            None => false,
        }
    }

    pub fn set_open_interest(&self, basket_id: &str, open_interest: OpenInterest) -> bool {
        match self.baskets.write().get_mut(basket_id) {
            Some(state) => {
                state.open_interest = open_interest;
                true
            }
            None => false,
        }
    }

    /// Fail every call with `QueryError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_pool_unavailable(&self, unavailable: bool) {
        self.pool_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_nav_unavailable(&self, unavailable: bool) {
        self.nav_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Names of the calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn enter(&self, call: &str, toggle: Option<&AtomicBool>) -> QueryResult<()> {
        trace!(call, "memory query");
        self.calls.lock().push(call.to_string());
        let down = self.unavailable.load(Ordering::SeqCst)
            || toggle.is_some_and(|t| t.load(Ordering::SeqCst));
        if down {
            return Err(QueryError::Unavailable(format!("{call}: querier offline")));
        }
        Ok(())
    }
}

impl QueryClient for MemoryQueryClient {
    fn get_positions<'a>(
        &'a self,
        filter: &'a PositionFilter,
    ) -> BoxFuture<'a, QueryResult<Vec<Position>>> {
        Box::pin(async move {
            self.enter("get_positions", None)?;
            Ok(self
                .positions
                .read()
                .values()
                .filter(|p| filter.matches(p))
                .cloned()
                .collect())
        })
    }

    fn get_position<'a>(
        &'a self,
        position_id: &'a str,
    ) -> BoxFuture<'a, QueryResult<Option<Position>>> {
        Box::pin(async move {
            self.enter("get_position", None)?;
            Ok(self.positions.read().get(position_id).cloned())
        })
    }

    fn get_liquidity_pool(&self) -> BoxFuture<'_, QueryResult<PoolState>> {
        Box::pin(async move {
            self.enter("get_liquidity_pool", Some(&self.pool_unavailable))?;
            Ok(self.pool.read().clone())
        })
    }

    fn get_basket_nav<'a>(&'a self, basket_id: &'a str) -> BoxFuture<'a, QueryResult<BasketNav>> {
        Box::pin(async move {
            self.enter("get_basket_nav", Some(&self.nav_unavailable))?;
            let baskets = self.baskets.read();
            let state = baskets
                .get(basket_id)
                .ok_or_else(|| QueryError::NotFound(format!("basket {basket_id}")))?;
            let nav = compute_basket_nav(&state.baseline, &state.current, state.baseline_nav);
            Ok(BasketNav {
                nav: Price::new(nav),
            })
        })
    }

    fn get_open_interest<'a>(
        &'a self,
        basket_id: &'a str,
    ) -> BoxFuture<'a, QueryResult<OpenInterest>> {
        Box::pin(async move {
            self.enter("get_open_interest", None)?;
            self.baskets
                .read()
                .get(basket_id)
                .map(|s| s.open_interest.clone())
                .ok_or_else(|| QueryError::NotFound(format!("basket {basket_id}")))
        })
    }
}
