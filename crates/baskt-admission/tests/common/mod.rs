//! Shared fixtures for admission integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use baskt_admission::{Coordinator, Envelope, MemoryBroker, OrderStream};
use baskt_core::{
    Basket, CloseParams, Leg, LegDirection, LimitParams, OpenInterest, OpenParams, Order,
    OrderAction, OrderKind, OrderParams, OrderRequest, PoolState, Position, PositionStatus, Price,
    Size,
};
use baskt_pricing::FeeSkewConfig;
use baskt_query::{DynQueryClient, MemoryQueryClient};
use baskt_risk::{RiskCheck, RiskCheckBattery, RiskCheckConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const BASKET: &str = "b1";

/// Querier with a deep, balanced pool and one two-leg basket at NAV 100.
pub fn seeded_querier() -> Arc<MemoryQueryClient> {
    let querier = Arc::new(MemoryQueryClient::with_pool(PoolState::new(
        dec!(10000000),
        dec!(1000000),
        dec!(1000000),
    )));
    querier.insert_basket(Basket {
        basket_id: BASKET.to_string(),
        legs: vec![
            Leg::new("BTC", dec!(6000), LegDirection::Long, dec!(60000)),
            Leg::new("ETH", dec!(4000), LegDirection::Short, dec!(3000)),
        ],
        nav: Price::new(dec!(100)),
    });
    querier.set_open_interest(
        BASKET,
        OpenInterest {
            long_open_interest: dec!(100000),
            short_open_interest: dec!(100000),
        },
    );
    querier
}

pub fn open_request(owner: &str, notional: Decimal, is_long: bool) -> OrderRequest {
    OrderRequest::new(Order {
        owner: owner.to_string(),
        action: OrderAction::Open,
        kind: OrderKind::Market,
        basket_id: BASKET.to_string(),
        params: OrderParams::Open(OpenParams {
            notional_value: notional,
            leverage_bps: 20_000,
            collateral: notional / dec!(2),
            is_long,
        }),
        limit: None,
    })
}

pub fn close_request(owner: &str, position_id: &str, size: Decimal) -> OrderRequest {
    OrderRequest::new(Order {
        owner: owner.to_string(),
        action: OrderAction::Close,
        kind: OrderKind::Market,
        basket_id: BASKET.to_string(),
        params: OrderParams::Close(CloseParams {
            size_as_contracts: Size::new(size),
            target_position: position_id.to_string(),
        }),
        limit: None,
    })
}

pub fn with_limit(mut request: OrderRequest, price: Decimal) -> OrderRequest {
    request.order.kind = OrderKind::Limit;
    request.order.limit = Some(LimitParams {
        limit_price: Price::new(price),
        max_slippage_bps: 50,
    });
    request
}

pub fn open_position(id: &str, owner: &str, size: Decimal, entry: Decimal) -> Position {
    Position {
        position_id: id.to_string(),
        owner: owner.to_string(),
        basket_id: BASKET.to_string(),
        size: Size::new(size),
        collateral: size * entry,
        is_long: true,
        entry_price: Price::new(entry),
        status: PositionStatus::Open,
    }
}

/// Coordinator over the standard battery.
pub fn standard_coordinator(
    query: DynQueryClient,
    risk: RiskCheckConfig,
) -> (Coordinator, Arc<MemoryBroker>) {
    let battery = RiskCheckBattery::standard(&risk, FeeSkewConfig::default(), Arc::clone(&query));
    coordinator_with(query, battery)
}

/// Coordinator over an explicit list of checks.
pub fn custom_coordinator(
    query: DynQueryClient,
    checks: Vec<Arc<dyn RiskCheck>>,
) -> (Coordinator, Arc<MemoryBroker>) {
    coordinator_with(query, RiskCheckBattery::new(checks))
}

fn coordinator_with(
    query: DynQueryClient,
    battery: RiskCheckBattery,
) -> (Coordinator, Arc<MemoryBroker>) {
    let broker = MemoryBroker::new("risk-test");
    let stream: Arc<dyn OrderStream> = Arc::new(broker.consumer("coordinator"));
    (Coordinator::new(query, battery, stream), broker)
}

/// Publish `request` and take it off the stream as a delivered envelope.
pub async fn deliver(broker: &Arc<MemoryBroker>, request: OrderRequest) -> Envelope<OrderRequest> {
    broker.submit(request).unwrap();
    broker
        .consumer("fixture")
        .next()
        .await
        .unwrap()
        .expect("request should be delivered")
}
