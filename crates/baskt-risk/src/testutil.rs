//! Order fixtures shared by the check tests.

use baskt_core::{
    CloseParams, LimitParams, OpenParams, Order, OrderAction, OrderKind, OrderParams,
    OrderRequest, Position, PositionStatus, Price, Size,
};
use rust_decimal::Decimal;

use crate::check::RiskCheckContext;

pub fn open_order(owner: &str, notional: Decimal, is_long: bool) -> Order {
    Order {
        owner: owner.to_string(),
        action: OrderAction::Open,
        kind: OrderKind::Market,
        basket_id: "b1".to_string(),
        params: OrderParams::Open(OpenParams {
            notional_value: notional,
            leverage_bps: 20_000,
            collateral: notional / Decimal::TWO,
            is_long,
        }),
        limit: None,
    }
}

pub fn close_order(owner: &str, position_id: &str, size: Decimal) -> Order {
    Order {
        owner: owner.to_string(),
        action: OrderAction::Close,
        kind: OrderKind::Market,
        basket_id: "b1".to_string(),
        params: OrderParams::Close(CloseParams {
            size_as_contracts: Size::new(size),
            target_position: position_id.to_string(),
        }),
        limit: None,
    }
}

pub fn with_limit(mut order: Order, price: Decimal, slippage_bps: u32) -> Order {
    order.kind = OrderKind::Limit;
    order.limit = Some(LimitParams {
        limit_price: Price::new(price),
        max_slippage_bps: slippage_bps,
    });
    order
}

pub fn context(order: Order, price: Decimal) -> RiskCheckContext {
    RiskCheckContext::new(OrderRequest::new(order), Price::new(price))
}

pub fn open_context(owner: &str, notional: Decimal, is_long: bool) -> RiskCheckContext {
    context(open_order(owner, notional, is_long), Decimal::from(100))
}

pub fn position(id: &str, owner: &str, size: Decimal, entry: Decimal) -> Position {
    Position {
        position_id: id.to_string(),
        owner: owner.to_string(),
        basket_id: "b1".to_string(),
        size: Size::new(size),
        collateral: size * entry / Decimal::TWO,
        is_long: true,
        entry_price: Price::new(entry),
        status: PositionStatus::Open,
    }
}
