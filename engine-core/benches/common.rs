use engine_core::prelude::*;

pub fn make_limit_order(account_id: u64, side: Side, price: Price, qty: Quantity) -> Order {
    Order::new_request("X", account_id, side, OrderType::Limit, price, qty, None)
}

pub fn make_market_order(account_id: u64, side: Side, qty: Quantity) -> Order {
    Order::new_request("X", account_id, side, OrderType::Market, 0, qty, None)
}
