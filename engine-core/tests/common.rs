use engine_core::prelude::*;

pub fn limit(symbol: &str, side: Side, price: Price, quantity: Quantity) -> Order {
    Order::new_request(symbol, 1, side, OrderType::Limit, price, quantity, None)
}

pub fn market(symbol: &str, side: Side, quantity: Quantity) -> Order {
    Order::new_request(symbol, 1, side, OrderType::Market, 0, quantity, None)
}

pub fn ioc(symbol: &str, side: Side, price: Price, quantity: Quantity) -> Order {
    Order::new_request(symbol, 1, side, OrderType::Ioc, price, quantity, None)
}

pub fn fok(symbol: &str, side: Side, price: Price, quantity: Quantity) -> Order {
    Order::new_request(symbol, 1, side, OrderType::Fok, price, quantity, None)
}

pub fn rest(engine: &mut MatchingEngine, order: Order, seq: &mut SequenceNum) -> ExecutionResult {
    *seq += 1;
    engine.process_order(order, *seq)
}
