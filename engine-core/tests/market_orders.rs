mod common;

use common::*;
use engine_core::prelude::*;

fn engine_with(symbol: &str) -> MatchingEngine {
    let mut engine = MatchingEngine::new();
    engine.add_symbol(symbol);
    engine
}

#[test]
fn market_order_against_empty_book_is_cancelled_with_insufficient_liquidity() {
    let mut engine = engine_with("X");
    let mut seq = 0;
    let result = rest(&mut engine, market("X", Side::Buy, 10), &mut seq);

    assert!(result.accepted);
    assert!(result.fills.is_empty());
    assert_eq!(result.order.status, OrderStatus::Cancelled);
    assert_eq!(result.reject_reason, Some(RejectReason::InsufficientLiquidity));
    assert_eq!(result.resting_qty, 0);
}

#[test]
fn market_order_never_rests() {
    let mut engine = engine_with("X");
    let mut seq = 0;
    rest(&mut engine, limit("X", Side::Sell, 15000, 5), &mut seq);
    let result = rest(&mut engine, market("X", Side::Buy, 20), &mut seq);

    assert_eq!(result.fills.len(), 1);
    assert_eq!(result.fills[0].quantity, 5);
    assert_eq!(result.order.status, OrderStatus::Cancelled);
    assert_eq!(result.reject_reason, Some(RejectReason::InsufficientLiquidity));
    assert!(!engine.book("X").unwrap().contains_order(result.order.id));
}

#[test]
fn market_order_ignores_price_field() {
    let mut engine = engine_with("X");
    let mut seq = 0;
    rest(&mut engine, limit("X", Side::Sell, 999_999, 10), &mut seq);
    let result = rest(&mut engine, market("X", Side::Buy, 10), &mut seq);

    assert_eq!(result.order.status, OrderStatus::Filled);
    assert_eq!(result.fills[0].price, 999_999);
}
