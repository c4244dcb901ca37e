mod common;

use common::*;
use engine_core::prelude::*;

fn engine_with(symbol: &str) -> MatchingEngine {
    let mut engine = MatchingEngine::new();
    engine.add_symbol(symbol);
    engine
}

#[test]
fn cancel_during_rest_removes_order_and_reports_remaining_qty() {
    let mut engine = engine_with("X");
    let mut seq = 0;
    let placed = rest(&mut engine, limit("X", Side::Buy, 14900, 75), &mut seq);

    let outcome = engine.cancel_order("X", placed.order.id).expect("order present");
    assert_eq!(outcome.cancelled_qty, 75);
    assert_eq!(outcome.order.status, OrderStatus::Cancelled);
    assert!(!engine.book("X").unwrap().contains_order(placed.order.id));
    assert_eq!(engine.book("X").unwrap().best_bid(), None);
}

#[test]
fn cancel_after_partial_fill_reports_only_remaining_quantity() {
    let mut engine = engine_with("X");
    let mut seq = 0;
    let placed = rest(&mut engine, limit("X", Side::Buy, 15000, 100), &mut seq);
    rest(&mut engine, limit("X", Side::Sell, 15000, 40), &mut seq);

    let outcome = engine.cancel_order("X", placed.order.id).expect("order present");
    assert_eq!(outcome.cancelled_qty, 60);
}

#[test]
fn cancel_unknown_order_id_reports_not_found() {
    let mut engine = engine_with("X");
    assert_eq!(engine.cancel_order("X", 404), Err(CancelError::NotFound));
}

#[test]
fn cancel_on_unregistered_symbol_reports_unknown_symbol() {
    let mut engine = MatchingEngine::new();
    assert_eq!(engine.cancel_order("NOPE", 1), Err(CancelError::UnknownSymbol));
}

#[test]
fn cancel_twice_fails_the_second_time() {
    let mut engine = engine_with("X");
    let mut seq = 0;
    let placed = rest(&mut engine, limit("X", Side::Buy, 14900, 10), &mut seq);
    engine.cancel_order("X", placed.order.id).expect("first cancel ok");
    assert_eq!(engine.cancel_order("X", placed.order.id), Err(CancelError::NotFound));
}

#[test]
fn order_on_unregistered_symbol_is_rejected() {
    let mut engine = MatchingEngine::new();
    let mut seq = 0;
    let result = rest(&mut engine, limit("NOPE", Side::Buy, 100, 10), &mut seq);

    assert!(!result.accepted);
    assert_eq!(result.order.status, OrderStatus::Rejected);
    assert_eq!(result.reject_reason, Some(RejectReason::UnknownSymbol));
}

#[test]
fn zero_quantity_order_is_rejected_with_bad_quantity() {
    let mut engine = engine_with("X");
    let mut seq = 0;
    let result = rest(&mut engine, limit("X", Side::Buy, 100, 0), &mut seq);

    assert!(!result.accepted);
    assert_eq!(result.reject_reason, Some(RejectReason::BadQuantity));
}

#[test]
fn negative_price_limit_order_is_rejected_with_bad_price() {
    let mut engine = engine_with("X");
    let mut seq = 0;
    let result = rest(&mut engine, limit("X", Side::Buy, -1, 10), &mut seq);

    assert!(!result.accepted);
    assert_eq!(result.reject_reason, Some(RejectReason::BadPrice));
}

#[test]
fn rejected_order_never_touches_the_book() {
    let mut engine = engine_with("X");
    let mut seq = 0;
    let result = rest(&mut engine, limit("X", Side::Buy, 100, -5), &mut seq);

    assert!(!result.accepted);
    assert_eq!(engine.book("X").unwrap().best_bid(), None);
}
