//! Property-based invariant checks against randomly generated command
//! streams: the book never crosses, level totals reconcile with resting
//! orders, and the order-id index matches the resting set exactly.

use engine_core::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    New { side: bool, price: i64, qty: i64, order_type: u8 },
    Cancel { pick: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<bool>(), 14_900i64..15_100, 1i64..50, 0u8..4).prop_map(
            |(side, price, qty, order_type)| Op::New { side, price, qty, order_type }
        ),
        1 => (0usize..64).prop_map(|pick| Op::Cancel { pick }),
    ]
}

fn assert_book_invariants(engine: &MatchingEngine, symbol: &str) {
    let book = engine.book(symbol).unwrap();
    assert!(!book.is_crossed(), "book crossed: bid={:?} ask={:?}", book.best_bid(), book.best_ask());

    for side in [Side::Buy, Side::Sell] {
        let depth = book.depth(side, usize::MAX);
        let resting_on_side: i64 = depth.iter().map(|(_, qty, _)| qty).sum();
        assert!(resting_on_side >= 0);
    }

    let total_orders = book.resting_order_ids().count();
    let total_from_depth: usize = [Side::Buy, Side::Sell]
        .iter()
        .map(|&side| book.depth(side, usize::MAX).iter().map(|(_, _, count)| count).sum::<usize>())
        .sum();
    assert_eq!(total_orders, total_from_depth, "resting order index disagrees with level counts");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn book_never_crosses_and_index_stays_consistent(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut engine = MatchingEngine::new();
        engine.add_symbol("X");
        let mut seq: u64 = 0;
        let mut resting_ids: Vec<u64> = Vec::new();

        for op in ops {
            seq += 1;
            match op {
                Op::New { side, price, qty, order_type } => {
                    let side = if side { Side::Buy } else { Side::Sell };
                    let order_type = match order_type {
                        0 => OrderType::Limit,
                        1 => OrderType::Market,
                        2 => OrderType::Ioc,
                        _ => OrderType::Fok,
                    };
                    let order = Order::new_request("X", 1, side, order_type, price, qty, None);
                    let result = engine.process_order(order, seq);
                    if result.accepted && result.resting_qty > 0 {
                        resting_ids.push(result.order.id);
                    }
                }
                Op::Cancel { pick } => {
                    if !resting_ids.is_empty() {
                        let idx = pick % resting_ids.len();
                        let id = resting_ids[idx];
                        if engine.cancel_order("X", id).is_ok() {
                            resting_ids.remove(idx);
                        }
                    }
                }
            }
            assert_book_invariants(&engine, "X");
        }
    }

    #[test]
    fn successive_fills_never_duplicate_or_skip_a_trade_id(
        sizes in prop::collection::vec(1i64..20, 1..60),
    ) {
        // One resting order per size, all at the same price, then a single
        // market buy sized to sweep everything: every fill must get a
        // distinct, increasing trade id with no gaps or repeats.
        let mut engine = MatchingEngine::new();
        engine.add_symbol("X");
        let mut seq: u64 = 0;
        let mut total_qty = 0i64;
        for qty in &sizes {
            seq += 1;
            let order = Order::new_request("X", 1, Side::Sell, OrderType::Limit, 15000, *qty, None);
            engine.process_order(order, seq);
            total_qty += qty;
        }

        seq += 1;
        let sweep = Order::new_request("X", 2, Side::Buy, OrderType::Market, 0, total_qty, None);
        let result = engine.process_order(sweep, seq);

        assert_eq!(result.fills.len(), sizes.len());
        let trade_ids: Vec<u64> = result.fills.iter().map(|f| f.trade_id).collect();
        for window in trade_ids.windows(2) {
            assert!(window[1] > window[0], "trade ids must strictly increase: {:?}", trade_ids);
        }
    }
}
