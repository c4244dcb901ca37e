//! The matching engine: owns one `OrderBook` per symbol and the monotonic
//! id counters that belong to it. Every method here runs on the single
//! consumer thread; none of this module's state is shared or synchronized.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::book::OrderBook;
use crate::commands::{CancelOutcome, ExecutionResult};
use crate::error::CancelError;
use crate::types::{
    current_timestamp_ns, Fill, Order, OrderId, OrderStatus, OrderType, Price, Quantity,
    RejectReason, SequenceNum, Side, Symbol, TradeId,
};

/// True if a resting level at `level_price` is acceptable to a taker with
/// `taker_type`/`taker_side`/`taker_price`. Market orders accept any price;
/// every other order type treats its price as a limit.
fn price_acceptable(taker_type: OrderType, taker_side: Side, taker_price: Price, level_price: Price) -> bool {
    if taker_type.ignores_price() {
        return true;
    }
    match taker_side {
        Side::Buy => level_price <= taker_price,
        Side::Sell => level_price >= taker_price,
    }
}

/// Owns every symbol's book and assigns order/trade identifiers.
pub struct MatchingEngine {
    books: HashMap<Symbol, OrderBook>,
    next_order_id: OrderId,
    next_trade_id: TradeId,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    pub fn new() -> Self {
        MatchingEngine {
            books: HashMap::new(),
            next_order_id: 1,
            next_trade_id: 1,
        }
    }

    /// Registers a symbol with a fresh, empty book. Re-registering an
    /// existing symbol is a no-op; it does not reset its book.
    pub fn add_symbol(&mut self, symbol: impl Into<Symbol>) {
        let symbol = symbol.into();
        self.books.entry(symbol.clone()).or_insert_with(|| OrderBook::new(symbol));
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.books.keys().map(String::as_str)
    }

    pub fn book(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    /// Advances `next_order_id` to `candidate` if it is not already ahead.
    /// Used after replaying a recovered log, where order ids are preserved
    /// verbatim rather than reassigned, so a subsequent new order cannot
    /// collide with an id the log already used.
    pub fn ensure_next_order_id_at_least(&mut self, candidate: OrderId) {
        if candidate > self.next_order_id {
            self.next_order_id = candidate;
        }
    }

    /// Advances `next_trade_id` to `candidate` if it is not already ahead.
    pub fn ensure_next_trade_id_at_least(&mut self, candidate: TradeId) {
        if candidate > self.next_trade_id {
            self.next_trade_id = candidate;
        }
    }

    fn reject(order: Order, reason: RejectReason) -> ExecutionResult {
        let mut order = order;
        order.status = OrderStatus::Rejected;
        ExecutionResult {
            accepted: false,
            order,
            fills: Vec::new(),
            resting_qty: 0,
            reject_reason: Some(reason),
        }
    }

    /// Validates, assigns identity, matches against the contra side, and
    /// applies the order-type-specific rule for any residual quantity.
    ///
    /// `sequence_num` is the ring buffer sequence this command was consumed
    /// at; it becomes both `Order::sequence_num` and, downstream, the event
    /// log's sequence number for every event this call produces.
    pub fn process_order(&mut self, mut order: Order, sequence_num: SequenceNum) -> ExecutionResult {
        if !self.books.contains_key(&order.symbol) {
            return Self::reject(order, RejectReason::UnknownSymbol);
        }
        if let Err(reason) = order.validate() {
            return Self::reject(order, reason);
        }

        if order.id == 0 {
            order.id = self.next_order_id;
            self.next_order_id += 1;
        }
        order.sequence_num = sequence_num;
        if order.timestamp == 0 {
            order.timestamp = current_timestamp_ns();
        }

        let symbol = order.symbol.clone();
        let book = self.books.get_mut(&symbol).expect("symbol checked above");

        if order.order_type == OrderType::Fok {
            let contra = order.side.opposite();
            let limit = if order.order_type.ignores_price() { None } else { Some(order.price) };
            if !book.sufficient_liquidity(contra, limit, order.quantity) {
                order.status = OrderStatus::Cancelled;
                debug!(order_id = order.id, symbol = %symbol, "fill-or-kill order unfillable");
                return ExecutionResult {
                    accepted: true,
                    order,
                    fills: Vec::new(),
                    resting_qty: 0,
                    reject_reason: Some(RejectReason::FokUnfillable),
                };
            }
        }

        let fills = Self::match_against_book(book, &mut order, &mut self.next_trade_id);
        let remaining = order.remaining_qty();

        match order.order_type {
            OrderType::Limit => {
                if remaining > 0 {
                    order.status = if fills.is_empty() { OrderStatus::New } else { OrderStatus::PartiallyFilled };
                    book.add_order(order.clone());
                } else {
                    order.status = OrderStatus::Filled;
                }
                ExecutionResult {
                    accepted: true,
                    resting_qty: if order.status == OrderStatus::Filled { 0 } else { remaining },
                    order,
                    fills,
                    reject_reason: None,
                }
            }
            OrderType::Market => {
                let reject_reason = if remaining > 0 {
                    order.status = OrderStatus::Cancelled;
                    Some(RejectReason::InsufficientLiquidity)
                } else {
                    order.status = OrderStatus::Filled;
                    None
                };
                ExecutionResult {
                    accepted: true,
                    order,
                    fills,
                    resting_qty: 0,
                    reject_reason,
                }
            }
            OrderType::Ioc => {
                order.status = if remaining > 0 {
                    OrderStatus::Cancelled
                } else {
                    OrderStatus::Filled
                };
                ExecutionResult {
                    accepted: true,
                    order,
                    fills,
                    resting_qty: 0,
                    reject_reason: None,
                }
            }
            OrderType::Fok => {
                // Feasibility was confirmed before matching started, so the
                // match loop above must have consumed the full quantity.
                order.status = OrderStatus::Filled;
                debug_assert_eq!(remaining, 0, "fok order left residual after feasibility check");
                ExecutionResult {
                    accepted: true,
                    order,
                    fills,
                    resting_qty: 0,
                    reject_reason: None,
                }
            }
        }
    }

    /// Drives the order-agnostic matching loop: repeatedly takes the best
    /// acceptable resting order on the contra side and crosses it against
    /// `taker` until the taker is filled or no acceptable maker remains.
    fn match_against_book(book: &mut OrderBook, taker: &mut Order, next_trade_id: &mut TradeId) -> Vec<Fill> {
        let contra_side = taker.side.opposite();
        let mut fills = Vec::new();

        loop {
            if taker.remaining_qty() <= 0 {
                break;
            }
            let Some(price) = book.best_price(contra_side) else {
                break;
            };
            if !price_acceptable(taker.order_type, taker.side, taker.price, price) {
                break;
            }
            let Some(node_id) = book.head_node_id(contra_side, price) else {
                break;
            };

            let (maker_id, maker_account_id) = {
                let maker = book.order_mut(node_id);
                (maker.id, maker.account_id)
            };
            let maker_remaining = book.order(node_id).remaining_qty();
            let fill_qty: Quantity = taker.remaining_qty().min(maker_remaining);

            taker.filled_qty += fill_qty;
            let removed = book.record_fill(contra_side, price, node_id, fill_qty);
            debug_assert!(removed || book.order(node_id).remaining_qty() > 0);

            let trade_id = *next_trade_id;
            *next_trade_id += 1;
            fills.push(Fill {
                trade_id,
                maker_order_id: maker_id,
                taker_order_id: taker.id,
                price,
                quantity: fill_qty,
                timestamp: taker.timestamp,
                symbol: taker.symbol.clone(),
                maker_account_id,
                taker_account_id: taker.account_id,
                taker_side: taker.side,
            });
        }

        fills
    }

    /// Cancels a resting order by symbol and id.
    pub fn cancel_order(&mut self, symbol: &str, order_id: OrderId) -> Result<CancelOutcome, CancelError> {
        let book = self.books.get_mut(symbol).ok_or(CancelError::UnknownSymbol)?;
        match book.cancel_order(order_id) {
            Some(mut order) => {
                let cancelled_qty = order.remaining_qty();
                order.status = OrderStatus::Cancelled;
                Ok(CancelOutcome { order, cancelled_qty })
            }
            None => {
                warn!(symbol, order_id, "cancel requested for unknown order");
                Err(CancelError::NotFound)
            }
        }
    }
}
