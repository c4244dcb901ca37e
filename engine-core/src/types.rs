//! Shared data model: prices, orders, fills, and the fixed-point price discipline.
//!
//! Every type here is plain data owned by whichever thread currently holds it;
//! nothing in this module is `Sync` by virtue of interior mutability, because
//! the matching engine is the sole mutator of resting orders (see `book` and
//! `matching`).

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Engine-assigned order identifier, monotonic per engine instance.
pub type OrderId = u64;

/// Global, gap-free sequence number assigned by the processor from the ring
/// buffer's claim order. Shared verbatim between `Order::sequence_num` and
/// the event log's per-record `seq` field.
pub type SequenceNum = u64;

/// Account identifier; opaque to the engine.
pub type AccountId = u64;

/// Client-supplied order identifier, echoed back but never interpreted.
pub type ClientOrderId = u64;

/// Trade identifier, monotonic per engine instance.
pub type TradeId = u64;

/// Symbol identifying a tradeable instrument's order book.
pub type Symbol = String;

/// Fixed-point price: a signed 64-bit integer counting a stable minor unit
/// (e.g. hundredths of the quote currency). All arithmetic on prices is exact
/// integer arithmetic; formatting to/from decimal strings happens only at
/// system boundaries outside this crate.
pub type Price = i64;

/// Order/fill quantity, in the instrument's base lot size.
pub type Quantity = i64;

/// Nanosecond timestamp, as produced by `current_timestamp_ns`.
pub type Timestamp = u64;

/// Returns the current wall-clock time in nanoseconds since the Unix epoch.
///
/// Used only to stamp orders that arrive with `timestamp == 0`; once set, a
/// timestamp is never recomputed, so replay reproduces it exactly.
pub fn current_timestamp_ns() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Side indicates the direction of an order.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Side {
    /// Buy means the submitter wants to acquire the instrument.
    Buy,
    /// Sell means the submitter wants to dispose of the instrument.
    Sell,
}

impl Side {
    /// The side of the book a resting order from the opposite side matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// OrderType determines how an order is matched and what happens to any
/// residual quantity after matching.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum OrderType {
    /// Rests on the book if not fully filled immediately.
    Limit,
    /// Matches at any price; never rests. Price is ignored.
    Market,
    /// Immediate-or-Cancel: fills what it can at its limit price, cancels the rest.
    Ioc,
    /// Fill-or-Kill: fills completely at its limit price or not at all.
    Fok,
}

impl OrderType {
    /// Market orders ignore `Order::price` entirely; every other type carries
    /// a meaningful limit price, even types that never rest.
    pub fn ignores_price(self) -> bool {
        matches!(self, OrderType::Market)
    }

    /// True for order types that may leave resting quantity on the book.
    pub fn may_rest(self) -> bool {
        matches!(self, OrderType::Limit)
    }
}

/// OrderStatus represents the current lifecycle state of an order.
///
/// `Filled`, `Cancelled`, and `Rejected` are terminal; an order in any of
/// those states is never mutated again.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum OrderStatus {
    /// Accepted, not yet matched (or resting with zero fills so far).
    New,
    /// Accepted and partially matched; remainder still live.
    PartiallyFilled,
    /// Fully matched.
    Filled,
    /// Cancelled by request, by IOC/FOK/Market residual handling.
    Cancelled,
    /// Rejected during pre-matching validation; never touched the book.
    Rejected,
}

/// Reasons an order fails to fully succeed. Carried as a value inside an
/// otherwise-successful `ExecutionResult`, never as a panic or exceptional
/// control-flow path.
#[derive(thiserror::Error, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum RejectReason {
    /// The order's symbol is not registered with the engine.
    #[error("unknown symbol")]
    UnknownSymbol,
    /// `Quantity <= 0`.
    #[error("quantity must be positive")]
    BadQuantity,
    /// Limit order with `Price <= 0`.
    #[error("limit price must be positive")]
    BadPrice,
    /// Market order exhausted the contra side before filling completely.
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    /// FOK order's full quantity is not available at acceptable prices.
    #[error("fill-or-kill order cannot be filled in full")]
    FokUnfillable,
}

/// A single order. Mutated only by the matching engine, and only while the
/// engine's single consumer thread owns it (either resting in a book or held
/// locally as the current taker).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Order {
    pub id: OrderId,
    pub sequence_num: SequenceNum,
    pub symbol: Symbol,
    pub account_id: AccountId,
    pub client_order_id: Option<ClientOrderId>,
    pub side: Side,
    pub order_type: OrderType,
    /// Ignored for `OrderType::Market`.
    pub price: Price,
    pub quantity: Quantity,
    pub filled_qty: Quantity,
    pub timestamp: Timestamp,
    pub status: OrderStatus,
}

impl Order {
    /// Builds a new order as a producer would: no id, no sequence number, no
    /// status yet — those are assigned by the matching engine on accept.
    #[allow(clippy::too_many_arguments)]
    pub fn new_request(
        symbol: impl Into<Symbol>,
        account_id: AccountId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
        client_order_id: Option<ClientOrderId>,
    ) -> Self {
        Order {
            id: 0,
            sequence_num: 0,
            symbol: symbol.into(),
            account_id,
            client_order_id,
            side,
            order_type,
            price,
            quantity,
            filled_qty: 0,
            timestamp: 0,
            status: OrderStatus::New,
        }
    }

    /// Quantity not yet matched.
    #[inline]
    pub fn remaining_qty(&self) -> Quantity {
        self.quantity - self.filled_qty
    }

    /// Pre-matching validation. Does not check symbol registration, which
    /// requires engine state this type does not have.
    pub fn validate(&self) -> Result<(), RejectReason> {
        if self.quantity <= 0 {
            return Err(RejectReason::BadQuantity);
        }
        if self.order_type == OrderType::Limit && self.price <= 0 {
            return Err(RejectReason::BadPrice);
        }
        Ok(())
    }
}

/// The role an order played in a matched trade.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum TradeRole {
    /// The resting order that supplied liquidity.
    Maker,
    /// The incoming order that consumed liquidity.
    Taker,
}

/// A single match between a resting maker and an incoming taker. Created
/// only at match time and never mutated afterward.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Fill {
    pub trade_id: TradeId,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    /// The maker's resting price; price improvement always goes to the taker.
    pub price: Price,
    pub quantity: Quantity,
    pub timestamp: Timestamp,
    pub symbol: Symbol,
    pub maker_account_id: AccountId,
    pub taker_account_id: AccountId,
    pub taker_side: Side,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_limit(price: Price, quantity: Quantity) -> Order {
        Order::new_request("X", 1, Side::Buy, OrderType::Limit, price, quantity, None)
    }

    #[test]
    fn remaining_qty_tracks_fills() {
        let mut order = sample_limit(100, 10);
        order.filled_qty = 4;
        assert_eq!(order.remaining_qty(), 6);
    }

    #[test]
    fn validate_rejects_non_positive_quantity() {
        let order = sample_limit(100, 0);
        assert_eq!(order.validate(), Err(RejectReason::BadQuantity));
    }

    #[test]
    fn validate_rejects_non_positive_limit_price() {
        let order = sample_limit(0, 10);
        assert_eq!(order.validate(), Err(RejectReason::BadPrice));
    }

    #[test]
    fn validate_ignores_price_for_market_orders() {
        let order = Order::new_request("X", 1, Side::Buy, OrderType::Market, 0, 10, None);
        assert_eq!(order.validate(), Ok(()));
    }

    #[test]
    fn opposite_side_round_trips() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }
}
