//! The single-symbol limit order book: price-time priority on both sides,
//! O(1) best-bid/best-ask, and O(1) cancel-by-id from anywhere in the book.
//!
//! Ownership is single-threaded by design: the matching engine that holds a
//! `&mut OrderBook` is the only writer, so none of the mutation methods here
//! take locks or use atomics. Concurrency lives one layer up, in the ring
//! buffer that funnels every mutation through a single consumer.

use std::collections::{BTreeMap, HashMap};

use slab::Slab;

use super::level::{NodeId, OrderNode, PriceLevel};
use crate::types::{Order, OrderId, Price, Quantity, Side, Symbol};

/// A resting-order book for one symbol.
pub struct OrderBook {
    symbol: Symbol,
    arena: Slab<OrderNode>,
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    index: HashMap<OrderId, NodeId>,
    best_bid: Option<Price>,
    best_ask: Option<Price>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        OrderBook {
            symbol: symbol.into(),
            arena: Slab::new(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
            best_bid: None,
            best_ask: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    fn side_map(&self, side: Side) -> &BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn best_cache(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
        }
    }

    fn set_best_cache(&mut self, side: Side, price: Option<Price>) {
        match side {
            Side::Buy => self.best_bid = price,
            Side::Sell => self.best_ask = price,
        }
    }

    /// Recomputes the cached best price for `side` from the map, used only
    /// when the previously-best level is removed entirely. O(log L).
    fn refresh_best_cache(&mut self, side: Side) {
        let best = match side {
            Side::Buy => self.bids.keys().next_back().copied(),
            Side::Sell => self.asks.keys().next().copied(),
        };
        self.set_best_cache(side, best);
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.best_bid
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.best_ask
    }

    /// The cached best resting price on `side`, O(1).
    pub fn best_price(&self, side: Side) -> Option<Price> {
        self.best_cache(side)
    }

    /// True when the book is crossed (best bid >= best ask); should never be
    /// observed between fully-processed commands.
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    /// Up to `n` levels on `side`, best first, as (price, total_qty, order_count).
    pub fn depth(&self, side: Side, n: usize) -> Vec<(Price, Quantity, usize)> {
        let map = self.side_map(side);
        let iter: Box<dyn Iterator<Item = (&Price, &PriceLevel)>> = match side {
            Side::Buy => Box::new(map.iter().rev()),
            Side::Sell => Box::new(map.iter()),
        };
        iter.take(n)
            .map(|(&price, level)| (price, level.total_qty, level.count))
            .collect()
    }

    /// Id of the oldest resting order at `price` on `side`, if any.
    pub fn head_node_id(&self, side: Side, price: Price) -> Option<NodeId> {
        self.side_map(side).get(&price).and_then(|l| l.head)
    }

    /// Mutable access to a resting order by its arena handle. Panics if the
    /// handle is stale; callers only ever pass handles obtained moments
    /// earlier from this same book.
    pub fn order_mut(&mut self, node_id: NodeId) -> &mut Order {
        &mut self.arena[node_id].order
    }

    pub fn order(&self, node_id: NodeId) -> &Order {
        &self.arena[node_id].order
    }

    pub fn contains_order(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// All currently-resting order ids; for invariant checks and tests only.
    pub fn resting_order_ids(&self) -> impl Iterator<Item = OrderId> + '_ {
        self.index.keys().copied()
    }

    /// Rests `order` at the tail of its price level, creating the level if
    /// necessary, and indexes it for O(1) lookup. O(log L).
    pub fn add_order(&mut self, order: Order) -> NodeId {
        let side = order.side;
        let price = order.price;
        let order_id = order.id;
        let level = self
            .side_map_mut(side)
            .entry(price)
            .or_insert_with(|| PriceLevel::empty(price));
        let node_id = level.push_back(&mut self.arena, order);
        self.index.insert(order_id, node_id);

        let better = match side {
            Side::Buy => match self.best_bid {
                Some(best) => price > best,
                None => true,
            },
            Side::Sell => match self.best_ask {
                Some(best) => price < best,
                None => true,
            },
        };
        if better {
            self.set_best_cache(side, Some(price));
        }
        node_id
    }

    /// Removes a node from wherever it sits in its level's list, updates the
    /// level's bookkeeping, and drops an emptied level from the map. O(1)
    /// amortized, O(log L) only when the level it sat in becomes empty.
    fn remove_node(&mut self, node_id: NodeId) -> Order {
        let node = self.arena.remove(node_id);
        if let Some(prev_id) = node.prev {
            self.arena[prev_id].next = node.next;
        }
        if let Some(next_id) = node.next {
            self.arena[next_id].prev = node.prev;
        }

        let side = node.side;
        let price = node.price;
        let remaining = node.order.remaining_qty();
        self.index.remove(&node.order.id);

        let map = self.side_map_mut(side);
        if let Some(level) = map.get_mut(&price) {
            if level.head == Some(node_id) {
                level.head = node.next;
            }
            if level.tail == Some(node_id) {
                level.tail = node.prev;
            }
            level.count -= 1;
            level.total_qty -= remaining;
            if level.is_empty() {
                map.remove(&price);
                if self.best_cache(side) == Some(price) {
                    self.refresh_best_cache(side);
                }
            }
        }
        node.order
    }

    /// Cancels a resting order by id, returning it if found. O(1) amortized.
    pub fn cancel_order(&mut self, order_id: OrderId) -> Option<Order> {
        let node_id = *self.index.get(&order_id)?;
        Some(self.remove_node(node_id))
    }

    /// Applies a fill of `qty` to the order at `node_id` (which must be the
    /// current head of its level), updating its status, the level's total
    /// quantity, and the best-price cache. Returns `true` if the order was
    /// fully filled and removed from the book.
    pub fn record_fill(&mut self, side: Side, price: Price, node_id: NodeId, qty: Quantity) -> bool {
        let node = &mut self.arena[node_id];
        node.order.filled_qty += qty;
        let remaining_after = node.order.remaining_qty();
        node.order.status = if remaining_after == 0 {
            crate::types::OrderStatus::Filled
        } else {
            crate::types::OrderStatus::PartiallyFilled
        };

        if remaining_after > 0 {
            if let Some(level) = self.side_map_mut(side).get_mut(&price) {
                level.total_qty -= qty;
            }
            return false;
        }
        self.remove_node(node_id);
        true
    }

    /// Sums resting quantity on `side` at prices acceptable to a taker with
    /// `limit` (`None` meaning no limit, i.e. a market order), stopping as
    /// soon as `needed` is reached. Single pass, early-exit.
    pub fn sufficient_liquidity(&self, side: Side, limit: Option<Price>, needed: Quantity) -> bool {
        let mut sum: Quantity = 0;
        let levels: Box<dyn Iterator<Item = &PriceLevel>> = match side {
            Side::Buy => Box::new(self.bids.values().rev()),
            Side::Sell => Box::new(self.asks.values()),
        };
        for level in levels {
            if let Some(limit) = limit {
                let acceptable = match side {
                    Side::Buy => level.price >= limit,
                    Side::Sell => level.price <= limit,
                };
                if !acceptable {
                    break;
                }
            }
            sum += level.total_qty;
            if sum >= needed {
                return true;
            }
        }
        false
    }
}
