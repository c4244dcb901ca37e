//! The single consumer loop: drains commands from the ring buffer in strict
//! sequence order, drives the matching engine, ships events to the batcher,
//! and replies to whichever producer submitted each command.
//!
//! A panic while handling one command is caught and turned into a rejected
//! result for that command only; the loop itself keeps running, matching the
//! guarantee that one bad order cannot take down the consumer thread.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::TrySendError;
use tracing::{error, info, warn};

use crate::commands::{CancelOutcome, CancelResult, Command, CommandResult, ExecutionResult};
use crate::events::{BatcherHandle, Event, EventBody};
use crate::matching::MatchingEngine;
use crate::ring_buffer::Consumer;
use crate::types::{OrderId, OrderStatus, RejectReason, SequenceNum, TradeId};

/// Converts the outcome of a `NewOrder` command into the events it produces,
/// in the order they should appear in the log.
pub fn execution_result_events(sequence_num: SequenceNum, result: &ExecutionResult) -> Vec<Event> {
    let mut events = Vec::with_capacity(result.fills.len() + 2);
    events.push(Event::new(sequence_num, EventBody::NewOrder(result.order.clone())));

    if !result.accepted {
        let reason = result.reject_reason.unwrap_or(RejectReason::UnknownSymbol);
        events.push(Event::new(
            sequence_num,
            EventBody::OrderRejected {
                order_id: result.order.id,
                symbol: result.order.symbol.clone(),
                reason,
            },
        ));
        return events;
    }

    events.push(Event::new(
        sequence_num,
        EventBody::OrderAccepted {
            order_id: result.order.id,
            symbol: result.order.symbol.clone(),
        },
    ));

    for fill in &result.fills {
        events.push(Event::new(sequence_num, EventBody::Fill(fill.clone())));
    }

    if result.order.status == OrderStatus::Cancelled {
        events.push(Event::new(
            sequence_num,
            EventBody::OrderCancelled {
                order_id: result.order.id,
                symbol: result.order.symbol.clone(),
                cancelled_qty: result.order.remaining_qty(),
            },
        ));
    }

    events
}

/// Converts the outcome of a `Cancel` command into the events it produces.
pub fn cancel_result_events(
    sequence_num: SequenceNum,
    symbol: &str,
    order_id: u64,
    result: &CancelResult,
) -> Vec<Event> {
    let mut events = vec![Event::new(
        sequence_num,
        EventBody::CancelOrder { symbol: symbol.to_string(), order_id },
    )];
    if let CancelResult::Cancelled(CancelOutcome { order, cancelled_qty }) = result {
        events.push(Event::new(
            sequence_num,
            EventBody::OrderCancelled {
                order_id: order.id,
                symbol: order.symbol.clone(),
                cancelled_qty: *cancelled_qty,
            },
        ));
    }
    events
}

type Slot = (Command, crate::commands::ResponseSender);

/// Drives the matching engine from a ring buffer until told to shut down.
pub struct Processor {
    engine: MatchingEngine,
    consumer: Consumer<Slot>,
    batcher: BatcherHandle,
    shutdown: Arc<AtomicBool>,
}

impl Processor {
    pub fn new(
        engine: MatchingEngine,
        consumer: Consumer<Slot>,
        batcher: BatcherHandle,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Processor { engine, consumer, batcher, shutdown }
    }

    /// Runs until the shutdown flag is observed with no further commands
    /// pending, draining whatever remains in the buffer first.
    pub fn run(mut self) {
        loop {
            match self.consumer.wait_next() {
                Some((sequence_num, (command, response))) => {
                    self.handle_one(sequence_num, command, response);
                }
                None => {
                    if self.shutdown.load(Ordering::Acquire) {
                        info!("processor shutting down, no further commands pending");
                        break;
                    }
                }
            }
        }
    }

    fn handle_one(
        &mut self,
        sequence_num: SequenceNum,
        command: Command,
        response: crate::commands::ResponseSender,
    ) {
        let engine = &mut self.engine;
        let outcome = catch_unwind(AssertUnwindSafe(|| Self::dispatch(engine, sequence_num, command)));

        let (result, events) = match outcome {
            Ok(pair) => pair,
            Err(_panic) => {
                error!(sequence_num, "panic while handling command, converting to rejection");
                (CommandResult::Execution(panicked_rejection(sequence_num)), Vec::new())
            }
        };

        for event in events {
            match self.batcher.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(sequence_num, "event queue full, dropping event");
                }
                Err(TrySendError::Disconnected(_)) => {
                    warn!(sequence_num, "event batcher channel closed, dropping event");
                }
            }
        }

        let _ = response.try_send(result);
    }

    fn dispatch(engine: &mut MatchingEngine, sequence_num: SequenceNum, command: Command) -> (CommandResult, Vec<Event>) {
        match command {
            Command::NewOrder(order) => {
                let result = engine.process_order(order, sequence_num);
                let events = execution_result_events(sequence_num, &result);
                (CommandResult::Execution(result), events)
            }
            Command::Cancel { symbol, order_id } => {
                let outcome = engine.cancel_order(&symbol, order_id);
                let result: CancelResult = outcome.into();
                let events = cancel_result_events(sequence_num, &symbol, order_id, &result);
                (CommandResult::Cancel(result), events)
            }
        }
    }
}

fn panicked_rejection(sequence_num: SequenceNum) -> ExecutionResult {
    use crate::types::Order;
    let mut order = Order::new_request("", 0, crate::types::Side::Buy, crate::types::OrderType::Limit, 0, 0, None);
    order.sequence_num = sequence_num;
    order.status = OrderStatus::Rejected;
    ExecutionResult {
        accepted: false,
        order,
        fills: Vec::new(),
        resting_qty: 0,
        reject_reason: Some(RejectReason::BadQuantity),
    }
}

/// Replays a previously-recorded command stream against a fresh engine,
/// reproducing identical book state and, modulo timestamps already fixed in
/// the logged orders, an identical event stream. Only `NewOrder` and
/// `CancelOrder` bodies drive replay; the rest are derived output and are
/// skipped.
///
/// Replayed orders carry their original, already-assigned ids, so
/// `process_order`'s id-assignment path never runs for them and
/// `next_order_id`/`next_trade_id` would otherwise be left at their fresh
/// defaults. This restores both counters to one past the highest id replay
/// observed, so the first command accepted after replay cannot collide with
/// an id the log already used.
pub fn replay_events(engine: &mut MatchingEngine, log_events: &[Event]) -> Vec<Event> {
    let mut regenerated = Vec::new();
    let mut max_order_id: OrderId = 0;
    let mut max_trade_id: TradeId = 0;
    for event in log_events {
        match &event.body {
            EventBody::NewOrder(order) => {
                let result = engine.process_order(order.clone(), event.sequence_num);
                max_order_id = max_order_id.max(result.order.id);
                max_trade_id = result.fills.iter().fold(max_trade_id, |m, f| m.max(f.trade_id));
                regenerated.extend(execution_result_events(event.sequence_num, &result));
            }
            EventBody::CancelOrder { symbol, order_id } => {
                let outcome = engine.cancel_order(symbol, *order_id);
                let result: CancelResult = outcome.into();
                regenerated.extend(cancel_result_events(event.sequence_num, symbol, *order_id, &result));
            }
            _ => {}
        }
    }
    engine.ensure_next_order_id_at_least(max_order_id + 1);
    engine.ensure_next_trade_id_at_least(max_trade_id + 1);
    regenerated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Order, OrderType, Side};

    fn limit(side: Side, price: i64, qty: i64) -> Order {
        Order::new_request("X", 1, side, OrderType::Limit, price, qty, None)
    }

    #[test]
    fn replay_reproduces_book_state() {
        let mut original = MatchingEngine::new();
        original.add_symbol("X");
        let r1 = original.process_order(limit(Side::Sell, 100, 10), 1);
        let r2 = original.process_order(limit(Side::Buy, 100, 4), 2);

        let mut log = Vec::new();
        log.extend(execution_result_events(1, &r1));
        log.extend(execution_result_events(2, &r2));

        let mut replayed = MatchingEngine::new();
        replayed.add_symbol("X");
        replay_events(&mut replayed, &log);

        assert_eq!(
            original.book("X").unwrap().best_ask(),
            replayed.book("X").unwrap().best_ask()
        );
        assert_eq!(
            original.book("X").unwrap().depth(Side::Sell, 1),
            replayed.book("X").unwrap().depth(Side::Sell, 1)
        );
    }

    #[test]
    fn execution_result_events_order_new_order_first() {
        let mut engine = MatchingEngine::new();
        engine.add_symbol("X");
        let result = engine.process_order(limit(Side::Buy, 100, 10), 1);
        let events = execution_result_events(1, &result);
        assert!(matches!(events[0].body, EventBody::NewOrder(_)));
        assert!(matches!(events[1].body, EventBody::OrderAccepted { .. }));
    }
}
