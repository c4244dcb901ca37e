//! The event types written to the append-only log. Every event carries the
//! global sequence number it was produced at; nothing else in this crate
//! reorders them once assigned.

use serde::{Deserialize, Serialize};

use crate::types::{Fill, Order, OrderId, Quantity, RejectReason, SequenceNum, Symbol};

/// The external type tag stored in each record's header, redundant with but
/// independent of `EventBody`'s own internal encoding — it lets a reader
/// dispatch on the tag alone without fully decoding the payload first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    NewOrder = 1,
    CancelOrder = 2,
    OrderAccepted = 3,
    OrderRejected = 4,
    Fill = 5,
    OrderCancelled = 6,
}

impl EventKind {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(EventKind::NewOrder),
            2 => Some(EventKind::CancelOrder),
            3 => Some(EventKind::OrderAccepted),
            4 => Some(EventKind::OrderRejected),
            5 => Some(EventKind::Fill),
            6 => Some(EventKind::OrderCancelled),
            _ => None,
        }
    }
}

/// The variant-specific payload of a log record; see `Event` for the
/// sequence number that accompanies every instance.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum EventBody {
    /// The raw incoming order, as submitted, before matching. Sufficient by
    /// itself to replay the command stream deterministically.
    NewOrder(Order),
    CancelOrder { symbol: Symbol, order_id: OrderId },
    OrderAccepted { order_id: OrderId, symbol: Symbol },
    OrderRejected { order_id: OrderId, symbol: Symbol, reason: RejectReason },
    Fill(Fill),
    OrderCancelled { order_id: OrderId, symbol: Symbol, cancelled_qty: Quantity },
}

impl EventBody {
    pub fn kind(&self) -> EventKind {
        match self {
            EventBody::NewOrder(_) => EventKind::NewOrder,
            EventBody::CancelOrder { .. } => EventKind::CancelOrder,
            EventBody::OrderAccepted { .. } => EventKind::OrderAccepted,
            EventBody::OrderRejected { .. } => EventKind::OrderRejected,
            EventBody::Fill(_) => EventKind::Fill,
            EventBody::OrderCancelled { .. } => EventKind::OrderCancelled,
        }
    }
}

/// A single record in the event log: a sequence number and its payload.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Event {
    pub sequence_num: SequenceNum,
    pub body: EventBody,
}

impl Event {
    pub fn new(sequence_num: SequenceNum, body: EventBody) -> Self {
        Event { sequence_num, body }
    }

    pub fn kind(&self) -> EventKind {
        self.body.kind()
    }
}
