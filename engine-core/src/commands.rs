//! The command and response types that cross the ring buffer boundary
//! between producer threads and the processor.

use crossbeam::channel;

use crate::error::CancelError;
use crate::types::{Fill, Order, OrderId, Quantity, RejectReason, Symbol};

/// A request submitted through the ring buffer.
pub enum Command {
    NewOrder(Order),
    Cancel { symbol: Symbol, order_id: OrderId },
}

/// The outcome of processing a `Command::NewOrder`.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    /// False only when the order failed pre-matching validation and never
    /// touched the book (`UnknownSymbol`, `BadQuantity`, `BadPrice`).
    pub accepted: bool,
    pub order: Order,
    pub fills: Vec<Fill>,
    pub resting_qty: Quantity,
    pub reject_reason: Option<RejectReason>,
}

/// A resting order removed from the book by a successful cancel.
#[derive(Clone, Debug)]
pub struct CancelOutcome {
    pub order: Order,
    pub cancelled_qty: Quantity,
}

/// The outcome of processing a `Command::Cancel`.
#[derive(Clone, Debug)]
pub enum CancelResult {
    Cancelled(CancelOutcome),
    NotFound,
    UnknownSymbol,
}

impl From<Result<CancelOutcome, CancelError>> for CancelResult {
    fn from(result: Result<CancelOutcome, CancelError>) -> Self {
        match result {
            Ok(outcome) => CancelResult::Cancelled(outcome),
            Err(CancelError::NotFound) => CancelResult::NotFound,
            Err(CancelError::UnknownSymbol) => CancelResult::UnknownSymbol,
        }
    }
}

/// The processor's reply to a single command, delivered over a
/// single-slot channel back to the producer that submitted it.
#[derive(Clone, Debug)]
pub enum CommandResult {
    Execution(ExecutionResult),
    Cancel(CancelResult),
}

pub type ResponseSender = channel::Sender<CommandResult>;
pub type ResponseReceiver = channel::Receiver<CommandResult>;

/// A bounded, single-slot channel for delivering one command's result back
/// to its producer. A producer that stops polling (or never polls) simply
/// never observes the reply; the processor's `try_send` never blocks on it.
pub fn response_channel() -> (ResponseSender, ResponseReceiver) {
    channel::bounded(1)
}
