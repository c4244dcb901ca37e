//! In-memory limit order matching engine.
//!
//! A single consumer thread owns every order book and drives matching
//! deterministically from a lock-free MPSC ring buffer; a second thread owns
//! the append-only event log and batches writes so log I/O never sits on the
//! matching hot path. See the modules below for the pieces: [`ring_buffer`]
//! is the queue, [`book`] and [`matching`] are the book and its matching
//! rules, [`events`] is the durable trail, and [`processor`] and [`Engine`]
//! wire them together.

mod book;
mod commands;
mod config;
mod error;
mod events;
mod matching;
mod processor;
mod ring_buffer;
mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use mimalloc::MiMalloc;
use tracing::{error, info};

#[global_allocator]
static GLOBAL_ALLOCATOR: MiMalloc = MiMalloc;

pub mod prelude {
    pub use crate::commands::{CancelOutcome, CancelResult, Command, CommandResult, ExecutionResult};
    pub use crate::config::EngineConfig;
    pub use crate::error::{CancelError, ConfigError, EngineError, LogError};
    pub use crate::events::{Event, EventBody, EventKind};
    pub use crate::matching::MatchingEngine;
    pub use crate::types::{
        current_timestamp_ns, AccountId, ClientOrderId, Fill, Order, OrderId, OrderStatus,
        OrderType, Price, Quantity, RejectReason, SequenceNum, Side, Symbol, Timestamp, TradeId,
        TradeRole,
    };
    pub use crate::{Engine, EngineHandle};
}

use crate::commands::{response_channel, Command, CommandResult};
use crate::config::EngineConfig;
use crate::error::{EngineError, LogError};
use crate::events::{recover, EventBatcher, EventLog};
use crate::matching::MatchingEngine;
use crate::processor::Processor;
use crate::ring_buffer::{Consumer, Producer, RingBuffer};
use crate::types::Order;

type Slot = (Command, crate::commands::ResponseSender);

/// A cloneable handle for submitting commands into a running `Engine`.
#[derive(Clone)]
pub struct EngineHandle {
    producer: Producer<Slot>,
}

impl EngineHandle {
    /// Submits a new order and blocks on the single-slot reply channel.
    /// Returns `EngineError::BufferFull` if the ring buffer has no free slot
    /// within the configured spin budget, without having enqueued anything.
    pub fn submit_order(&self, order: Order) -> Result<CommandResult, EngineError> {
        self.submit(Command::NewOrder(order))
    }

    /// Submits a cancel request for `order_id` on `symbol`.
    pub fn submit_cancel(&self, symbol: impl Into<String>, order_id: crate::types::OrderId) -> Result<CommandResult, EngineError> {
        self.submit(Command::Cancel { symbol: symbol.into(), order_id })
    }

    fn submit(&self, command: Command) -> Result<CommandResult, EngineError> {
        let (tx, rx) = response_channel();
        self.producer.submit((command, tx))?;
        rx.recv().map_err(|_| EngineError::ShuttingDown)
    }
}

/// A running matching engine: the ring buffer, the processor thread, and the
/// event batcher thread. Dropping or calling `shutdown` stops both threads
/// after draining whatever is already queued.
pub struct Engine {
    shutdown: Arc<AtomicBool>,
    shutdown_deadline: Duration,
    processor_thread: Option<JoinHandle<()>>,
    batcher_thread: Option<JoinHandle<Result<(), LogError>>>,
}

impl Engine {
    /// Starts a fresh engine with no recovered state. The symbols listed in
    /// `config.symbols` are registered before the processor begins consuming
    /// commands.
    pub fn start(config: EngineConfig) -> Result<(Engine, EngineHandle), EngineError> {
        Self::start_with_engine(config, MatchingEngine::new(), 1)
    }

    /// Starts an engine after recovering prior state from its event log,
    /// replaying the recovered command stream through a fresh matching
    /// engine before accepting new commands.
    ///
    /// A checksum mismatch or sequence gap earlier than the log's trailing
    /// record is not recoverable by truncation and aborts startup; a torn
    /// trailing record is handled internally by `recover` and never reaches
    /// here as an error.
    pub fn recover(config: EngineConfig) -> Result<(Engine, EngineHandle), EngineError> {
        let mut engine = MatchingEngine::new();
        for symbol in &config.symbols {
            engine.add_symbol(symbol.as_str());
        }
        // Symbols must exist before replay can rebuild their books.
        let recovered = recover(&config.event_log_path)?;
        info!(events = recovered.events.len(), "replaying recovered event log");
        crate::processor::replay_events(&mut engine, &recovered.events);
        Self::start_with_engine(config, engine, recovered.resume_sequence)
    }

    fn start_with_engine(
        config: EngineConfig,
        mut engine: MatchingEngine,
        resume_sequence: crate::types::SequenceNum,
    ) -> Result<(Engine, EngineHandle), EngineError> {
        for symbol in &config.symbols {
            engine.add_symbol(symbol.as_str());
        }

        // Seeding both ends at `resume_sequence` keeps newly claimed ring
        // buffer sequences, and therefore the sequence numbers appended to
        // the reopened log below, contiguous with whatever the recovered
        // log already holds. A fresh start passes `resume_sequence == 1`,
        // identical to the old unconditional behavior.
        let ring: Arc<RingBuffer<Slot>> =
            Arc::new(RingBuffer::new_resuming_at(config.ring_buffer_size, resume_sequence));
        let producer = Producer::new(Arc::clone(&ring), config.claim_spin_limit);
        let consumer = Consumer::new_at(ring, config.claim_spin_limit, resume_sequence);

        let log = EventLog::open_for_append(&config.event_log_path, config.event_log_sync_mode)?;
        let (batcher_tx, batcher_rx) = crossbeam::channel::bounded(config.event_queue_capacity);
        let batcher = EventBatcher::new(batcher_rx, log, config.batch_size, config.flush_interval());
        let batcher_thread = std::thread::Builder::new()
            .name("engine-event-batcher".into())
            .spawn(move || batcher.run())
            .expect("failed to spawn event batcher thread");

        let shutdown = Arc::new(AtomicBool::new(false));
        let processor = Processor::new(engine, consumer, batcher_tx, Arc::clone(&shutdown));
        let processor_thread = std::thread::Builder::new()
            .name("engine-processor".into())
            .spawn(move || processor.run())
            .expect("failed to spawn processor thread");

        Ok((
            Engine {
                shutdown,
                shutdown_deadline: config.shutdown_timeout(),
                processor_thread: Some(processor_thread),
                batcher_thread: Some(batcher_thread),
            },
            EngineHandle { producer },
        ))
    }

    /// Signals the processor to stop once its ring buffer is drained, then
    /// waits for both the processor and batcher threads to exit, each within
    /// the configured shutdown deadline.
    ///
    /// Returns `EngineError::ShutdownTimeout` if either thread fails to exit
    /// in time, or `EngineError::ShutdownFlushFailed` if the batcher's final
    /// flush of the event log failed — per the durability contract, a
    /// failed close is a fatal error, not a log line.
    pub fn shutdown(mut self) -> Result<(), EngineError> {
        self.shutdown.store(true, Ordering::Release);

        if let Some(handle) = self.processor_thread.take() {
            join_with_deadline(handle, self.shutdown_deadline)?;
        }
        // Dropping every `EngineHandle`'s producer (and the one the engine
        // itself never holds) closes the batcher channel once the processor
        // thread, its last sender, exits.
        if let Some(handle) = self.batcher_thread.take() {
            let flush_result = join_with_deadline(handle, self.shutdown_deadline)?;
            flush_result.map_err(EngineError::ShutdownFlushFailed)?;
        }
        Ok(())
    }
}

/// Joins `handle`, waiting no longer than `deadline`. The thread itself is
/// still joined on a helper thread if the deadline elapses first; a thread
/// that genuinely hangs past its deadline is a bug worth a timeout error, not
/// grounds for trying to forcibly kill it.
fn join_with_deadline<T: Send + 'static>(handle: JoinHandle<T>, deadline: Duration) -> Result<T, EngineError> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("engine-shutdown-watcher".into())
        .spawn(move || {
            let _ = tx.send(handle.join());
        })
        .expect("failed to spawn shutdown watcher thread");

    match rx.recv_timeout(deadline) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_panic)) => {
            error!("thread panicked during shutdown");
            Err(EngineError::ShuttingDown)
        }
        Err(_timeout) => Err(EngineError::ShutdownTimeout),
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.processor_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.batcher_thread.take() {
            match handle.join() {
                Ok(Err(err)) => error!(error = %err, "event log flush failed while dropping engine"),
                Ok(Ok(())) | Err(_) => {}
            }
        }
    }
}
