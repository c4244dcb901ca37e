//! The event batcher: a second thread that owns the event log file and
//! decouples log I/O latency from the matching loop. The processor hands
//! events to it over a bounded channel and never waits on disk; if the
//! channel fills up (the batcher has fallen behind on I/O), the processor
//! drops new events with a warning rather than blocking.

use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use tracing::error;

use crate::error::LogError;
use crate::events::log::EventLog;
use crate::events::types::Event;

/// Sending half used by the processor to hand off events for durable
/// logging. Cloning is cheap; every clone shares the same underlying queue.
pub type BatcherHandle = Sender<Event>;

/// Runs on its own thread, accumulating events until `batch_size` is reached
/// or `flush_interval` elapses since the oldest unflushed event arrived,
/// whichever comes first.
pub struct EventBatcher {
    receiver: Receiver<Event>,
    log: EventLog,
    batch_size: usize,
    flush_interval: Duration,
    buffer: Vec<Event>,
}

impl EventBatcher {
    pub fn new(receiver: Receiver<Event>, log: EventLog, batch_size: usize, flush_interval: Duration) -> Self {
        EventBatcher {
            receiver,
            log,
            batch_size,
            flush_interval,
            buffer: Vec::with_capacity(batch_size),
        }
    }

    /// Drains the channel, flushing on size or time triggers, until the
    /// channel is disconnected (every `BatcherHandle` dropped). Flushes any
    /// remaining buffered events before returning.
    ///
    /// Mid-run flush failures are logged and the batcher keeps going, since a
    /// transient write error shouldn't take down durability for every event
    /// after it. The final flush on disconnect is different: its result is
    /// returned so `Engine::shutdown` can surface a failed close as a fatal
    /// error rather than a log line nobody reads.
    pub fn run(mut self) -> Result<(), LogError> {
        let mut deadline: Option<Instant> = None;
        loop {
            let timeout = match deadline {
                Some(d) => d.saturating_duration_since(Instant::now()),
                None => self.flush_interval,
            };
            match self.receiver.recv_timeout(timeout) {
                Ok(event) => {
                    if self.buffer.is_empty() {
                        deadline = Some(Instant::now() + self.flush_interval);
                    }
                    self.buffer.push(event);
                    if self.buffer.len() >= self.batch_size {
                        if let Err(err) = self.flush_buffer() {
                            error!(error = %err, "failed to flush event log");
                        }
                        deadline = None;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if !self.buffer.is_empty() {
                        if let Err(err) = self.flush_buffer() {
                            error!(error = %err, "failed to flush event log");
                        }
                    }
                    deadline = None;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let result = if !self.buffer.is_empty() { self.flush_buffer() } else { Ok(()) };
                    if let Err(ref err) = result {
                        error!(error = %err, "failed to flush event log during shutdown");
                    }
                    return result;
                }
            }
        }
    }

    fn flush_buffer(&mut self) -> Result<(), LogError> {
        let result = self.log.write_batch(&self.buffer).and_then(|()| self.log.flush());
        self.buffer.clear();
        result
    }
}
