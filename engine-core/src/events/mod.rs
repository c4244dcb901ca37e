//! The durable event trail: record types, the append-only log with crash
//! recovery, and the batching writer thread.

mod batcher;
mod log;
mod types;

pub use batcher::{BatcherHandle, EventBatcher};
pub use log::{recover, EventLog, RecoveredLog};
pub use types::{Event, EventBody, EventKind};
