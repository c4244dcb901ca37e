//! Error types for the parts of the engine that can fail outside the normal
//! `ExecutionResult`/`CancelResult` data path: buffer admission, cancellation
//! lookups, the event log, and configuration.

use thiserror::Error;

/// Failures submitting a command into the ring buffer, or starting the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The ring buffer has no free slot within the producer's spin budget.
    #[error("ring buffer is full")]
    BufferFull,
    /// The processor thread has shut down; no further commands are accepted.
    #[error("engine has shut down")]
    ShuttingDown,
    /// Event log recovery found corruption it could not explain as a
    /// truncated trailing record (a checksum mismatch or sequence gap
    /// earlier in the file). Recovery aborts rather than starting from a
    /// partially-rebuilt book.
    #[error("event log recovery failed: {0}")]
    RecoveryFailed(#[from] crate::error::LogError),
    /// The processor or batcher thread did not exit within the shutdown
    /// deadline.
    #[error("shutdown did not complete within the deadline")]
    ShutdownTimeout,
    /// The batcher's final flush on shutdown failed; events accepted before
    /// the failure may not be durable.
    #[error("event log flush failed during shutdown: {0}")]
    ShutdownFlushFailed(crate::error::LogError),
}

/// Failures cancelling an order.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum CancelError {
    /// Symbol is not registered with the engine.
    #[error("unknown symbol")]
    UnknownSymbol,
    /// Order id is not currently resting (never existed, already filled,
    /// already cancelled, or belongs to a different symbol).
    #[error("order not found")]
    NotFound,
}

/// Failures reading, writing, or recovering the append-only event log.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode event record: {0}")]
    Encode(#[from] bincode::Error),
    /// A checksum mismatch that is not explainable as a truncated trailing
    /// record; recovery aborts rather than silently dropping data.
    #[error("checksum mismatch at byte offset {offset}")]
    ChecksumMismatch { offset: u64 },
    /// A non-contiguous sequence number was found mid-log.
    #[error("sequence gap: expected {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },
}

/// Failures validating engine configuration.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("ring buffer capacity must be a power of two, got {0}")]
    CapacityNotPowerOfTwo(usize),
    #[error("ring buffer capacity must be nonzero")]
    ZeroCapacity,
    #[error("batch size must be nonzero")]
    ZeroBatchSize,
    #[error("log path must not be empty")]
    EmptyLogPath,
    #[error("event queue capacity must be nonzero")]
    ZeroEventQueueCapacity,
    #[error("shutdown timeout must be nonzero")]
    ZeroShutdownTimeout,
}
