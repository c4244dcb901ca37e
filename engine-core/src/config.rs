//! Engine configuration, loaded by the host application and validated once
//! at startup. No file or CLI parsing lives in this crate; callers deserialize
//! an `EngineConfig` with whatever `serde` front end suits them (`serde_json`,
//! `toml`, environment variables) and pass the resulting value in.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the ring buffer, event batcher, and durability policy.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EngineConfig {
    /// Ring buffer slot count. Must be a power of two.
    pub ring_buffer_size: usize,
    /// Maximum spins a producer attempts before returning `BufferFull`,
    /// roughly 10,000 iterations (~100us) by default.
    pub claim_spin_limit: u32,
    /// Path to the append-only event log file.
    pub event_log_path: PathBuf,
    /// `true` to `fsync` after every flush; `false` for best-effort durability
    /// (flush to the OS buffer only, relying on process exit or the next
    /// flush to persist).
    pub event_log_sync_mode: bool,
    /// Number of events the batcher accumulates before an unconditional flush.
    pub batch_size: usize,
    /// Maximum time an event waits in the batcher before a flush is forced,
    /// even if `batch_size` has not been reached.
    pub flush_interval_ms: u64,
    /// Capacity of the bounded channel handing events from the processor to
    /// the batcher. Once full, the processor drops new events with a warning
    /// rather than blocking on log I/O.
    pub event_queue_capacity: usize,
    /// How long `Engine::shutdown` waits for the processor and batcher
    /// threads to drain before giving up and returning `ShutdownTimeout`.
    pub shutdown_timeout_ms: u64,
    /// Symbols to register before the processor begins consuming commands.
    pub symbols: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            ring_buffer_size: 8192,
            claim_spin_limit: 10_000,
            event_log_path: PathBuf::from("engine.log"),
            event_log_sync_mode: true,
            batch_size: 1000,
            flush_interval_ms: 10,
            event_queue_capacity: 65_536,
            shutdown_timeout_ms: 5_000,
            symbols: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// The configured flush interval as a `Duration`, for the batcher.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// The configured shutdown deadline as a `Duration`.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Validates invariants that the rest of the engine assumes hold: a
    /// power-of-two ring buffer size, and nonzero batch parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ring_buffer_size == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !self.ring_buffer_size.is_power_of_two() {
            return Err(ConfigError::CapacityNotPowerOfTwo(self.ring_buffer_size));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.event_log_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyLogPath);
        }
        if self.event_queue_capacity == 0 {
            return Err(ConfigError::ZeroEventQueueCapacity);
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(ConfigError::ZeroShutdownTimeout);
        }
        Ok(())
    }
}
