//! Lock-free MPSC ring buffer: the engine's sole entry point for commands.
//!
//! Producers (any number of caller threads) claim and publish slots without
//! ever blocking on each other beyond a bounded CAS retry; the single
//! consumer (the matching engine's processor thread) drains them strictly in
//! claim order.

mod buffer;
mod sequencer;

pub use buffer::RingBuffer;
pub use sequencer::{Consumer, Producer};
