//! Producer and consumer handles layered over the raw `RingBuffer`.
//!
//! `Producer` bundles claim+publish into a single fallible submission.
//! `Consumer` bundles the spin-wait for the next sequence with taking the
//! value and advancing the gating sequence, and exposes a bounded wait so the
//! processor loop can check a shutdown flag between spins instead of blocking
//! forever.

use crate::error::EngineError;
use crate::ring_buffer::buffer::RingBuffer;
use std::sync::Arc;

/// A cloneable handle producers use to submit values into the ring buffer.
#[derive(Clone)]
pub struct Producer<T> {
    buffer: Arc<RingBuffer<T>>,
    spin_limit: u32,
}

impl<T> Producer<T> {
    pub fn new(buffer: Arc<RingBuffer<T>>, spin_limit: u32) -> Self {
        Producer { buffer, spin_limit }
    }

    /// Claims a slot and publishes `value` into it. Returns the sequence
    /// number assigned, or `EngineError::BufferFull` if no slot became free
    /// within the configured spin budget.
    pub fn submit(&self, value: T) -> Result<u64, EngineError> {
        let sequence = self
            .buffer
            .claim(self.spin_limit)
            .ok_or(EngineError::BufferFull)?;
        // SAFETY: `sequence` was just returned by `claim` on this buffer and
        // has not been published before.
        unsafe { self.buffer.publish(sequence, value) };
        Ok(sequence)
    }
}

/// The single handle that consumes values in sequence order. Owning this
/// type is itself the contract that only one thread drives consumption;
/// `RingBuffer::try_take`/`release` are unsound if called concurrently.
pub struct Consumer<T> {
    buffer: Arc<RingBuffer<T>>,
    next_expected: u64,
    spin_limit_per_wait: u32,
}

impl<T> Consumer<T> {
    pub fn new(buffer: Arc<RingBuffer<T>>, spin_limit_per_wait: u32) -> Self {
        Self::new_at(buffer, spin_limit_per_wait, 1)
    }

    /// Creates a consumer that expects `next_expected` as its first sequence
    /// number rather than 1. `buffer` must have been constructed with a
    /// matching starting sequence (see `RingBuffer::new_resuming_at`).
    pub fn new_at(buffer: Arc<RingBuffer<T>>, spin_limit_per_wait: u32, next_expected: u64) -> Self {
        Consumer {
            buffer,
            next_expected,
            spin_limit_per_wait,
        }
    }

    /// The next sequence number this consumer expects to take.
    pub fn next_sequence(&self) -> u64 {
        self.next_expected
    }

    /// Spins for up to the configured budget waiting for the next value in
    /// sequence order. Returns `None` on timeout (the caller should check a
    /// shutdown flag and call again), `Some((sequence, value))` once taken.
    ///
    /// Taking the value also advances the gating sequence, reclaiming the
    /// slot for producers immediately rather than deferring `release`.
    pub fn wait_next(&mut self) -> Option<(u64, T)> {
        let expected = self.next_expected;
        let mut spins = 0u32;
        loop {
            if let Some(value) = self.buffer.try_take(expected) {
                self.buffer.release(expected);
                self.next_expected += 1;
                return Some((expected, value));
            }
            spins += 1;
            if spins >= self.spin_limit_per_wait {
                return None;
            }
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_and_consumer_agree_on_sequence() {
        let buffer = Arc::new(RingBuffer::new(4));
        let producer = Producer::new(Arc::clone(&buffer), 100);
        let mut consumer = Consumer::new(buffer, 10);

        assert_eq!(producer.submit("a").unwrap(), 1);
        assert_eq!(producer.submit("b").unwrap(), 2);

        let (seq, value) = consumer.wait_next().expect("first value");
        assert_eq!(seq, 1);
        assert_eq!(value, "a");

        let (seq, value) = consumer.wait_next().expect("second value");
        assert_eq!(seq, 2);
        assert_eq!(value, "b");
    }

    #[test]
    fn wait_next_times_out_when_empty() {
        let buffer: Arc<RingBuffer<u32>> = Arc::new(RingBuffer::new(4));
        let mut consumer = Consumer::new(buffer, 5);
        assert_eq!(consumer.wait_next(), None);
    }

    #[test]
    fn released_slots_are_reusable_by_producer() {
        let buffer = Arc::new(RingBuffer::new(2));
        let producer = Producer::new(Arc::clone(&buffer), 50);
        let mut consumer = Consumer::new(buffer, 50);

        producer.submit(1u32).unwrap();
        producer.submit(2u32).unwrap();
        assert!(producer.submit(3u32).is_err());

        consumer.wait_next().unwrap();
        assert_eq!(producer.submit(3u32).unwrap(), 3);
    }

    #[test]
    fn resuming_consumer_and_producer_agree_on_the_restarted_sequence() {
        let buffer = Arc::new(RingBuffer::new_resuming_at(4, 50));
        let producer = Producer::new(Arc::clone(&buffer), 10);
        let mut consumer = Consumer::new_at(buffer, 10, 50);

        assert_eq!(producer.submit("a").unwrap(), 50);
        let (seq, value) = consumer.wait_next().expect("first value");
        assert_eq!(seq, 50);
        assert_eq!(value, "a");
        assert_eq!(consumer.next_sequence(), 51);
    }
}
