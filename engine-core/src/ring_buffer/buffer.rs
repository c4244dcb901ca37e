//! The slot array itself: a fixed-size, power-of-two ring of cache-padded
//! slots shared between producer threads and a single consumer.
//!
//! Producers claim a slot by winning a CAS on a shared cursor, write their
//! value, then publish by storing the claimed sequence into the slot with
//! `Release` ordering. The consumer spins on an `Acquire` load of that same
//! field until it matches the sequence it expects next, then takes ownership
//! of the value and advances a gating sequence so the slot can be reclaimed.

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

struct Slot<T> {
    /// Sequence number last published into this slot, or 0 if never written.
    published_sequence: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Slot {
            published_sequence: AtomicU64::new(0),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// A lock-free, bounded single-consumer ring buffer.
///
/// `claim`/`publish` may be called from any number of producer threads
/// concurrently. `try_consume`/`release` must be called from a single
/// consumer thread; calling them from more than one thread is undefined
/// behavior because nothing here arbitrates between consumers.
pub struct RingBuffer<T> {
    slots: Box<[CachePadded<Slot<T>>]>,
    mask: u64,
    capacity: u64,
    cursor: CachePadded<AtomicU64>,
    gating: CachePadded<AtomicU64>,
}

// SAFETY: each live sequence number maps to exactly one slot index modulo
// `capacity`, and the claim/gating protocol ensures a producer never writes
// a slot the consumer hasn't finished reading from its previous lap, and the
// consumer never reads a slot before its publishing producer's `Release`
// store is visible. `T: Send` is sufficient because no two threads ever
// observe the same slot's value concurrently.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Creates a buffer with `capacity` slots. Panics if `capacity` is zero
    /// or not a power of two; callers are expected to validate configuration
    /// before construction (see `EngineConfig::validate`).
    pub fn new(capacity: usize) -> Self {
        Self::new_resuming_at(capacity, 1)
    }

    /// Creates a buffer with `capacity` slots whose first claimed sequence is
    /// `start_sequence` rather than 1. Used when resuming a processor after
    /// crash recovery, so newly claimed sequences continue the numbering a
    /// recovered event log left off at instead of restarting from 1.
    ///
    /// Panics if `capacity` is zero, not a power of two, or `start_sequence`
    /// is zero.
    pub fn new_resuming_at(capacity: usize, start_sequence: u64) -> Self {
        assert!(capacity > 0 && capacity.is_power_of_two());
        assert!(start_sequence > 0);
        let slots = (0..capacity)
            .map(|_| CachePadded::new(Slot::empty()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let baseline = start_sequence - 1;
        RingBuffer {
            slots,
            mask: (capacity - 1) as u64,
            capacity: capacity as u64,
            cursor: CachePadded::new(AtomicU64::new(baseline)),
            gating: CachePadded::new(AtomicU64::new(baseline)),
        }
    }

    #[inline]
    fn index_of(&self, sequence: u64) -> usize {
        ((sequence - 1) & self.mask) as usize
    }

    /// Claims the next sequence number for a producer. Returns `None` once
    /// `spin_limit` unsuccessful attempts have been made, which happens only
    /// when the consumer has fallen `capacity` slots behind.
    pub fn claim(&self, spin_limit: u32) -> Option<u64> {
        let mut spins = 0u32;
        loop {
            let current = self.cursor.load(Ordering::Relaxed);
            let next = current + 1;
            let gate = self.gating.load(Ordering::Acquire);
            if next > gate + self.capacity {
                spins += 1;
                if spins >= spin_limit {
                    return None;
                }
                std::hint::spin_loop();
                continue;
            }
            if self
                .cursor
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Some(next);
            }
        }
    }

    /// Writes `value` into the slot claimed for `sequence` and publishes it.
    ///
    /// # Safety
    /// `sequence` must have been returned by a prior call to `claim` on this
    /// buffer, and must not have been published already.
    pub unsafe fn publish(&self, sequence: u64, value: T) {
        let slot = &self.slots[self.index_of(sequence)];
        unsafe {
            (*slot.value.get()).write(value);
        }
        slot.published_sequence.store(sequence, Ordering::Release);
    }

    /// Returns the value published at `sequence` if it has been published,
    /// taking ownership of it and leaving the slot ready for the next lap's
    /// writer. Must only be called by the single consumer, and at most once
    /// per sequence number.
    pub fn try_take(&self, sequence: u64) -> Option<T> {
        let slot = &self.slots[self.index_of(sequence)];
        if slot.published_sequence.load(Ordering::Acquire) != sequence {
            return None;
        }
        // SAFETY: publish happened-before this load observed `sequence`, and
        // the single-consumer contract guarantees no one else reads this slot.
        let value = unsafe { (*slot.value.get()).assume_init_read() };
        Some(value)
    }

    /// Advances the gating sequence to `sequence`, making the slot available
    /// for producers to reclaim. Must be called after `try_take` returns the
    /// value for that same sequence, and only by the single consumer.
    pub fn release(&self, sequence: u64) {
        self.gating.store(sequence, Ordering::Release);
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        // Any slot published but not yet taken holds a live `T` that must be
        // dropped explicitly, since `MaybeUninit` never drops on its own.
        let gate = *self.gating.get_mut();
        let cursor = *self.cursor.get_mut();
        let mut sequence = gate + 1;
        while sequence <= cursor {
            let slot = &mut self.slots[self.index_of(sequence)];
            if *slot.published_sequence.get_mut() == sequence {
                unsafe {
                    (*slot.value.get()).assume_init_drop();
                }
            }
            sequence += 1;
        }
    }
}
