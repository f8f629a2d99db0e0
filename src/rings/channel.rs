//! Lock-free multi-producer multi-consumer ring channel for buffer hand-off

use std::{
    cell::UnsafeCell,
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::error::{Result, SeuratError};

/// Opaque pointer to a super-frame buffer slot, the only payload rings carry.
///
/// Ownership convention: at any instant exactly one ring or one core holds a
/// given slot pointer. Enqueueing transfers ownership to the ring; a
/// successful dequeue transfers it to the caller.
pub type SlotPtr = NonNull<u8>;

/// One ring entry: a lap sequence guarding a slot-pointer value.
///
/// The sequence encodes readiness: `seq == pos` means free for the producer
/// claiming position `pos`, `seq == pos + 1` means the value is published for
/// the consumer claiming `pos`.
struct RingSlot {
    sequence: AtomicUsize,
    value: UnsafeCell<usize>,
}

/// Named, fixed-capacity, lock-free MPMC FIFO of buffer-slot pointers.
///
/// The basic inter-core transport primitive: producers reserve a position
/// with a CAS on the enqueue cursor, then publish through the per-slot
/// sequence; consumers mirror the protocol on the dequeue cursor. No
/// operation blocks.
#[derive(Debug)]
pub struct RingChannel {
    /// Channel name, fixed at creation
    name: String,
    /// Slot storage, length is a power of two
    slots: Box<[RingSlot]>,
    /// Mask for fast modulo
    mask: usize,
    /// Producer cursor
    enqueue_pos: AtomicUsize,
    /// Consumer cursor
    dequeue_pos: AtomicUsize,
}

impl std::fmt::Debug for RingSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingSlot")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish()
    }
}

impl RingChannel {
    /// Create a new ring channel.
    ///
    /// The requested capacity is rounded up to the next power of two.
    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SeuratError::invalid_parameter(
                "capacity",
                "Ring capacity must be greater than 0",
            ));
        }

        let capacity = capacity.next_power_of_two();
        let slots = (0..capacity)
            .map(|i| RingSlot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(0),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            name: name.into(),
            slots,
            mask: capacity - 1,
            enqueue_pos: AtomicUsize::new(0),
            dequeue_pos: AtomicUsize::new(0),
        })
    }

    /// Get the channel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the channel capacity (always a power of two)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Get the current number of enqueued slot pointers.
    ///
    /// Approximate under concurrent access; exact when the channel is quiescent.
    pub fn count(&self) -> usize {
        let enqueue = self.enqueue_pos.load(Ordering::Acquire);
        let dequeue = self.dequeue_pos.load(Ordering::Acquire);
        enqueue.wrapping_sub(dequeue).min(self.capacity())
    }

    /// Check if the channel is empty
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Check if the channel is full
    pub fn is_full(&self) -> bool {
        self.count() == self.capacity()
    }

    /// Try to enqueue a slot pointer, transferring ownership to the channel.
    pub fn try_enqueue(&self, slot: SlotPtr) -> Result<()> {
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);
        loop {
            let entry = &self.slots[pos & self.mask];
            let seq = entry.sequence.load(Ordering::Acquire);
            let dif = seq as isize - pos as isize;

            if dif == 0 {
                // Slot free for this lap, try to claim the position
                match self.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe {
                            *entry.value.get() = slot.as_ptr() as usize;
                        }
                        entry.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if dif < 0 {
                // Consumer has not freed this slot yet, one full lap behind
                return Err(SeuratError::ring_full(&self.name));
            } else {
                // Another producer claimed this position, reload
                pos = self.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Try to dequeue a slot pointer, transferring ownership to the caller.
    ///
    /// Returns `None` when the channel is empty; this is normal back-pressure,
    /// not an error.
    pub fn try_dequeue(&self) -> Option<SlotPtr> {
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);
        loop {
            let entry = &self.slots[pos & self.mask];
            let seq = entry.sequence.load(Ordering::Acquire);
            let dif = seq as isize - pos.wrapping_add(1) as isize;

            if dif == 0 {
                match self.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let raw = unsafe { *entry.value.get() };
                        // Free the slot for the producer one lap ahead
                        entry
                            .sequence
                            .store(pos.wrapping_add(self.mask + 1), Ordering::Release);
                        return NonNull::new(raw as *mut u8);
                    }
                    Err(current) => pos = current,
                }
            } else if dif < 0 {
                return None;
            } else {
                pos = self.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }
}

// The per-slot sequence protocol orders every access to `value`
unsafe impl Send for RingChannel {}
unsafe impl Sync for RingChannel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_slot(token: usize) -> SlotPtr {
        // Opaque, never dereferenced
        NonNull::new((token * 64) as *mut u8).unwrap()
    }

    #[test]
    fn test_capacity_rounded_to_power_of_two() {
        let ring = RingChannel::new("round", 100).unwrap();
        assert_eq!(ring.capacity(), 128);

        let exact = RingChannel::new("exact", 64).unwrap();
        assert_eq!(exact.capacity(), 64);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(RingChannel::new("zero", 0).is_err());
    }

    #[test]
    fn test_fifo_order() {
        let ring = RingChannel::new("fifo", 8).unwrap();
        for i in 1..=5 {
            ring.try_enqueue(fake_slot(i)).unwrap();
        }
        assert_eq!(ring.count(), 5);

        for i in 1..=5 {
            assert_eq!(ring.try_dequeue().unwrap(), fake_slot(i));
        }
        assert!(ring.try_dequeue().is_none());
        assert!(ring.is_empty());
    }

    #[test]
    fn test_full_ring_rejects_enqueue() {
        let ring = RingChannel::new("full", 4).unwrap();
        for i in 1..=4 {
            ring.try_enqueue(fake_slot(i)).unwrap();
        }
        assert!(ring.is_full());
        assert!(ring.try_enqueue(fake_slot(5)).is_err());

        // Draining one makes room again
        ring.try_dequeue().unwrap();
        ring.try_enqueue(fake_slot(5)).unwrap();
    }

    #[test]
    fn test_wraparound_reuse() {
        let ring = RingChannel::new("wrap", 2).unwrap();
        for lap in 0..100usize {
            ring.try_enqueue(fake_slot(lap + 1)).unwrap();
            assert_eq!(ring.try_dequeue().unwrap(), fake_slot(lap + 1));
        }
        assert!(ring.is_empty());
    }
}
