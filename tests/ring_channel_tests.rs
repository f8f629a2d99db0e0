//! Tests for ring channels and the ring registry

use std::{collections::HashSet, ptr::NonNull, sync::Arc, thread};

use seurat::{clear_ring_name, ring_name, RingChannel, RingRegistry, SlotPtr};

fn fake_slot(token: usize) -> SlotPtr {
    // Opaque pointer value, never dereferenced
    NonNull::new((token * 64) as *mut u8).unwrap()
}

#[test]
fn test_capacity_rounds_up_to_power_of_two() {
    let ring = RingChannel::new("cap", 100).unwrap();
    assert_eq!(ring.capacity(), 128);
    assert_eq!(ring.count(), 0);
}

#[test]
fn test_fifo_hand_off() {
    let ring = RingChannel::new("fifo", 8).unwrap();
    for i in 1..=6 {
        ring.try_enqueue(fake_slot(i)).unwrap();
    }
    assert_eq!(ring.count(), 6);

    for i in 1..=6 {
        assert_eq!(ring.try_dequeue().unwrap(), fake_slot(i));
    }
    assert!(ring.try_dequeue().is_none());
}

#[test]
fn test_full_ring_reports_full() {
    let ring = RingChannel::new("full", 4).unwrap();
    for i in 1..=4 {
        ring.try_enqueue(fake_slot(i)).unwrap();
    }
    assert!(ring.is_full());
    assert!(ring.try_enqueue(fake_slot(99)).is_err());

    assert_eq!(ring.try_dequeue().unwrap(), fake_slot(1));
    ring.try_enqueue(fake_slot(99)).unwrap();
}

#[test]
fn test_registry_creation_is_idempotent_by_name() {
    let registry = RingRegistry::new();
    let first = registry.create_or_lookup("frame_ready", 64).unwrap();
    let second = registry.create_or_lookup("frame_ready", 1024).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    // Second capacity request was ignored
    assert_eq!(second.capacity(), 64);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_lookup_of_missing_ring_fails() {
    let registry = RingRegistry::new();
    assert!(registry.lookup("missing").is_none());
    assert!(registry.require("missing").is_err());
}

#[test]
fn test_ring_names_are_deterministic() {
    // Independently-constructed cores must derive identical names
    assert_eq!(
        ring_name("frame_builder", 0, 1),
        ring_name("frame_builder", 0, 1)
    );
    assert_ne!(ring_name("frame_builder", 0, 1), ring_name("frame_builder", 0, 2));
    assert_ne!(ring_name("frame_builder", 0, 1), ring_name("frame_builder", 1, 1));
    assert_eq!(clear_ring_name(2), clear_ring_name(2));
}

#[test]
fn test_mpmc_transfers_every_pointer_exactly_once() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: usize = 1_000;

    let ring = Arc::new(RingChannel::new("stress", 64).unwrap());
    let mut producers = Vec::new();
    for p in 0..PRODUCERS {
        let ring = Arc::clone(&ring);
        producers.push(thread::spawn(move || {
            for i in 0..PER_PRODUCER {
                let token = p * PER_PRODUCER + i + 1;
                loop {
                    if ring.try_enqueue(fake_slot(token)).is_ok() {
                        break;
                    }
                    std::hint::spin_loop();
                }
            }
        }));
    }

    let mut consumers = Vec::new();
    for _ in 0..CONSUMERS {
        let ring = Arc::clone(&ring);
        consumers.push(thread::spawn(move || {
            let mut seen = Vec::new();
            while seen.len() < PRODUCERS * PER_PRODUCER / CONSUMERS {
                if let Some(slot) = ring.try_dequeue() {
                    seen.push(slot.as_ptr() as usize / 64);
                } else {
                    std::hint::spin_loop();
                }
            }
            seen
        }));
    }

    for producer in producers {
        producer.join().unwrap();
    }

    let mut all = HashSet::new();
    for consumer in consumers {
        for token in consumer.join().unwrap() {
            // No pointer may be delivered twice
            assert!(all.insert(token));
        }
    }
    assert_eq!(all.len(), PRODUCERS * PER_PRODUCER);
    assert!(ring.is_empty());
}
