//! Ring channels: named, lock-free FIFOs ferrying buffer-slot pointers
//! between worker cores.

pub mod channel;
pub mod naming;
pub mod registry;

pub use channel::{RingChannel, SlotPtr};
pub use naming::{clear_ring_name, ring_name};
pub use registry::RingRegistry;
