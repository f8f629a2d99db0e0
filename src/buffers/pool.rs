//! Fixed-capacity super-frame buffer pool over one shared mapping

use std::ptr::NonNull;

use log::{info, warn};
use memmap2::{MmapMut, MmapOptions};

use crate::{
    error::{Result, SeuratError},
    rings::{RingChannel, SlotPtr},
};

use super::config::SuperFramePoolConfig;

/// A pool of fixed-size super-frame slots carved from a single anonymous
/// mapping, allocated once and recycled through ring channels thereafter.
///
/// The pool never allocates or frees slots during steady-state operation;
/// slot ownership moves between rings and cores, and fully consumed slots
/// come back through the clear-buffers ring.
#[derive(Debug)]
pub struct SuperFramePool {
    /// Configuration
    config: SuperFramePoolConfig,
    /// Base address of the mapping
    base: NonNull<u8>,
    /// Distance between consecutive slots
    stride: usize,
    /// Backing mapping, kept alive for the pool's lifetime
    _mmap: MmapMut,
}

impl SuperFramePool {
    /// Create a new pool.
    ///
    /// Memory is mapped anonymously, optionally backed by huge pages and
    /// pinned with mlock. A failed mlock is downgraded to a warning so the
    /// pool stays usable under a restrictive RLIMIT_MEMLOCK.
    pub fn new(config: SuperFramePoolConfig) -> Result<Self> {
        config.validate()?;

        let stride = config.slot_stride();
        let total = config.total_memory_required();

        let mut options = MmapOptions::new();
        options.len(total);
        #[cfg(target_os = "linux")]
        if config.huge_pages {
            options.huge(None);
        }

        let mut mmap = options
            .map_anon()
            .map_err(|e| SeuratError::from_io(e, "Failed to map super-frame pool"))?;

        if config.lock_memory {
            if let Err(e) = mmap.lock() {
                warn!("Failed to mlock pool {}: {}", config.name, e);
            }
        }

        let base = NonNull::new(mmap.as_mut_ptr())
            .ok_or_else(|| SeuratError::memory("Pool mapping returned a null base address"))?;

        info!(
            "Created super-frame pool {} with {} slots of {} bytes ({} bytes total)",
            config.name, config.num_buffers, config.buffer_size, total
        );

        Ok(Self {
            config,
            base,
            stride,
            _mmap: mmap,
        })
    }

    /// Get the pool name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the number of slots
    pub fn num_buffers(&self) -> usize {
        self.config.num_buffers
    }

    /// Get the usable size of each slot in bytes
    pub fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    /// Get the distance between consecutive slots
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Get the total mapped size
    pub fn total_size(&self) -> usize {
        self.stride * self.config.num_buffers
    }

    /// Get the pointer to slot `index`
    pub fn slot(&self, index: usize) -> Result<SlotPtr> {
        if index >= self.config.num_buffers {
            return Err(SeuratError::invalid_parameter(
                "index",
                format!(
                    "Slot index {} out of range for pool of {}",
                    index, self.config.num_buffers
                ),
            ));
        }

        // In range by the check above
        let ptr = unsafe { self.base.as_ptr().add(index * self.stride) };
        NonNull::new(ptr).ok_or_else(|| SeuratError::memory("Slot address overflowed"))
    }

    /// Check whether a pointer is the base address of one of this pool's slots
    pub fn contains(&self, ptr: SlotPtr) -> bool {
        let addr = ptr.as_ptr() as usize;
        let base = self.base.as_ptr() as usize;
        addr >= base && addr < base + self.total_size() && (addr - base) % self.stride == 0
    }

    /// Enqueue every slot into `ring`, typically the clear-buffers ring that
    /// the upstream packet layer draws empty buffers from.
    ///
    /// Returns the number of slots seeded.
    pub fn seed_ring(&self, ring: &RingChannel) -> Result<usize> {
        for index in 0..self.config.num_buffers {
            ring.try_enqueue(self.slot(index)?)?;
        }
        info!(
            "Seeded {} slots from pool {} into ring {}",
            self.config.num_buffers,
            self.config.name,
            ring.name()
        );
        Ok(self.config.num_buffers)
    }
}

// Slots are handed out as raw pointers whose exclusive ownership is tracked
// by the ring hand-off protocol; the pool itself is only read after creation
unsafe impl Send for SuperFramePool {}
unsafe impl Sync for SuperFramePool {}
