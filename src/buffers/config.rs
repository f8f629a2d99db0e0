//! Super-frame pool configuration

/// Configuration for a super-frame buffer pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperFramePoolConfig {
    /// Name of the pool
    pub name: String,
    /// Size of each super-frame slot in bytes
    pub buffer_size: usize,
    /// Number of slots in the pool
    pub num_buffers: usize,
    /// Alignment requirement for each slot
    pub alignment: usize,
    /// Back the pool with huge pages (Linux only)
    pub huge_pages: bool,
    /// Pin the pool into physical memory with mlock
    pub lock_memory: bool,
}

impl Default for SuperFramePoolConfig {
    fn default() -> Self {
        Self {
            name: "superframes".to_string(),
            buffer_size: 1 << 20,
            num_buffers: 64,
            alignment: 64,
            huge_pages: false,
            lock_memory: false,
        }
    }
}

impl SuperFramePoolConfig {
    /// Create a new configuration with a custom name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set slot size
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set slot count
    pub fn with_num_buffers(mut self, count: usize) -> Self {
        self.num_buffers = count;
        self
    }

    /// Set slot alignment
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Enable or disable huge page backing
    pub fn with_huge_pages(mut self, enable: bool) -> Self {
        self.huge_pages = enable;
        self
    }

    /// Enable or disable mlock pinning
    pub fn with_lock_memory(mut self, enable: bool) -> Self {
        self.lock_memory = enable;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SeuratError;

        if self.buffer_size == 0 {
            return Err(SeuratError::invalid_parameter(
                "buffer_size",
                "Slot size cannot be zero",
            ));
        }

        if self.num_buffers == 0 {
            return Err(SeuratError::invalid_parameter(
                "num_buffers",
                "Pool must contain at least one slot",
            ));
        }

        if !self.alignment.is_power_of_two() {
            return Err(SeuratError::invalid_parameter(
                "alignment",
                "Alignment must be a power of two",
            ));
        }

        Ok(())
    }

    /// Distance between consecutive slots: the slot size rounded up to the
    /// configured alignment.
    pub fn slot_stride(&self) -> usize {
        (self.buffer_size + self.alignment - 1) & !(self.alignment - 1)
    }

    /// Total memory required for the pool
    pub fn total_memory_required(&self) -> usize {
        self.slot_stride() * self.num_buffers
    }
}
