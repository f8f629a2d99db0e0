//! Zero-copy frame views over shared super-frame buffers

use std::{slice, sync::Arc};

use log::error;

use crate::{
    error::{Result, SeuratError},
    rings::{RingChannel, SlotPtr},
};

use super::metadata::FrameMetadata;

/// Reference-counted handle to a frame view, the unit the downstream chain
/// consumes
pub type FrameHandle = Arc<SharedBufferFrame>;

/// Downstream dispatch callback.
///
/// Invoked synchronously on the wrapper core's thread, at most twice per
/// processed buffer (raw view first, then built view); the call does not
/// return until the downstream chain has consumed or queued the view.
pub type FrameCallback = Arc<dyn Fn(FrameHandle) + Send + Sync>;

/// A zero-copy frame view over one dataset of a shared super-frame buffer.
///
/// At most one of the views outstanding over a given buffer owns the release
/// obligation (holds the clear-buffers ring); the others are non-owning
/// aliases valid only while the owning view is alive. When the owning view is
/// dropped the buffer slot is returned to the clear ring exactly once, making
/// it eligible for reuse by the upstream packet layer.
pub struct SharedBufferFrame {
    /// Frame metadata
    meta: FrameMetadata,
    /// Underlying buffer slot
    buffer: SlotPtr,
    /// Total slot size in bytes
    buffer_size: usize,
    /// Byte offset of this dataset within the slot
    data_offset: usize,
    /// Ring the slot is returned to on release; `None` for non-owning views
    release_ring: Option<Arc<RingChannel>>,
}

impl SharedBufferFrame {
    /// Create a frame view over a dataset of a super-frame buffer.
    ///
    /// # Safety
    /// The caller must guarantee that `buffer` points to at least
    /// `buffer_size` valid bytes that stay mapped for the lifetime of the
    /// view, and that release ownership over the slot is granted to at most
    /// one view.
    pub unsafe fn from_slot(
        meta: FrameMetadata,
        buffer: SlotPtr,
        buffer_size: usize,
        data_offset: usize,
        release_ring: Option<Arc<RingChannel>>,
    ) -> Result<Self> {
        if data_offset + meta.image_size > buffer_size {
            return Err(SeuratError::insufficient_space(
                data_offset + meta.image_size,
                buffer_size,
            ));
        }

        Ok(Self {
            meta,
            buffer,
            buffer_size,
            data_offset,
            release_ring,
        })
    }

    /// Get the frame metadata
    pub fn meta(&self) -> &FrameMetadata {
        &self.meta
    }

    /// Get the underlying buffer slot pointer
    pub fn buffer(&self) -> SlotPtr {
        self.buffer
    }

    /// Get the total size of the underlying slot
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Whether this view carries the buffer-release obligation
    pub fn owns_release(&self) -> bool {
        self.release_ring.is_some()
    }

    /// Ring the buffer will be returned to, if this is the owning view
    pub fn release_ring(&self) -> Option<&Arc<RingChannel>> {
        self.release_ring.as_ref()
    }

    /// Borrow the dataset payload
    pub fn data(&self) -> &[u8] {
        unsafe {
            slice::from_raw_parts(
                self.buffer.as_ptr().add(self.data_offset),
                self.meta.image_size,
            )
        }
    }

    /// Borrow the dataset payload as 16-bit pixel samples
    pub fn pixels(&self) -> Result<&[u16]> {
        let address = self.buffer.as_ptr() as usize + self.data_offset;
        if address % std::mem::align_of::<u16>() != 0 {
            return Err(SeuratError::alignment(address, std::mem::align_of::<u16>()));
        }
        Ok(unsafe {
            slice::from_raw_parts(
                self.buffer.as_ptr().add(self.data_offset) as *const u16,
                self.meta.image_size / 2,
            )
        })
    }
}

impl Drop for SharedBufferFrame {
    fn drop(&mut self) {
        if let Some(ring) = self.release_ring.take() {
            // Rings are sized to the pool, so this cannot fill up; a failure
            // here leaks the slot
            if let Err(e) = ring.try_enqueue(self.buffer) {
                error!(
                    "Failed to release buffer for frame {} of {}: {}",
                    self.meta.frame_number, self.meta.dataset_name, e
                );
            }
        }
    }
}

impl std::fmt::Debug for SharedBufferFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBufferFrame")
            .field("meta", &self.meta)
            .field("buffer_size", &self.buffer_size)
            .field("data_offset", &self.data_offset)
            .field("owns_release", &self.owns_release())
            .finish()
    }
}

// The view only reads its dataset region; exclusive write access ended when
// the wrapper dispatched the views
unsafe impl Send for SharedBufferFrame {}
unsafe impl Sync for SharedBufferFrame {}

#[cfg(test)]
mod tests {
    use std::ptr::NonNull;

    use super::*;

    #[test]
    fn test_view_over_backing() {
        let mut backing = vec![0u8; 128];
        backing[64] = 0xAB;
        let slot = NonNull::new(backing.as_mut_ptr()).unwrap();

        let meta = FrameMetadata::new("raw", 1).with_image_size(32);
        let frame = unsafe { SharedBufferFrame::from_slot(meta, slot, 128, 64, None) }.unwrap();

        assert!(!frame.owns_release());
        assert_eq!(frame.data().len(), 32);
        assert_eq!(frame.data()[0], 0xAB);
    }

    #[test]
    fn test_dataset_must_fit_in_slot() {
        let mut backing = vec![0u8; 64];
        let slot = NonNull::new(backing.as_mut_ptr()).unwrap();

        let meta = FrameMetadata::new("built", 1).with_image_size(60);
        let result = unsafe { SharedBufferFrame::from_slot(meta, slot, 64, 8, None) };
        assert!(result.is_err());
    }

    #[test]
    fn test_owning_view_releases_once() {
        let ring = Arc::new(RingChannel::new("clear", 4).unwrap());
        let mut backing = vec![0u8; 64];
        let slot = NonNull::new(backing.as_mut_ptr()).unwrap();

        let meta = FrameMetadata::new("built", 1).with_image_size(16);
        let frame = unsafe {
            SharedBufferFrame::from_slot(meta, slot, 64, 0, Some(Arc::clone(&ring)))
        }
        .unwrap();

        assert!(frame.owns_release());
        assert_eq!(ring.count(), 0);
        drop(frame);
        assert_eq!(ring.count(), 1);
        assert_eq!(ring.try_dequeue().unwrap(), slot);
        assert!(ring.try_dequeue().is_none());
    }
}
