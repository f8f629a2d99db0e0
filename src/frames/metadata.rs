//! Frame metadata attached to zero-copy frame views

use serde::{Deserialize, Serialize};

use crate::superframe::BitDepth;

/// Compression state of a frame's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    /// Payload is raw, uncompressed pixel data
    Uncompressed,
    /// Payload was compressed with the blosc codec
    Blosc,
}

/// Metadata describing one dataset exposed over a super-frame buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Dataset name, e.g. "raw" or "built"
    pub dataset_name: String,
    /// Super-frame sequence number
    pub frame_number: u64,
    /// Image dimensions as [x, y]
    pub dimensions: [usize; 2],
    /// Element bit depth
    pub bit_depth: BitDepth,
    /// Compression state of the payload
    pub compression: Compression,
    /// Image payload size in bytes
    pub image_size: usize,
    /// Number of sub-frames in the payload
    pub subframe_count: usize,
}

impl FrameMetadata {
    /// Create metadata for a dataset of one super-frame
    pub fn new(dataset_name: impl Into<String>, frame_number: u64) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            frame_number,
            dimensions: [0, 0],
            bit_depth: BitDepth::Depth16,
            compression: Compression::Uncompressed,
            image_size: 0,
            subframe_count: 0,
        }
    }

    /// Set image dimensions
    pub fn with_dimensions(mut self, dimensions: [usize; 2]) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set element bit depth
    pub fn with_bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    /// Set compression state
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set image payload size
    pub fn with_image_size(mut self, image_size: usize) -> Self {
        self.image_size = image_size;
        self
    }

    /// Set sub-frame count
    pub fn with_subframe_count(mut self, subframe_count: usize) -> Self {
        self.subframe_count = subframe_count;
        self
    }
}
