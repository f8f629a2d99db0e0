//! Super-frame geometry: resolutions, bit depth and region layout

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeuratError};

/// Element bit depth of a pixel sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitDepth {
    Depth8,
    Depth16,
    Depth32,
}

impl BitDepth {
    /// Size of one pixel sample in bytes
    pub fn byte_size(&self) -> usize {
        match self {
            BitDepth::Depth8 => 1,
            BitDepth::Depth16 => 2,
            BitDepth::Depth32 => 4,
        }
    }
}

/// Static geometry of a super-frame buffer.
///
/// Layout of one slot:
///
/// ```text
/// ┌──────────────┬────────────────┬──────────────────┬──────────────────┐
/// │ super-frame  │ N sub-frame    │ N raw sub-frame  │ built (rebuilt)  │
/// │ header       │ headers        │ pixel payloads   │ pixel region     │
/// └──────────────┴────────────────┴──────────────────┴──────────────────┘
/// ```
///
/// All offsets and sizes are derived from this record; nothing else in the
/// crate does offset arithmetic from first principles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    /// Pixels per row
    pub x_resolution: usize,
    /// Pixels per column
    pub y_resolution: usize,
    /// Element bit depth
    pub bit_depth: BitDepth,
    /// Number of sub-frames per super-frame
    pub subframe_count: usize,
    /// Size of the super-frame header in bytes
    pub superframe_header_size: usize,
    /// Size of each sub-frame header in bytes
    pub subframe_header_size: usize,
}

impl FrameGeometry {
    /// Minimum super-frame header size: sequence number and stored image size
    pub const MIN_SUPERFRAME_HEADER: usize = 16;

    /// Pixels in a single sub-frame
    pub fn pixels_per_subframe(&self) -> usize {
        self.x_resolution * self.y_resolution
    }

    /// Raw payload bytes of a single sub-frame
    pub fn subframe_data_size(&self) -> usize {
        self.pixels_per_subframe() * self.bit_depth.byte_size()
    }

    /// Total raw pixel bytes in a super-frame
    pub fn raw_data_size(&self) -> usize {
        self.subframe_data_size() * self.subframe_count
    }

    /// Total built pixel bytes in a super-frame, one reconstructed sample per
    /// raw sample
    pub fn built_data_size(&self) -> usize {
        self.raw_data_size()
    }

    /// Byte offset of the first raw pixel, past the super-frame header and
    /// the block of sub-frame headers
    pub fn raw_data_offset(&self) -> usize {
        self.superframe_header_size + self.subframe_count * self.subframe_header_size
    }

    /// Byte offset of the built region, past the raw pixel payloads
    pub fn built_data_offset(&self) -> usize {
        self.raw_data_offset() + self.raw_data_size()
    }

    /// Total buffer size one slot must provide
    pub fn total_buffer_size(&self) -> usize {
        self.built_data_offset() + self.built_data_size()
    }

    /// Image dimensions as [x, y]
    pub fn dimensions(&self) -> [usize; 2] {
        [self.x_resolution, self.y_resolution]
    }

    /// Validate the geometry.
    ///
    /// Degenerate geometry is a construction-time configuration error; the
    /// per-frame data path never re-validates.
    pub fn validate(&self) -> Result<()> {
        if self.pixels_per_subframe() == 0 {
            return Err(SeuratError::configuration(format!(
                "Frame resolution {}x{} has no pixels",
                self.x_resolution, self.y_resolution
            )));
        }

        if self.subframe_count == 0 {
            return Err(SeuratError::configuration(
                "Super-frame must contain at least one sub-frame",
            ));
        }

        if self.superframe_header_size < Self::MIN_SUPERFRAME_HEADER {
            return Err(SeuratError::configuration(format!(
                "Super-frame header of {} bytes cannot hold sequence number and image size",
                self.superframe_header_size
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> FrameGeometry {
        FrameGeometry {
            x_resolution: 16,
            y_resolution: 16,
            bit_depth: BitDepth::Depth16,
            subframe_count: 10,
            superframe_header_size: 64,
            subframe_header_size: 8,
        }
    }

    #[test]
    fn test_derived_sizes() {
        let g = geometry();
        assert_eq!(g.pixels_per_subframe(), 256);
        assert_eq!(g.subframe_data_size(), 512);
        assert_eq!(g.raw_data_size(), 5120);
        assert_eq!(g.raw_data_offset(), 64 + 80);
        assert_eq!(g.built_data_offset(), 144 + 5120);
        assert_eq!(g.total_buffer_size(), 144 + 5120 + 5120);
    }

    #[test]
    fn test_validate_degenerate() {
        let mut g = geometry();
        g.x_resolution = 0;
        assert!(g.validate().is_err());

        let mut g = geometry();
        g.subframe_count = 0;
        assert!(g.validate().is_err());

        let mut g = geometry();
        g.superframe_header_size = 8;
        assert!(g.validate().is_err());

        assert!(geometry().validate().is_ok());
    }
}
