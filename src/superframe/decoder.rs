//! Protocol decoder contract: geometry plus super-frame buffer navigation

use crate::error::{Result, SeuratError};

use super::{
    geometry::{BitDepth, FrameGeometry},
    view::SuperFrameView,
};

/// Capability interface a detector variant implements to describe its
/// super-frames.
///
/// Worker cores hold the decoder behind an `Arc` and consult it for static
/// geometry and for reading/writing the handful of header fields the data
/// path needs. Nothing here parses packets; that happens upstream.
pub trait SuperFrameDecoder: Send + Sync {
    /// Static geometry of every super-frame this decoder produces
    fn geometry(&self) -> &FrameGeometry;

    /// Read the super-frame sequence number
    fn sequence_number(&self, view: &SuperFrameView) -> Result<u64>;

    /// Write the super-frame sequence number
    fn set_sequence_number(&self, view: &mut SuperFrameView, sequence: u64) -> Result<()>;

    /// Read the stored image byte size
    fn image_size(&self, view: &SuperFrameView) -> Result<u64>;

    /// Write the stored image byte size
    fn set_image_size(&self, view: &mut SuperFrameView, size: u64) -> Result<()>;

    /// Byte offset of the first raw pixel within a slot
    fn raw_data_offset(&self) -> usize {
        self.geometry().raw_data_offset()
    }

    /// Byte offset of the built region within a slot
    fn built_data_offset(&self) -> usize {
        self.geometry().built_data_offset()
    }
}

/// Decoder for detectors whose ASICs report a split coarse/fine pixel sample,
/// with the coarse and overflow channels one sampling period behind the fine
/// channel.
///
/// Super-frame header layout: sequence number at byte 0, stored image size at
/// byte 8, both little-endian u64; the remainder of the header is reserved by
/// the packet layer.
#[derive(Debug, Clone)]
pub struct SplitCounterDecoder {
    geometry: FrameGeometry,
}

impl SplitCounterDecoder {
    /// Header offset of the sequence number field
    pub const SEQUENCE_OFFSET: usize = 0;
    /// Header offset of the stored image size field
    pub const IMAGE_SIZE_OFFSET: usize = 8;

    /// Create a decoder over validated geometry.
    ///
    /// Split-counter samples are 16-bit; any other depth is a configuration
    /// error.
    pub fn new(geometry: FrameGeometry) -> Result<Self> {
        geometry.validate()?;
        if geometry.bit_depth != BitDepth::Depth16 {
            return Err(SeuratError::configuration(
                "Split-counter reconstruction requires 16-bit samples",
            ));
        }
        Ok(Self { geometry })
    }
}

impl SuperFrameDecoder for SplitCounterDecoder {
    fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    fn sequence_number(&self, view: &SuperFrameView) -> Result<u64> {
        view.read_u64(Self::SEQUENCE_OFFSET)
    }

    fn set_sequence_number(&self, view: &mut SuperFrameView, sequence: u64) -> Result<()> {
        view.write_u64(Self::SEQUENCE_OFFSET, sequence)
    }

    fn image_size(&self, view: &SuperFrameView) -> Result<u64> {
        view.read_u64(Self::IMAGE_SIZE_OFFSET)
    }

    fn set_image_size(&self, view: &mut SuperFrameView, size: u64) -> Result<()> {
        view.write_u64(Self::IMAGE_SIZE_OFFSET, size)
    }
}

#[cfg(test)]
mod tests {
    use std::ptr::NonNull;

    use super::*;

    fn test_geometry() -> FrameGeometry {
        FrameGeometry {
            x_resolution: 4,
            y_resolution: 4,
            bit_depth: BitDepth::Depth16,
            subframe_count: 2,
            superframe_header_size: 32,
            subframe_header_size: 8,
        }
    }

    #[test]
    fn test_header_round_trip() {
        let decoder = SplitCounterDecoder::new(test_geometry()).unwrap();
        let mut data = vec![0u8; decoder.geometry().total_buffer_size()];
        let slot = NonNull::new(data.as_mut_ptr()).unwrap();
        let mut view = unsafe { SuperFrameView::from_slot(slot, data.len()) };

        decoder.set_sequence_number(&mut view, 9001).unwrap();
        decoder.set_image_size(&mut view, 64).unwrap();
        assert_eq!(decoder.sequence_number(&view).unwrap(), 9001);
        assert_eq!(decoder.image_size(&view).unwrap(), 64);
    }

    #[test]
    fn test_rejects_non_16bit_geometry() {
        let mut geometry = test_geometry();
        geometry.bit_depth = BitDepth::Depth8;
        assert!(SplitCounterDecoder::new(geometry).is_err());
    }

    #[test]
    fn test_region_offsets_disjoint() {
        let decoder = SplitCounterDecoder::new(test_geometry()).unwrap();
        let raw = decoder.raw_data_offset();
        let built = decoder.built_data_offset();
        assert_eq!(built - raw, decoder.geometry().raw_data_size());
    }
}
