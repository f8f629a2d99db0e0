//! Zero-copy frame views handed to the downstream processing chain, with
//! single-owner buffer-release semantics.

pub mod metadata;
pub mod shared_frame;

pub use metadata::{Compression, FrameMetadata};
pub use shared_frame::{FrameCallback, FrameHandle, SharedBufferFrame};
