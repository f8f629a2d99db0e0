//! Super-frame layout: geometry, the decoder contract implemented per
//! detector variant, and the bounds-checked buffer view.

pub mod decoder;
pub mod geometry;
pub mod view;

pub use decoder::{SplitCounterDecoder, SuperFrameDecoder};
pub use geometry::{BitDepth, FrameGeometry};
pub use view::SuperFrameView;
