// THEORY:
// A frame source hands the pipeline one 8-bit luma frame per tick, or
// nothing. The camera SDK never reaches the detector: each stream kind gets
// an adapter that turns its native format into a `GrayImage`.
//
// Key architectural principles:
// 1.  **Synchronous, non-blocking**: `next_frame` returns immediately. No
//     frame this tick is `None`, not an error.
// 2.  **One detector, many adapters**: color, infrared and depth differ only
//     in how a raw frame becomes luma; everything after that is shared.

use crate::core_modules::frame::Frame;

pub mod depth;
pub mod luma;
pub mod sequence;

pub use depth::{DepthBandSource, DepthEncoding, DepthProvider};
pub use luma::{ColorProvider, LumaSource};
pub use sequence::ImageSequenceSource;

pub trait FrameSource {
    /// Resolution of the frames this source produces.
    fn dimensions(&self) -> (u32, u32);

    /// The latest complete frame, or `None` when nothing new arrived this tick.
    fn next_frame(&mut self) -> Option<Frame>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn next_frame(&mut self) -> Option<Frame> {
        (**self).next_frame()
    }
}
