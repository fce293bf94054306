// THEORY:
// Frames are plain `image` buffers. A captured frame is an 8-bit `GrayImage`;
// the circular buffer stores the same samples widened to f32 so that summing
// N of them can neither wrap nor saturate. Masks are `GrayImage`s holding
// only 0 and 255.

use image::{GrayImage, ImageBuffer, Luma};

/// One captured frame: a single 8-bit channel.
pub type Frame = GrayImage;

/// A frame widened to f32 for accumulation.
pub type AccumFrame = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Value of a foreground pixel in a mask.
pub const FOREGROUND: u8 = 255;

pub fn to_accum(frame: &Frame) -> AccumFrame {
    let (width, height) = frame.dimensions();
    let data = frame.as_raw().iter().map(|&v| v as f32).collect();
    // Same length as the source buffer, so from_raw cannot fail.
    AccumFrame::from_raw(width, height, data).unwrap_or_else(|| AccumFrame::new(width, height))
}

/// Converts back to 8 bits, rounding to nearest and saturating at 0 and 255.
pub fn quantize(accum: &AccumFrame) -> Frame {
    let (width, height) = accum.dimensions();
    let data = accum
        .as_raw()
        .iter()
        .map(|&v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    Frame::from_raw(width, height, data).unwrap_or_else(|| Frame::new(width, height))
}

/// A frame filled with a single value.
pub fn uniform(width: u32, height: u32, value: u8) -> Frame {
    Frame::from_pixel(width, height, Luma([value]))
}
