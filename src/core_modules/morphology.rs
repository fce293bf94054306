// THEORY:
// Binary cleanup with a square, all-ones structuring element anchored at its
// center. Erosion removes specks smaller than the kernel; dilation grows what
// survived. A square kernel of side `k` is the L-infinity ball of radius
// `k / 2`, which is what `imageproc`'s distance-transform morphology takes.
//
// Pixels outside the frame take no part: they neither erode a blob touching
// the border nor dilate into it.

use crate::config::MorphStep;
use crate::core_modules::frame::Frame;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Largest kernel side the radius can express.
pub const MAX_KERNEL_SIZE: u32 = 2 * u8::MAX as u32 + 1;

fn radius(kernel_size: u32) -> u8 {
    (kernel_size / 2).min(u8::MAX as u32) as u8
}

pub fn erode(image: &Frame, kernel_size: u32) -> Frame {
    morphology::erode(image, Norm::LInf, radius(kernel_size))
}

pub fn dilate(image: &Frame, kernel_size: u32) -> Frame {
    morphology::dilate(image, Norm::LInf, radius(kernel_size))
}

/// Runs `steps` in order.
pub fn clean(image: Frame, kernel_size: u32, steps: &[MorphStep]) -> Frame {
    steps.iter().fold(image, |current, step| match step {
        MorphStep::Erode => erode(&current, kernel_size),
        MorphStep::Dilate => dilate(&current, kernel_size),
    })
}
