use crate::core_modules::frame::Frame;
use imageproc::contrast::{self, ThresholdType};

/// Otsu's level for an 8-bit image: the first level maximizing the
/// between-class variance of the populations `<= t` and `> t`. An image
/// with a single value yields 0.
pub fn otsu_level(image: &Frame) -> u8 {
    contrast::otsu_level(image)
}

/// Binarizes `image` in place: strictly above `level` becomes 255, everything else 0.
pub fn binarize(image: &mut Frame, level: u8) {
    contrast::threshold_mut(image, level, ThresholdType::Binary);
}
