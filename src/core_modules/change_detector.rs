// THEORY:
// The `ChangeDetector` is the stage that decides which pixels are "not
// background". It is stateless between ticks: given the background estimate
// and the current frame it produces a fresh binary mask.
//
// Key architectural principles:
// 1.  **Directional by default**: `background - current` with unsigned
//     saturation. An object on the floor occludes the background and shows up
//     darker (or nearer, for depth encodings that brighten near samples less),
//     so only that direction counts. `DiffMode::Absolute` is available when
//     both directions matter.
// 2.  **Binary | auto threshold**: a fixed level, replaced by Otsu's level
//     computed on the difference image when `auto_threshold` is on.
// 3.  **Ordered cleanup**: the morphological steps run in the configured
//     order; the default erode, dilate, dilate sets the blob sizes the area
//     filter downstream is tuned against.

use crate::config::{DetectorConfig, DiffMode, MorphStep};
use crate::core_modules::frame::Frame;
use crate::core_modules::morphology;
use crate::core_modules::threshold::{binarize, otsu_level};
use crate::error::{DetectorError, Result};

#[derive(Debug, Clone)]
pub struct ChangeDetector {
    diff_mode: DiffMode,
    threshold: u8,
    auto_threshold: bool,
    kernel_size: u32,
    morphology: Vec<MorphStep>,
}

/// What one detection pass produced.
#[derive(Debug, Clone)]
pub struct ChangeMask {
    pub mask: Frame,
    /// The binarization level that was applied.
    pub level: u8,
}

impl ChangeDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            diff_mode: config.diff_mode,
            threshold: config.threshold,
            auto_threshold: config.auto_threshold,
            kernel_size: config.kernel_size,
            morphology: config.morphology.clone(),
        }
    }

    pub fn difference(&self, background: &Frame, current: &Frame) -> Result<Frame> {
        difference(background, current, self.diff_mode)
    }

    pub fn detect(&self, background: &Frame, current: &Frame) -> Result<ChangeMask> {
        let mut diff = self.difference(background, current)?;
        let level = if self.auto_threshold {
            otsu_level(&diff)
        } else {
            self.threshold
        };
        binarize(&mut diff, level);
        let mask = morphology::clean(diff, self.kernel_size, &self.morphology);
        Ok(ChangeMask { mask, level })
    }
}

/// Per-pixel difference of `background` and `current`.
pub fn difference(background: &Frame, current: &Frame, mode: DiffMode) -> Result<Frame> {
    if background.dimensions() != current.dimensions() {
        return Err(DetectorError::DimensionMismatch {
            expected: background.dimensions(),
            actual: current.dimensions(),
        });
    }
    let (width, height) = background.dimensions();
    let data = background
        .as_raw()
        .iter()
        .zip(current.as_raw())
        .map(|(&bg, &cur)| match mode {
            DiffMode::Subtract => bg.saturating_sub(cur),
            DiffMode::Absolute => bg.abs_diff(cur),
        })
        .collect();
    Frame::from_raw(width, height, data).ok_or(DetectorError::EmptyFrame)
}
