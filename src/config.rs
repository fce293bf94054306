// THEORY:
// Every tunable of the detector lives here, in one serde-backed struct that
// is fixed for a session. The installation ran three differently tuned copies
// of the same algorithm (color, depth, infrared); instead of three copies we
// keep one `DetectorConfig` and a preset per stream kind.

use crate::core_modules::morphology::MAX_KERNEL_SIZE;
use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which buffered frames feed the background average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AveragingWindow {
    /// Sum all N buffered frames and divide by N.
    #[default]
    Full,
    /// Sum the N-1 most recent frames and divide by N-1, skipping the oldest.
    /// This is how the installation averaged; kept for comparison.
    DropOldest,
}

impl AveragingWindow {
    /// Number of frames that contribute to the average for a buffer of `capacity`.
    pub fn frames(self, capacity: usize) -> usize {
        match self {
            AveragingWindow::Full => capacity,
            AveragingWindow::DropOldest => capacity.saturating_sub(1),
        }
    }
}

/// How the current frame is compared against the background estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffMode {
    /// `background - current`, clamped at zero. Only darker / nearer pixels register.
    #[default]
    Subtract,
    /// `|background - current|`.
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphStep {
    Erode,
    Dilate,
}

/// How a blob's area is measured before the area filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaMetric {
    /// Number of member pixels.
    #[default]
    PixelCount,
    /// Shoelace area of the simplified outer boundary.
    ContourPolygon,
}

/// The camera stream a detector is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Color,
    #[default]
    Depth,
    Infrared,
}

/// Configuration for a `TouchPipeline`. Static for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Number of frames kept in the circular buffer (N).
    pub buffer_capacity: usize,
    pub averaging_window: AveragingWindow,
    pub diff_mode: DiffMode,
    /// Fixed binarization level. Pixels strictly above it become foreground.
    pub threshold: u8,
    /// When set, the Otsu level of the difference image replaces `threshold`.
    pub auto_threshold: bool,
    /// Side of the square, all-ones structuring element. Must be odd.
    pub kernel_size: u32,
    /// Morphological steps applied in order after thresholding.
    pub morphology: Vec<MorphStep>,
    /// Blobs must be strictly larger than this.
    pub min_area: f64,
    /// Blobs must be strictly smaller than this, when `enforce_max_area` is set.
    pub max_area: f64,
    pub enforce_max_area: bool,
    pub area_metric: AreaMetric,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 10,
            averaging_window: AveragingWindow::default(),
            diff_mode: DiffMode::default(),
            threshold: 25,
            auto_threshold: true,
            kernel_size: 7,
            morphology: vec![MorphStep::Erode, MorphStep::Dilate, MorphStep::Dilate],
            min_area: 50.0,
            max_area: 20_000.0,
            enforce_max_area: false,
            area_metric: AreaMetric::default(),
        }
    }
}

impl DetectorConfig {
    /// The tuning each stream ran with in the installation. Areas are
    /// polygon areas of the simplified contour, as the installation measured them.
    pub fn preset(kind: StreamKind) -> Self {
        let base = Self {
            area_metric: AreaMetric::ContourPolygon,
            ..Self::default()
        };
        match kind {
            StreamKind::Color => Self {
                buffer_capacity: 5,
                threshold: 5,
                min_area: 4_000.0,
                ..base
            },
            // Departs from the installation, which subtracted one-sided: band-encoded
            // depth brightens where something enters the band.
            StreamKind::Depth => Self {
                buffer_capacity: 15,
                diff_mode: DiffMode::Absolute,
                min_area: 4_000.0,
                morphology: vec![
                    MorphStep::Erode,
                    MorphStep::Dilate,
                    MorphStep::Dilate,
                    MorphStep::Dilate,
                ],
                ..base
            },
            // The infrared view never binarized; any non-zero difference counts.
            StreamKind::Infrared => Self {
                buffer_capacity: 10,
                threshold: 0,
                auto_threshold: false,
                min_area: 50.0,
                max_area: 1_000.0,
                enforce_max_area: true,
                morphology: vec![
                    MorphStep::Erode,
                    MorphStep::Dilate,
                    MorphStep::Dilate,
                    MorphStep::Dilate,
                    MorphStep::Dilate,
                ],
                ..base
            },
        }
    }

    /// Number of frames that contribute to each background estimate.
    pub fn effective_window(&self) -> usize {
        self.averaging_window.frames(self.buffer_capacity)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(DetectorError::InvalidConfig(
                "buffer_capacity must be at least 1".into(),
            ));
        }
        if self.effective_window() == 0 {
            return Err(DetectorError::InvalidConfig(format!(
                "averaging window {:?} needs buffer_capacity >= 2",
                self.averaging_window
            )));
        }
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 || self.kernel_size > MAX_KERNEL_SIZE {
            return Err(DetectorError::InvalidConfig(format!(
                "kernel_size must be odd and at most {MAX_KERNEL_SIZE}, got {}",
                self.kernel_size
            )));
        }
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(DetectorError::InvalidConfig(format!(
                "min_area must be a non-negative number, got {}",
                self.min_area
            )));
        }
        if self.enforce_max_area && !(self.max_area > self.min_area) {
            return Err(DetectorError::InvalidConfig(format!(
                "max_area ({}) must exceed min_area ({})",
                self.max_area, self.min_area
            )));
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

/// Top-level configuration of the `ripple_floor` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorConfig {
    /// Host loop rate in ticks per second.
    pub tick_hz: u32,
    pub stream: StreamKind,
    /// Overrides the stream preset when present.
    pub detector: Option<DetectorConfig>,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            tick_hz: 30,
            stream: StreamKind::default(),
            detector: None,
        }
    }
}

impl FloorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        if config.tick_hz == 0 {
            return Err(DetectorError::InvalidConfig("tick_hz must be positive".into()));
        }
        config.detector_config().validate()?;
        Ok(config)
    }

    pub fn detector_config(&self) -> DetectorConfig {
        self.detector
            .clone()
            .unwrap_or_else(|| DetectorConfig::preset(self.stream))
    }
}
