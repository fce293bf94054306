// THEORY:
// The depth stream only sees feet if the depth band sits just above the floor.
// Rather than hand-tuning that band, the detector measures the floor first.
// Calibration is an explicit state machine advanced once per tick, so it never
// blocks the host loop:
//
//   Warmup -> SamplingPeaks -> Refining -> Complete
//
// 1.  **Warmup**: the sensor settles; frames are ignored.
// 2.  **SamplingPeaks**: the farthest valid sample of a few frames is taken as
//     a first floor estimate (the floor is the farthest thing in view).
// 3.  **Refining**: each pass averages the estimate with every sample close
//     to it, pulling the estimate onto the bulk of the floor.
// 4.  **Complete**: the band ends at the floor and extends `band_thickness_mm`
//     toward the sensor. The band is immutable from then on.

use serde::{Deserialize, Serialize};

/// A raw depth frame in millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u16>,
}

impl DepthFrame {
    pub fn uniform(width: u32, height: u32, depth_mm: u16) -> Self {
        Self {
            width,
            height,
            data: vec![depth_mm; Self::sample_count(width, height)],
        }
    }

    /// Samples a `width` x `height` frame carries.
    pub fn sample_count(width: u32, height: u32) -> usize {
        width as usize * height as usize
    }
}

/// Open depth interval: a sample `v` is inside iff `near_mm < v < far_mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthBand {
    pub near_mm: u16,
    pub far_mm: u16,
}

impl DepthBand {
    pub fn contains(&self, depth_mm: u16) -> bool {
        self.near_mm < depth_mm && depth_mm < self.far_mm
    }
}

impl Default for DepthBand {
    fn default() -> Self {
        Self {
            near_mm: 1000,
            far_mm: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub warmup_ticks: u32,
    pub peak_frames: u32,
    pub refine_passes: u32,
    pub refine_radius_mm: u16,
    pub sensor_min_mm: u16,
    pub sensor_max_mm: u16,
    /// Only every n-th sample is inspected.
    pub sample_stride: usize,
    pub band_thickness_mm: u16,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            warmup_ticks: 150,
            peak_frames: 2,
            refine_passes: 2,
            refine_radius_mm: 500,
            sensor_min_mm: 500,
            sensor_max_mm: 4500,
            sample_stride: 2,
            band_thickness_mm: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationState {
    Warmup { ticks_remaining: u32 },
    SamplingPeaks { peaks: Vec<u16> },
    Refining { pass: u32, estimate: f64 },
    Complete(DepthBand),
}

pub struct DepthCalibrator {
    config: CalibrationConfig,
    state: CalibrationState,
}

impl DepthCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        let state = match config.warmup_ticks {
            0 => CalibrationState::SamplingPeaks { peaks: Vec::new() },
            ticks_remaining => CalibrationState::Warmup { ticks_remaining },
        };
        Self { config, state }
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn band(&self) -> Option<DepthBand> {
        match self.state {
            CalibrationState::Complete(band) => Some(band),
            _ => None,
        }
    }

    /// Advances the state machine by one tick's frame. Returns the band once calibration completes.
    pub fn feed(&mut self, frame: &DepthFrame) -> Option<DepthBand> {
        let next = match std::mem::replace(&mut self.state, CalibrationState::Warmup { ticks_remaining: 0 }) {
            CalibrationState::Warmup { ticks_remaining } if ticks_remaining > 1 => CalibrationState::Warmup {
                ticks_remaining: ticks_remaining - 1,
            },
            CalibrationState::Warmup { .. } => CalibrationState::SamplingPeaks { peaks: Vec::new() },
            CalibrationState::SamplingPeaks { mut peaks } => {
                if let Some(peak) = self.peak(frame) {
                    peaks.push(peak);
                }
                if peaks.len() as u32 >= self.config.peak_frames.max(1) {
                    let estimate = peaks.iter().map(|&p| p as f64).sum::<f64>() / peaks.len() as f64;
                    log::info!("depth calibration: floor peak estimate {estimate:.0} mm from {peaks:?}");
                    self.after_refine_pass(0, estimate)
                } else {
                    CalibrationState::SamplingPeaks { peaks }
                }
            }
            CalibrationState::Refining { pass, estimate } => {
                let refined = self.refine(frame, estimate);
                log::debug!("depth calibration: pass {} estimate {refined:.0} mm", pass + 1);
                self.after_refine_pass(pass + 1, refined)
            }
            complete @ CalibrationState::Complete(_) => complete,
        };
        self.state = next;
        self.band()
    }

    fn after_refine_pass(&self, passes_done: u32, estimate: f64) -> CalibrationState {
        if passes_done < self.config.refine_passes {
            return CalibrationState::Refining {
                pass: passes_done,
                estimate,
            };
        }
        let far_mm = estimate.clamp(0.0, u16::MAX as f64) as u16;
        let band = DepthBand {
            near_mm: far_mm.saturating_sub(self.config.band_thickness_mm),
            far_mm,
        };
        log::info!("depth calibration complete: band {} - {} mm", band.near_mm, band.far_mm);
        CalibrationState::Complete(band)
    }

    fn samples<'a>(&self, frame: &'a DepthFrame) -> impl Iterator<Item = u16> + 'a {
        frame.data.iter().step_by(self.config.sample_stride.max(1)).copied()
    }

    /// Farthest sample strictly below the sensor limit. Zero means "no reading".
    fn peak(&self, frame: &DepthFrame) -> Option<u16> {
        let max = self.config.sensor_max_mm;
        self.samples(frame).filter(|&v| v > 0 && v < max).max()
    }

    fn refine(&self, frame: &DepthFrame, estimate: f64) -> f64 {
        let lo_limit = self.config.sensor_min_mm as f64;
        let hi_limit = self.config.sensor_max_mm as f64;
        let radius = self.config.refine_radius_mm as f64;
        let lo = (estimate - radius).clamp(lo_limit, hi_limit);
        let hi = (estimate + radius).clamp(lo_limit, hi_limit);
        let max = self.config.sensor_max_mm;

        let (sum, count) = self
            .samples(frame)
            .filter(|&v| v < max && lo < v as f64 && (v as f64) < hi)
            .fold((0.0, 0u64), |(sum, count), v| (sum + v as f64, count + 1));

        (estimate + sum) / (count as f64 + 1.0)
    }
}
