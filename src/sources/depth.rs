use super::FrameSource;
use crate::core_modules::calibration::{CalibrationConfig, DepthCalibrator};
use crate::core_modules::frame::{FOREGROUND, Frame};
use serde::{Deserialize, Serialize};

pub use crate::core_modules::calibration::{DepthBand, DepthFrame};

/// Raw depth input, in millimetres.
pub trait DepthProvider {
    fn dimensions(&self) -> (u32, u32);
    fn next_depth(&mut self) -> Option<DepthFrame>;
}

/// How in-band depth samples are written into the luma frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthEncoding {
    /// 255 inside the band, 0 outside.
    #[default]
    Mask,
    /// Linear ramp inside the band: 255 at the near edge down to 1 at the far
    /// edge. 0 outside.
    Scaled,
}

/// Converts one depth frame into luma. `None` if the sample count does not match the dimensions.
pub fn encode(frame: &DepthFrame, band: DepthBand, encoding: DepthEncoding) -> Option<Frame> {
    let span = band.far_mm.saturating_sub(band.near_mm) as f64;
    let data = frame
        .data
        .iter()
        .map(|&v| {
            if !band.contains(v) {
                return 0;
            }
            match encoding {
                DepthEncoding::Mask => FOREGROUND,
                DepthEncoding::Scaled => {
                    let t = (band.far_mm - v) as f64 / span;
                    (1.0 + 254.0 * t).round() as u8
                }
            }
        })
        .collect();
    Frame::from_raw(frame.width, frame.height, data)
}

/// A `FrameSource` that keeps only the depth band just above the floor.
///
/// Built with [`DepthBandSource::calibrating`], it measures the floor first
/// and yields no frames until the band is known.
pub struct DepthBandSource<P> {
    provider: P,
    band: DepthBand,
    encoding: DepthEncoding,
    calibrator: Option<DepthCalibrator>,
}

impl<P: DepthProvider> DepthBandSource<P> {
    pub fn new(provider: P, band: DepthBand, encoding: DepthEncoding) -> Self {
        Self {
            provider,
            band,
            encoding,
            calibrator: None,
        }
    }

    pub fn calibrating(provider: P, config: CalibrationConfig, encoding: DepthEncoding) -> Self {
        Self {
            provider,
            band: DepthBand::default(),
            encoding,
            calibrator: Some(DepthCalibrator::new(config)),
        }
    }

    /// The band in use, or `None` while calibration is still running.
    pub fn band(&self) -> Option<DepthBand> {
        match self.calibrator {
            Some(_) => None,
            None => Some(self.band),
        }
    }

    pub fn into_inner(self) -> P {
        self.provider
    }
}

impl<P: DepthProvider> FrameSource for DepthBandSource<P> {
    fn dimensions(&self) -> (u32, u32) {
        self.provider.dimensions()
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let depth = self.provider.next_depth()?;
        if let Some(calibrator) = self.calibrator.as_mut() {
            self.band = calibrator.feed(&depth)?;
            self.calibrator = None;
            log::info!("depth source calibrated: {:?}", self.band);
        }
        let frame = encode(&depth, self.band, self.encoding);
        if frame.is_none() {
            log::warn!(
                "depth frame {}x{} carries {} samples; dropped",
                depth.width,
                depth.height,
                depth.data.len()
            );
        }
        frame
    }
}
