// THEORY:
// The `pipeline` module is the top-level API of the detector. A `TouchPipeline`
// owns every piece of per-stream state (frame buffer, background accumulator,
// change detector, configuration) and runs exactly one detection pass per
// host tick.
//
// Key architectural principles:
// 1.  **Push, then compare**: the current frame joins the buffer before the
//     background is averaged, so it contributes 1/N of its own background.
// 2.  **Explicit cold start**: until the buffer has been filled once the
//     pipeline reports `Warming` and computes nothing. Detection starts on
//     tick N + 1.
// 3.  **Outcomes are not errors**: warming, an empty scene and a missing
//     frame are ordinary `Report` variants. `DetectorError` is reserved for
//     bad configuration and malformed frames.
// 4.  **Atomic rebuild**: a resolution change or a `reconfigure` replaces the
//     buffer, accumulator and count matrix together and restarts cold start.

use crate::config::DetectorConfig;
use crate::core_modules::background::BackgroundAccumulator;
use crate::core_modules::blob_extractor::blob_extractor;
use crate::core_modules::change_detector::ChangeDetector;
use crate::core_modules::circular_buffer::CircularBuffer;
use crate::core_modules::frame::{AccumFrame, Frame, to_accum};
use crate::error::{DetectorError, Result};
use crate::sources::FrameSource;

// Re-export key data structures for the public API.
pub use crate::core_modules::blob_extractor::{Blob, TouchPoint};

/// Everything a detection tick found.
#[derive(Debug, Clone)]
pub struct TouchData {
    /// Blob centroids in discovery order.
    pub points: Vec<TouchPoint>,
    pub blobs: Vec<Blob>,
}

/// The output of the pipeline for a single tick.
#[derive(Debug, Clone)]
pub enum Report {
    /// The buffer has not been filled yet.
    Warming { frames_remaining: usize },
    /// The frame source had nothing this tick.
    NoFrame,
    /// Detection ran and no blob passed the area filter.
    Quiet,
    Touches(TouchData),
}

impl Report {
    pub fn touch_points(&self) -> &[TouchPoint] {
        match self {
            Report::Touches(data) => &data.points,
            _ => &[],
        }
    }

    pub fn has_touches(&self) -> bool {
        !self.touch_points().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Warming { frames_remaining: usize },
    Running,
}

pub struct TouchPipeline {
    config: DetectorConfig,
    width: u32,
    height: u32,
    buffer: CircularBuffer<AccumFrame>,
    background: BackgroundAccumulator,
    detector: ChangeDetector,
    /// Frames pushed since the last rebuild.
    frames_seen: usize,
    tick_count: u64,
    last_mask: Option<Frame>,
}

impl TouchPipeline {
    pub fn new(config: DetectorConfig, width: u32, height: u32) -> Result<Self> {
        config.validate()?;
        if width == 0 || height == 0 {
            return Err(DetectorError::InvalidConfig(format!(
                "frame dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let (buffer, background) = Self::build_state(&config, width, height)?;
        let detector = ChangeDetector::new(&config);
        log::info!(
            "touch pipeline ready: {width}x{height}, buffer {}, window {:?}",
            config.buffer_capacity,
            config.averaging_window
        );
        Ok(Self {
            config,
            width,
            height,
            buffer,
            background,
            detector,
            frames_seen: 0,
            tick_count: 0,
            last_mask: None,
        })
    }

    fn build_state(
        config: &DetectorConfig,
        width: u32,
        height: u32,
    ) -> Result<(CircularBuffer<AccumFrame>, BackgroundAccumulator)> {
        let buffer = CircularBuffer::new(config.buffer_capacity).ok_or_else(|| {
            DetectorError::InvalidConfig("buffer_capacity must be at least 1".into())
        })?;
        let background = BackgroundAccumulator::new(
            width,
            height,
            config.buffer_capacity,
            config.averaging_window,
        )?;
        Ok((buffer, background))
    }

    fn rebuild(&mut self, width: u32, height: u32) -> Result<()> {
        let (buffer, background) = Self::build_state(&self.config, width, height)?;
        self.buffer = buffer;
        self.background = background;
        self.detector = ChangeDetector::new(&self.config);
        self.width = width;
        self.height = height;
        self.frames_seen = 0;
        self.last_mask = None;
        Ok(())
    }

    /// Runs one detection pass on `frame`.
    pub fn tick(&mut self, frame: &Frame) -> Result<Report> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectorError::EmptyFrame);
        }
        if (width, height) != (self.width, self.height) {
            log::warn!(
                "resolution changed from {}x{} to {width}x{height}; restarting cold start",
                self.width,
                self.height
            );
            self.rebuild(width, height)?;
        }

        self.tick_count += 1;
        self.buffer.push(to_accum(frame));
        self.frames_seen = self.frames_seen.saturating_add(1);

        let capacity = self.buffer.capacity();
        if self.frames_seen <= capacity {
            let frames_remaining = capacity + 1 - self.frames_seen;
            log::debug!("tick {}: warming, {frames_remaining} frames remaining", self.tick_count);
            return Ok(Report::Warming { frames_remaining });
        }
        if self.frames_seen == capacity + 1 {
            log::info!("background estimate ready after {capacity} frames");
        }

        let background = self.background.accumulate(&self.buffer)?;
        let change = self.detector.detect(&background, frame)?;
        let (points, blobs) = blob_extractor::touch_points(&change.mask, &self.config);
        self.last_mask = Some(change.mask);

        log::debug!(
            "tick {}: level {}, {} touch points",
            self.tick_count,
            change.level,
            points.len()
        );

        if points.is_empty() {
            Ok(Report::Quiet)
        } else {
            Ok(Report::Touches(TouchData { points, blobs }))
        }
    }

    /// Pulls one frame from `source` and runs a tick on it.
    ///
    /// Never fails: a missing frame or a rejected frame both report `NoFrame`
    /// and leave the buffered history untouched.
    pub fn poll<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Report {
        let Some(frame) = source.next_frame() else {
            log::debug!("no frame available");
            self.last_mask = None;
            return Report::NoFrame;
        };
        match self.tick(&frame) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("skipping tick: {e}");
                self.last_mask = None;
                Report::NoFrame
            }
        }
    }

    /// Replaces the configuration. Buffered frames are discarded and cold start begins again.
    pub fn reconfigure(&mut self, config: DetectorConfig) -> Result<()> {
        config.validate()?;
        let previous = std::mem::replace(&mut self.config, config);
        if let Err(e) = self.rebuild(self.width, self.height) {
            self.config = previous;
            return Err(e);
        }
        log::info!("touch pipeline reconfigured; restarting cold start");
        Ok(())
    }

    /// What the next tick will do.
    pub fn state(&self) -> PipelineState {
        let capacity = self.buffer.capacity();
        if self.frames_seen < capacity {
            PipelineState::Warming {
                frames_remaining: capacity - self.frames_seen,
            }
        } else {
            PipelineState::Running
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The foreground mask of the last detection tick, if it produced one.
    pub fn last_mask(&self) -> Option<&Frame> {
        self.last_mask.as_ref()
    }
}
