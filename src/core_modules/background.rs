// THEORY:
// The `BackgroundAccumulator` turns the circular buffer into a single
// background estimate: the elementwise mean of the buffered frames.
//
// Key architectural principles:
// 1.  **Full recompute**: every call zeroes the running sum and re-adds the
//     whole buffer. There is no incremental update, so a frame that left the
//     buffer can never linger in the estimate.
// 2.  **Wide accumulation**: sums are kept in f32 and only the final mean is
//     re-quantized to 8 bits (rounded, saturated).
// 3.  **Constant count matrix**: the divisor is a frame-sized matrix holding
//     the effective window size in every cell. It is built once, with the
//     accumulator, and never mutated; a resolution or capacity change builds a
//     new accumulator instead.

use crate::config::AveragingWindow;
use crate::core_modules::circular_buffer::CircularBuffer;
use crate::core_modules::frame::{AccumFrame, Frame, quantize};
use crate::error::{DetectorError, Result};
use image::Luma;

pub struct BackgroundAccumulator {
    width: u32,
    height: u32,
    window: AveragingWindow,
    /// Number of frames summed per estimate.
    window_frames: usize,
    count_matrix: AccumFrame,
    sum: AccumFrame,
}

impl BackgroundAccumulator {
    pub fn new(width: u32, height: u32, capacity: usize, window: AveragingWindow) -> Result<Self> {
        let window_frames = window.frames(capacity);
        if window_frames == 0 {
            return Err(DetectorError::InvalidConfig(format!(
                "averaging window {window:?} over {capacity} frames is empty"
            )));
        }
        Ok(Self {
            width,
            height,
            window,
            window_frames,
            count_matrix: AccumFrame::from_pixel(width, height, Luma([window_frames as f32])),
            sum: AccumFrame::new(width, height),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn window(&self) -> AveragingWindow {
        self.window
    }

    pub fn window_frames(&self) -> usize {
        self.window_frames
    }

    /// Averages the most recent `window_frames` buffered frames into an 8-bit estimate.
    ///
    /// The buffer must hold at least that many frames; a short buffer is a
    /// cold-start condition the caller is expected to have handled.
    pub fn accumulate(&mut self, buffer: &CircularBuffer<AccumFrame>) -> Result<Frame> {
        if buffer.len() < self.window_frames {
            return Err(DetectorError::BufferNotFilled {
                needed: self.window_frames,
                available: buffer.len(),
            });
        }

        let (width, height) = (self.width, self.height);
        let sum: &mut [f32] = &mut self.sum;
        sum.fill(0.0);
        let skip = buffer.len() - self.window_frames;
        for frame in buffer.iter().skip(skip) {
            if frame.dimensions() != (width, height) {
                return Err(DetectorError::DimensionMismatch {
                    expected: (width, height),
                    actual: frame.dimensions(),
                });
            }
            for (acc, &sample) in sum.iter_mut().zip(frame.as_raw()) {
                *acc += sample;
            }
        }

        let mut mean = self.sum.clone();
        let values: &mut [f32] = &mut mean;
        for (value, &count) in values.iter_mut().zip(self.count_matrix.as_raw()) {
            *value /= count;
        }
        Ok(quantize(&mean))
    }
}
