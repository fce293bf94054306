use super::FrameSource;
use crate::core_modules::frame::Frame;
use crate::error::{DetectorError, Result};
use image::ImageFormat;
use image::imageops::{self, FilterType};
use std::path::{Path, PathBuf};

/// Replays a directory of still images, in file name order, as luma frames.
///
/// All frames take the size of the first file; others are resampled to it.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    size: (u32, u32),
    looping: bool,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && ImageFormat::from_path(&path).is_ok() {
                paths.push(path);
            }
        }
        paths.sort();

        let first = paths.first().ok_or_else(|| {
            DetectorError::InvalidConfig(format!("no image files in {}", dir.display()))
        })?;
        let size = image::image_dimensions(first)?;
        log::info!(
            "image sequence {}: {} frames at {}x{}",
            dir.display(),
            paths.len(),
            size.0,
            size.1
        );
        Ok(Self {
            paths,
            cursor: 0,
            size,
            looping: false,
        })
    }

    /// Start over from the first file once the last one was played.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        !self.looping && self.cursor >= self.paths.len()
    }

    /// File the next frame will be read from.
    pub fn next_path(&self) -> Option<&Path> {
        self.paths.get(self.cursor).map(PathBuf::as_path)
    }
}

impl FrameSource for ImageSequenceSource {
    fn dimensions(&self) -> (u32, u32) {
        self.size
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.cursor >= self.paths.len() {
            if !self.looping || self.paths.is_empty() {
                return None;
            }
            self.cursor = 0;
        }
        let path = &self.paths[self.cursor];
        self.cursor += 1;

        let frame = match image::open(path) {
            Ok(image) => image.to_luma8(),
            Err(e) => {
                log::warn!("failed to read {}: {e}", path.display());
                return None;
            }
        };
        if frame.dimensions() == self.size {
            Some(frame)
        } else {
            log::debug!(
                "resizing {} from {:?} to {:?}",
                path.display(),
                frame.dimensions(),
                self.size
            );
            Some(imageops::resize(&frame, self.size.0, self.size.1, FilterType::Triangle))
        }
    }
}
