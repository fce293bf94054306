use super::FrameSource;
use crate::core_modules::frame::Frame;
use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Any stream that arrives as an RGBA texture (color, infrared).
pub trait ColorProvider {
    fn dimensions(&self) -> (u32, u32);
    fn next_color(&mut self) -> Option<RgbaImage>;
}

/// Converts an RGBA stream to luma, optionally resampling to a fixed resolution.
///
/// The color camera is much larger than the depth camera; resizing it to the
/// depth resolution keeps the per-tick cost of every stream comparable.
pub struct LumaSource<P> {
    provider: P,
    target: Option<(u32, u32)>,
    filter: FilterType,
}

impl<P: ColorProvider> LumaSource<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            target: None,
            filter: FilterType::Triangle,
        }
    }

    /// Resamples every frame to `width` x `height`.
    pub fn resized(provider: P, width: u32, height: u32) -> Self {
        Self {
            target: Some((width, height)),
            ..Self::new(provider)
        }
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

impl<P: ColorProvider> FrameSource for LumaSource<P> {
    fn dimensions(&self) -> (u32, u32) {
        self.target.unwrap_or_else(|| self.provider.dimensions())
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let color = self.provider.next_color()?;
        let gray = imageops::grayscale(&color);
        match self.target {
            Some((width, height)) if gray.dimensions() != (width, height) => {
                Some(imageops::resize(&gray, width, height, self.filter))
            }
            _ => Some(gray),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct Solid {
        size: (u32, u32),
        color: Rgba<u8>,
        remaining: usize,
    }

    impl ColorProvider for Solid {
        fn dimensions(&self) -> (u32, u32) {
            self.size
        }

        fn next_color(&mut self) -> Option<RgbaImage> {
            if self.remaining == 0 {
                return None;
            }
            self.remaining -= 1;
            Some(RgbaImage::from_pixel(self.size.0, self.size.1, self.color))
        }
    }

    #[test]
    fn gray_input_keeps_its_value() {
        let provider = Solid {
            size: (6, 4),
            color: Rgba([90, 90, 90, 255]),
            remaining: 1,
        };
        let mut source = LumaSource::new(provider);
        assert_eq!(source.dimensions(), (6, 4));
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.dimensions(), (6, 4));
        assert!(frame.as_raw().iter().all(|&v| v == 90));
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn resized_source_reports_and_produces_the_target_size() {
        let provider = Solid {
            size: (64, 48),
            color: Rgba([255, 255, 255, 255]),
            remaining: 2,
        };
        let mut source = LumaSource::resized(provider, 16, 12).with_filter(FilterType::Nearest);
        assert_eq!(source.dimensions(), (16, 12));
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.dimensions(), (16, 12));
        assert!(frame.as_raw().iter().all(|&v| v == 255));
    }

    #[test]
    fn green_is_brighter_than_blue() {
        let mut green = LumaSource::new(Solid {
            size: (2, 2),
            color: Rgba([0, 200, 0, 255]),
            remaining: 1,
        });
        let mut blue = LumaSource::new(Solid {
            size: (2, 2),
            color: Rgba([0, 0, 200, 255]),
            remaining: 1,
        });
        let g = green.next_frame().unwrap().get_pixel(0, 0)[0];
        let b = blue.next_frame().unwrap().get_pixel(0, 0)[0];
        assert!(g > b);
    }
}
