use thiserror::Error;

/// Errors raised by the detector and its configuration / frame loading.
///
/// Cold start, empty results and missing frames are not errors; they are
/// reported through [`crate::pipeline::Report`].
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),
    #[error("frame dimensions mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("frame has no pixels")]
    EmptyFrame,
    #[error("background needs {needed} buffered frames, buffer holds {available}")]
    BufferNotFilled { needed: usize, available: usize },
    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, DetectorError>;
