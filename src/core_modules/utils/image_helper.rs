pub mod image_helper {
    use crate::core_modules::frame::Frame;
    use image::ImageEncoder;
    use std::path::{Path, PathBuf};

    /// Writes a mask (or any luma frame) as an 8-bit grayscale PNG.
    pub fn save_mask(path: &Path, mask: &Frame) -> Result<(), image::error::ImageError> {
        let output = std::io::BufWriter::new(std::fs::File::create(path)?);
        let encoder = image::codecs::png::PngEncoder::new(output);
        let (width, height) = mask.dimensions();

        encoder.write_image(mask.as_raw(), width, height, image::ExtendedColorType::L8)?;

        Ok(())
    }

    /// `<dir>/<stream>_<tick>.png`, zero padded so the files sort in tick order.
    pub fn mask_path(dir: &Path, stream: &str, tick: u64) -> PathBuf {
        dir.join(format!("{stream}_{tick:06}.png"))
    }
}
