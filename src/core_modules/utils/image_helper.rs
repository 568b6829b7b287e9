pub mod image_helper {
    use image::{ImageEncoder, RgbImage};
    use std::path::Path;

    /// Writes an RGB frame as PNG.
    pub fn save(path: impl AsRef<Path>, frame: &RgbImage) -> Result<(), image::error::ImageError> {
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(
            frame.as_raw(),
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgb8,
        )?;

        Ok(())
    }

    /// Reads any supported image format and converts it to RGB.
    pub fn load(path: impl AsRef<Path>) -> Result<RgbImage, image::error::ImageError> {
        Ok(image::open(path)?.to_rgb8())
    }
}
