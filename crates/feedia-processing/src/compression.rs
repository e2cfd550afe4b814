//! JPEG thumbnail encoding

use anyhow::{anyhow, Result};
use bytes::Bytes;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::metadata::Dimensions;

/// Resizes extracted frames and encodes them as JPEG.
pub struct ThumbnailEncoder;

impl ThumbnailEncoder {
    /// Resize to exactly `target`, ignoring the source aspect ratio.
    pub fn resize_exact(img: &DynamicImage, target: Dimensions) -> DynamicImage {
        if img.width() == target.width && img.height() == target.height {
            return img.clone();
        }
        img.resize_exact(target.width, target.height, FilterType::Lanczos3)
    }

    /// Compress to JPEG using mozjpeg
    pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();
        if width == 0 || height == 0 {
            return Err(anyhow!("Cannot encode an empty image"));
        }

        let quality = quality.clamp(1, 100);

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(Bytes::from(jpeg_data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    #[test]
    fn test_resize_exact_ignores_aspect_ratio() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(192, 108, Rgb([10, 20, 30])));
        let resized = ThumbnailEncoder::resize_exact(&img, Dimensions::new(36, 64).unwrap());
        assert_eq!(resized.dimensions(), (36, 64));
    }

    #[test]
    fn test_encode_jpeg_decodes_to_same_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(36, 64, Rgb([200, 10, 10])));
        let data = ThumbnailEncoder::encode_jpeg(&img, 85).unwrap();
        assert_eq!(&data[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.dimensions(), (36, 64));
    }
}
