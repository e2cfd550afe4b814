//! Image processor - orientation-aware dimension probing

use crate::metadata::Dimensions;
use crate::traits::ImageProbe;
use async_trait::async_trait;
use exif::{In, Reader, Tag};
use image::ImageReader;
use std::io::Cursor;

pub struct ImageProcessor;

#[async_trait]
impl ImageProbe for ImageProcessor {
    async fn probe_image(&self, data: &[u8]) -> Option<Dimensions> {
        let data = data.to_vec();
        // Header and EXIF parsing block.
        match tokio::task::spawn_blocking(move || Self::probe_dimensions(&data)).await {
            Ok(dimensions) => dimensions,
            Err(e) => {
                tracing::warn!(error = %e, "Image probe task failed");
                None
            }
        }
    }
}

impl ImageProcessor {
    /// Read pixel dimensions from the image header and correct them for EXIF
    /// orientation. Only the header is parsed; the pixel data is never decoded.
    pub fn probe_dimensions(data: &[u8]) -> Option<Dimensions> {
        let raw = match Self::read_raw_dimensions(data) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::warn!(size_bytes = data.len(), "Image reports zero dimensions");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, size_bytes = data.len(), "Failed to read image dimensions");
                return None;
            }
        };

        let orientation = Self::read_exif_orientation(data);
        let dimensions = if Self::orientation_swaps_dimensions(orientation) {
            raw.swapped()
        } else {
            raw
        };

        tracing::debug!(
            raw = %raw,
            orientation = orientation,
            width = dimensions.width,
            height = dimensions.height,
            "Image probe completed"
        );

        Some(dimensions)
    }

    fn read_raw_dimensions(data: &[u8]) -> Result<Option<Dimensions>, anyhow::Error> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let (width, height) = reader.into_dimensions()?;
        Ok(Dimensions::new(width, height))
    }

    /// Read EXIF orientation tag from image data.
    ///
    /// Returns orientation value (1–8) or 1 (normal) if the image carries no
    /// readable EXIF block.
    pub fn read_exif_orientation(data: &[u8]) -> u8 {
        let exif = match Reader::new().read_from_container(&mut Cursor::new(data)) {
            Ok(exif) => exif,
            Err(_) => return 1,
        };

        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .and_then(|value| u8::try_from(value).ok())
            .filter(|value| (1..=8).contains(value))
            .unwrap_or(1)
    }

    /// Get rotation and flip operations needed for a given EXIF orientation
    /// Returns (rotate_angle, flip_horizontal, flip_vertical)
    pub fn get_orientation_transforms(orientation: u8) -> (Option<u16>, bool, bool) {
        match orientation {
            1 => (None, false, false),      // Normal
            2 => (None, true, false),       // Mirror horizontal
            3 => (Some(180), false, false), // Rotate 180
            4 => (None, false, true),       // Mirror vertical
            5 => (Some(270), true, false),  // Mirror horizontal + Rotate 270 CW
            6 => (Some(90), false, false),  // Rotate 90 CW
            7 => (Some(90), true, false),   // Mirror horizontal + Rotate 90 CW
            8 => (Some(270), false, false), // Rotate 270 CW
            _ => (None, false, false),      // Invalid, treat as normal
        }
    }

    /// Orientations 5-8 include a quarter turn, so the displayed image is
    /// transposed relative to the stored pixels.
    pub fn orientation_swaps_dimensions(orientation: u8) -> bool {
        matches!(
            Self::get_orientation_transforms(orientation),
            (Some(90), _, _) | (Some(270), _, _)
        )
    }
}
