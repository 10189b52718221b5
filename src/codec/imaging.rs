// Default codec backed by the `image` crate.
// Encodes to PNG, JPEG or lossless WebP and decodes with aspect-preserving downscale.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use super::{BoundingSize, Codec, EncodingConfig, ImageFormat};
use crate::error::{CacheError, Result};

/// Image codec operating on `DynamicImage` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec {
    filter: Option<FilterType>,
}

impl ImageCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific resampling filter when downscaling (default: triangle).
    pub fn with_filter(filter: FilterType) -> Self {
        Self {
            filter: Some(filter),
        }
    }
}

impl Codec for ImageCodec {
    type Value = DynamicImage;

    fn encode(&self, value: &DynamicImage, config: &EncodingConfig) -> Result<Vec<u8>> {
        if value.width() == 0 || value.height() == 0 {
            return Err(CacheError::Encode("image has no pixels".to_string()));
        }

        let mut bytes = Vec::new();
        match config.format {
            ImageFormat::Png => {
                value.write_with_encoder(PngEncoder::new(Cursor::new(&mut bytes)))?;
            }
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(value.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(
                    Cursor::new(&mut bytes),
                    config.quality,
                ))?;
            }
            ImageFormat::WebP => {
                let rgba = DynamicImage::ImageRgba8(value.to_rgba8());
                rgba.write_with_encoder(WebPEncoder::new_lossless(Cursor::new(&mut bytes)))?;
            }
        }
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8], bounds: BoundingSize) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(CacheError::Decode("empty payload".to_string()));
        }

        let decoded = image::load_from_memory(bytes)?;
        let (width, height) = decoded.dimensions();
        let (target_w, target_h) = bounds.fit(width, height);

        if (target_w, target_h) == (width, height) {
            return Ok(decoded);
        }

        let filter = self.filter.unwrap_or(FilterType::Triangle);
        Ok(decoded.resize_exact(target_w, target_h, filter))
    }
}
