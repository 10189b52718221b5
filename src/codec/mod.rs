// Codec capability consumed by the decoding cache.
// Defines the encode/decode seam plus the put-time and get-time parameters.

pub mod imaging;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use imaging::ImageCodec;

/// Default quality for lossy formats.
pub const DEFAULT_QUALITY: u8 = 90;

/// On-disk format a value is encoded to before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::WebP => "webp",
        }
    }

    /// Whether a round trip through this format preserves pixels exactly.
    pub fn is_lossless(&self) -> bool {
        !matches!(self, ImageFormat::Jpeg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "webp" => Ok(ImageFormat::WebP),
            other => Err(format!(
                "Unknown format '{}'. Expected one of: png, jpeg, webp",
                other
            )),
        }
    }
}

/// Format and quality selected by the caller at put time. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingConfig {
    pub format: ImageFormat,
    /// 1..=100; ignored by lossless formats.
    pub quality: u8,
}

impl EncodingConfig {
    pub fn new(format: ImageFormat, quality: u8) -> Self {
        Self {
            format,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn png() -> Self {
        Self::new(ImageFormat::Png, DEFAULT_QUALITY)
    }

    pub fn jpeg(quality: u8) -> Self {
        Self::new(ImageFormat::Jpeg, quality)
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self::png()
    }
}

/// Maximum dimensions requested at get time.
///
/// A zero limit leaves that dimension unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingSize {
    pub width: u32,
    pub height: u32,
}

impl BoundingSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    fn width_limit(&self) -> u32 {
        if self.width == 0 { u32::MAX } else { self.width }
    }

    fn height_limit(&self) -> u32 {
        if self.height == 0 { u32::MAX } else { self.height }
    }

    pub fn contains(&self, width: u32, height: u32) -> bool {
        width <= self.width_limit() && height <= self.height_limit()
    }

    /// Largest size with the same aspect ratio that fits inside the bounds.
    /// Sizes already inside the bounds are returned unchanged.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        if self.contains(width, height) || width == 0 || height == 0 {
            return (width, height);
        }

        let (w, h) = (u64::from(width), u64::from(height));
        let (bw, bh) = (u64::from(self.width_limit()), u64::from(self.height_limit()));

        if w * bh >= h * bw {
            // Width is the binding constraint.
            (bw as u32, (h * bw / w).max(1) as u32)
        } else {
            ((w * bh / h).max(1) as u32, bh as u32)
        }
    }
}

/// Encoder and decoder for the values a cache stores.
pub trait Codec {
    type Value;

    /// Serialize `value` into bytes according to `config`.
    fn encode(&self, value: &Self::Value, config: &EncodingConfig) -> Result<Vec<u8>>;

    /// Decode `bytes` into a value no larger than `bounds`.
    fn decode(&self, bytes: &[u8], bounds: BoundingSize) -> Result<Self::Value>;
}
