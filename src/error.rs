// Error types for the image cache.
// Covers filesystem, codec, and configuration failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("No platform cache directory available")]
    NoCacheDir,
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = CacheError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ));
        assert_eq!(err.to_string(), "IO error: read-only");
    }

    #[test]
    fn test_codec_error_display() {
        let err = CacheError::Decode("truncated stream".to_string());
        assert_eq!(err.to_string(), "Decode failed: truncated stream");
    }
}
