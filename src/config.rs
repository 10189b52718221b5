// Cache configuration.
// Loaded from an optional JSON file, then overridden by environment and flags.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::paths;
use crate::codec::{DEFAULT_QUALITY, EncodingConfig, ImageFormat};
use crate::error::{CacheError, Result};

/// Environment variable overriding the cache directory.
pub const DIR_ENV: &str = "IMGCACHE_DIR";

/// Default purge age: 7 days.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory; the platform cache directory when unset.
    pub directory: Option<PathBuf>,
    /// Format used when re-encoding values on put.
    pub format: ImageFormat,
    /// Quality for lossy formats, 1..=100.
    pub quality: u8,
    /// Entries not accessed for this long are purged.
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: ImageFormat::default(),
            quality: DEFAULT_QUALITY,
            max_age_secs: DEFAULT_MAX_AGE.as_secs(),
        }
    }
}

impl CacheConfig {
    /// Read configuration from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let config: CacheConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path`, or the platform config file when `path` is `None`,
    /// then apply the environment override.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => match paths::config_path() {
                Some(path) => Self::load(&path)?,
                None => Self::default(),
            },
        };

        if let Some(dir) = std::env::var_os(DIR_ENV).filter(|v| !v.is_empty()) {
            config.directory = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Effective cache directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(dir) => Ok(dir.clone()),
            None => paths::default_image_dir().ok_or(CacheError::NoCacheDir),
        }
    }

    pub fn encoding(&self) -> EncodingConfig {
        EncodingConfig::new(self.format, self.quality)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}
