// Disk cache for encoded images.
// Hashed-key file layout, decode-on-read access, and age-based purge.

pub mod decoding;
pub mod key;
pub mod paths;
pub mod reaper;
pub mod store;

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::warn;

use crate::codec::ImageCodec;

pub use decoding::{CacheStats, DecodingCache};
pub use key::{HASHED_KEY_LEN, hash_key};
pub use reaper::{PurgeReport, Reaper};
pub use store::{BlobStore, StoredEntry};

/// Cache type used by the process-wide default instance.
pub type ImageCache = DecodingCache<ImageCodec>;

static DEFAULT_INSTANCE: OnceLock<Option<ImageCache>> = OnceLock::new();

/// Process-wide cache rooted in the platform cache directory.
///
/// Initialized on first call and reused for the life of the process. Returns
/// `None` (and logs why) when no platform cache directory is available or it
/// cannot be created; that outcome is also kept for the process lifetime.
pub fn default_instance() -> Option<&'static ImageCache> {
    DEFAULT_INSTANCE
        .get_or_init(|| open_at(paths::default_image_dir()))
        .as_ref()
}

fn open_at(dir: Option<PathBuf>) -> Option<ImageCache> {
    let Some(dir) = dir else {
        warn!("No platform cache directory available, default image cache disabled");
        return None;
    };

    let store = BlobStore::new(&dir);
    if let Err(e) = store.ensure_dir() {
        warn!(dir = ?dir, error = %e, "Cannot create cache directory, default image cache disabled");
        return None;
    }

    Some(DecodingCache::with_store(store, ImageCodec::new()))
}
