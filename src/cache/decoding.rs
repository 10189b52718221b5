// Decode-on-read cache layered over the blob store.
// Encodes values on put, decodes with bounds on get, and refreshes recency on hit.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::key::hash_key;
use super::reaper::{PurgeReport, Reaper};
use super::store::BlobStore;
use crate::codec::{BoundingSize, Codec, EncodingConfig};
use crate::error::Result;

/// Counters for diagnostics. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
}

/// Disk cache that stores encoded values and decodes them on read.
///
/// Each logical key maps to one file, so distinct keys can be used from
/// many threads at once. Writes to the same key replace the file
/// atomically; the last writer wins.
#[derive(Debug)]
pub struct DecodingCache<C> {
    store: BlobStore,
    codec: C,
    counters: Counters,
}

impl<C: Codec> DecodingCache<C> {
    /// Create a cache rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>, codec: C) -> Self {
        let store = BlobStore::new(dir);
        if !store.is_writable() {
            warn!(dir = ?store.dir(), "Cache directory is not writable");
        }
        Self::with_store(store, codec)
    }

    pub fn with_store(store: BlobStore, codec: C) -> Self {
        Self {
            store,
            codec,
            counters: Counters::default(),
        }
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Encode `value` and store it under `key`. Returns false on encode or
    /// write failure.
    pub fn put(&self, key: &str, value: &C::Value, config: &EncodingConfig) -> bool {
        let result = self.try_put(key, value, config);
        self.record_write(key, result)
    }

    /// Store raw bytes under `key` without encoding.
    pub fn put_bytes(&self, key: &str, bytes: &[u8]) -> bool {
        let result = self.try_put_bytes(key, bytes);
        self.record_write(key, result)
    }

    /// Load and decode the value for `key`, scaled to fit `max_width` x
    /// `max_height` (0 leaves a dimension unbounded).
    ///
    /// Missing, unreadable and undecodable entries are all reported as a miss.
    pub fn get(&self, key: &str, max_width: u32, max_height: u32) -> Option<C::Value> {
        match self.try_get(key, BoundingSize::new(max_width, max_height)) {
            Ok(Some(value)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cache hit");
                return Some(value);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key, error = %e, "Failed to load cached value");
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        info!(key, "Cache miss");
        None
    }

    /// Encode and store, reporting the failure reason.
    ///
    /// An encode failure leaves the store untouched.
    pub fn try_put(&self, key: &str, value: &C::Value, config: &EncodingConfig) -> Result<()> {
        let bytes = self.codec.encode(value, config)?;
        self.try_put_bytes(key, &bytes)
    }

    pub fn try_put_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.store.write(&hash_key(key), bytes)
    }

    /// Load and decode, reporting the failure reason. A missing entry is
    /// `Ok(None)`.
    ///
    /// The entry's timestamp is refreshed only after a successful decode; a
    /// failed refresh does not affect the returned value.
    pub fn try_get(&self, key: &str, bounds: BoundingSize) -> Result<Option<C::Value>> {
        let hashed = hash_key(key);
        let Some(bytes) = self.store.read(&hashed)? else {
            return Ok(None);
        };

        let value = self.codec.decode(&bytes, bounds)?;
        if let Err(e) = self.store.touch(&hashed) {
            debug!(key, error = %e, "Failed to refresh entry timestamp");
        }
        Ok(Some(value))
    }

    /// Stored bytes for `key`, without decoding or refreshing recency.
    pub fn read_raw(&self, key: &str) -> Option<Vec<u8>> {
        match self.store.read(&hash_key(key)) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cached bytes");
                None
            }
        }
    }

    /// Whether an entry file exists for `key`. A present entry may still fail
    /// to decode.
    pub fn contains(&self, key: &str) -> bool {
        self.store.exists(&hash_key(key))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
        }
    }

    pub fn reaper(&self) -> Reaper<'_> {
        Reaper::new(&self.store)
    }

    /// Delete every entry last accessed before `cutoff`.
    pub fn purge_older_than(&self, cutoff: DateTime<Utc>) -> PurgeReport {
        self.reaper().purge_older_than(cutoff)
    }

    fn record_write(&self, key: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cached value");
                true
            }
            Err(e) => {
                self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
                warn!(key, error = %e, "Failed to cache value");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ImageCodec, ImageFormat};
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn cache() -> (TempDir, DecodingCache<ImageCodec>) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DecodingCache::new(temp_dir.path().join("img"), ImageCodec::new());
        (temp_dir, cache)
    }

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    fn age_entry(cache: &DecodingCache<ImageCodec>, key: &str, secs: u64) {
        cache
            .store()
            .touch_at(&hash_key(key), SystemTime::now() - Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_put_bytes_is_byte_exact() {
        let (_temp_dir, cache) = cache();
        let bytes = b"\x00\x01arbitrary\xffbytes".to_vec();

        assert!(cache.put_bytes("raw", &bytes));

        let on_disk = fs::read(cache.store().path_for(&hash_key("raw"))).unwrap();
        assert_eq!(on_disk, bytes);
        assert_eq!(cache.read_raw("raw"), Some(bytes));
    }

    #[test]
    fn test_lossless_round_trip_at_full_size() {
        let (_temp_dir, cache) = cache();
        let original = checkerboard(24, 16);

        assert!(cache.put("board", &original, &EncodingConfig::png()));

        let decoded = cache.get("board", 100, 100).unwrap();
        assert_eq!(decoded.dimensions(), (24, 16));
        assert_eq!(decoded.to_rgb8(), original.to_rgb8());
    }

    #[test]
    fn test_get_downscales_within_bounds() {
        let (_temp_dir, cache) = cache();
        assert!(cache.put("big", &checkerboard(160, 80), &EncodingConfig::jpeg(85)));

        let decoded = cache.get("big", 40, 40).unwrap();
        let (w, h) = decoded.dimensions();
        assert!(w <= 40 && h <= 40);
        assert_eq!((w, h), (40, 20));
    }

    #[test]
    fn test_get_never_put_is_miss() {
        let (_temp_dir, cache) = cache();

        assert!(cache.get("never-put-key", 10, 10).is_none());
        assert!(!cache.contains("never-put-key"));
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_hit_refreshes_timestamp() {
        let (_temp_dir, cache) = cache();
        assert!(cache.put("fresh", &checkerboard(8, 8), &EncodingConfig::png()));
        age_entry(&cache, "fresh", 3600);

        let before = Utc::now() - chrono::Duration::seconds(1);
        assert!(cache.get("fresh", 8, 8).is_some());

        let modified = cache.store().last_modified(&hash_key("fresh")).unwrap().unwrap();
        assert!(modified >= before);
        assert_eq!(cache.stats().hits, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_hit_survives_failed_refresh() {
        use std::os::unix::fs::PermissionsExt;

        let (_temp_dir, cache) = cache();
        assert!(cache.put("readonly", &checkerboard(8, 8), &EncodingConfig::png()));
        let path = cache.store().path_for(&hash_key("readonly"));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();

        // The refresh needs write access, which only root has here.
        let decoded = cache.get("readonly", 8, 8).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_corrupt_entry_is_miss_without_refresh() {
        let (_temp_dir, cache) = cache();
        assert!(cache.put_bytes("corrupt", b"definitely not an image"));
        age_entry(&cache, "corrupt", 3600);
        let aged = cache.store().last_modified(&hash_key("corrupt")).unwrap();

        assert!(cache.get("corrupt", 10, 10).is_none());

        assert!(cache.contains("corrupt"));
        assert_eq!(cache.store().last_modified(&hash_key("corrupt")).unwrap(), aged);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_unreadable_entry_is_miss() {
        let (_temp_dir, cache) = cache();
        fs::create_dir(cache.store().path_for(&hash_key("dir"))).unwrap();

        assert!(cache.get("dir", 10, 10).is_none());
        assert!(cache.try_get("dir", BoundingSize::unbounded()).is_err());
    }

    #[test]
    fn test_put_replaces_existing_entry() {
        let (_temp_dir, cache) = cache();
        assert!(cache.put_bytes("key", b"first payload, fairly long"));
        assert!(cache.put("key", &checkerboard(4, 4), &EncodingConfig::png()));

        let decoded = cache.get("key", 0, 0).unwrap();
        assert_eq!(decoded.dimensions(), (4, 4));

        assert!(cache.put_bytes("key", b"x"));
        assert_eq!(cache.read_raw("key"), Some(b"x".to_vec()));
    }

    #[test]
    fn test_encode_failure_leaves_store_untouched() {
        let (_temp_dir, cache) = cache();
        assert!(cache.put_bytes("kept", b"previous"));

        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(!cache.put("kept", &empty, &EncodingConfig::new(ImageFormat::Png, 90)));

        assert_eq!(cache.read_raw("kept"), Some(b"previous".to_vec()));
        assert_eq!(cache.stats().write_failures, 1);
    }

    #[test]
    fn test_write_failure_returns_false() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let cache = DecodingCache::new(blocker.join("img"), ImageCodec::new());

        assert!(!cache.put_bytes("key", b"data"));
        assert!(!cache.put("key", &checkerboard(4, 4), &EncodingConfig::png()));
        assert!(cache.get("key", 4, 4).is_none());
        assert_eq!(cache.stats().write_failures, 2);
    }

    #[test]
    fn test_entries_survive_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("img");

        let first = DecodingCache::new(&dir, ImageCodec::new());
        assert!(first.put("persisted", &checkerboard(8, 8), &EncodingConfig::png()));
        drop(first);

        let second = DecodingCache::new(&dir, ImageCodec::new());
        assert!(second.get("persisted", 8, 8).is_some());
    }

    #[test]
    fn test_parallel_put_and_get_same_key() {
        let (_temp_dir, cache) = cache();
        let small = checkerboard(8, 8);
        let large = checkerboard(64, 64);
        assert!(cache.put("shared", &small, &EncodingConfig::png()));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..20 {
                    let value = if i % 2 == 0 { &large } else { &small };
                    assert!(cache.put("shared", value, &EncodingConfig::png()));
                }
            });

            for _ in 0..50 {
                let decoded = cache.get("shared", 0, 0).expect("torn or missing entry");
                assert!(matches!(decoded.dimensions(), (8, 8) | (64, 64)));
            }
        });
    }
}
