// Disk-backed, content-keyed cache for encoded images.
// Stores values under hashed keys, decodes them with size bounds on read, and
// reclaims space by purging entries that have not been read recently.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod codec;
pub mod config;
pub mod error;

pub use cache::{
    BlobStore, CacheStats, DecodingCache, ImageCache, PurgeReport, Reaper, StoredEntry,
    default_instance, hash_key,
};
pub use codec::{BoundingSize, Codec, EncodingConfig, ImageCodec, ImageFormat};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
