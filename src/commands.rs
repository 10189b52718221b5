// Command implementations for the maintenance binary.
// Each writes its human-readable output to the given writer.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use image::GenericImageView;
use tracing::info;

use crate::cache::{ImageCache, PurgeReport, hash_key};
use crate::codec::EncodingConfig;
use crate::error::Result;

/// Store `file` under `key`, raw or re-encoded.
pub fn put(
    cache: &ImageCache,
    key: &str,
    file: &Path,
    encoding: Option<EncodingConfig>,
    out: &mut impl Write,
) -> Result<()> {
    let bytes = fs::read(file)?;

    match encoding {
        Some(config) => {
            let value = image::load_from_memory(&bytes)?;
            cache.try_put(key, &value, &config)?;
            writeln!(
                out,
                "{} ({} {}x{})",
                hash_key(key),
                config.format,
                value.width(),
                value.height()
            )?;
        }
        None => {
            cache.try_put_bytes(key, &bytes)?;
            writeln!(out, "{} ({} bytes)", hash_key(key), bytes.len())?;
        }
    }

    Ok(())
}

/// Decode `key` within bounds. Returns false on a cache miss.
pub fn get(
    cache: &ImageCache,
    key: &str,
    max_width: u32,
    max_height: u32,
    output: Option<&Path>,
    out: &mut impl Write,
) -> Result<bool> {
    let Some(value) = cache.get(key, max_width, max_height) else {
        writeln!(out, "miss")?;
        return Ok(false);
    };

    let (width, height) = value.dimensions();
    match output {
        Some(path) => {
            value.save(path)?;
            writeln!(out, "{}x{} -> {}", width, height, path.display())?;
        }
        None => writeln!(out, "{}x{}", width, height)?,
    }

    Ok(true)
}

/// Purge entries older than `max_age`.
pub fn purge(cache: &ImageCache, max_age: Duration, out: &mut impl Write) -> Result<PurgeReport> {
    info!(max_age = %humantime::format_duration(max_age), dir = ?cache.store().dir(), "Purging cache");
    let report = cache.reaper().purge_older_than_age(max_age);

    writeln!(
        out,
        "Scanned {}, deleted {} ({} bytes), failed {}",
        report.scanned, report.deleted, report.reclaimed_bytes, report.failed
    )?;
    Ok(report)
}

/// List entries, most recently used first. Returns the entry count.
pub fn list(cache: &ImageCache, json: bool, out: &mut impl Write) -> Result<usize> {
    let mut entries = cache.store().list_entries()?;
    entries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified).then(a.name.cmp(&b.name)));

    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
    } else {
        for entry in &entries {
            writeln!(
                out,
                "{}  {:>10}  {}",
                entry.name,
                entry.size,
                entry.last_modified.format("%Y-%m-%d %H:%M:%S")
            )?;
        }
    }

    Ok(entries.len())
}

pub fn hash(key: &str, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", hash_key(key))?;
    Ok(())
}
