// Age-based purge of cache entries.
// Sweeps the cache directory and removes files last touched before a cutoff.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::store::BlobStore;

/// Outcome of a purge sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Entries inspected.
    pub scanned: usize,
    /// Entries deleted.
    pub deleted: usize,
    /// Bytes reclaimed by deleted entries.
    pub reclaimed_bytes: u64,
    /// Deletes that failed and were skipped.
    pub failed: usize,
}

/// Deletes stale entries from a [`BlobStore`].
///
/// The sweep takes no lock. Entries written during a sweep may or may not be
/// visited, and an interrupted sweep is finished by running it again.
#[derive(Debug, Clone, Copy)]
pub struct Reaper<'a> {
    store: &'a BlobStore,
}

impl<'a> Reaper<'a> {
    pub fn new(store: &'a BlobStore) -> Self {
        Self { store }
    }

    /// Delete every entry whose last-modified time is strictly before
    /// `cutoff`. Entries stamped exactly at the cutoff survive.
    pub fn purge_older_than(&self, cutoff: DateTime<Utc>) -> PurgeReport {
        let mut report = PurgeReport::default();

        let entries = match self.store.list_entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = ?self.store.dir(), error = %e, "Failed to list cache entries");
                return report;
            }
        };

        for entry in entries {
            report.scanned += 1;
            if entry.last_modified >= cutoff {
                continue;
            }

            match self.store.delete(&entry.name) {
                Ok(()) => {
                    report.deleted += 1;
                    report.reclaimed_bytes += entry.size;
                    debug!(name = %entry.name, "Purged cache entry");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(name = %entry.name, error = %e, "Failed to purge cache entry");
                }
            }
        }

        info!(
            scanned = report.scanned,
            deleted = report.deleted,
            failed = report.failed,
            reclaimed_bytes = report.reclaimed_bytes,
            "Purge complete"
        );
        report
    }

    /// Delete every entry not accessed within `max_age`.
    pub fn purge_older_than_age(&self, max_age: Duration) -> PurgeReport {
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.purge_older_than(cutoff)
    }
}
