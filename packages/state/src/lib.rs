#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Month-partitioned incident archive and cross-run deduplication.
//!
//! One flat JSON array of [`PersistedSummary`] records per (location,
//! year, month) is the durable memory of which incidents have already
//! been published. [`StateStore::reconcile`] merges a fresh candidate
//! batch into the current partition and returns the deduplicated,
//! time-filtered set for downstream publishing.
//!
//! A run during the first few days of a month also consults the previous
//! month's partition, so incidents whose timestamps straddle the boundary
//! are not re-surfaced.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, FixedOffset, Months};
use traffic_watch_incident_models::{Incident, PersistedSummary};

/// Errors that can occur while persisting the incident archive.
///
/// Read-side problems (missing or corrupt partition files) are recovered
/// internally and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// I/O error writing a partition file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handle to the archive directory for one location.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
    location: String,
    offset: FixedOffset,
    grace_days: u32,
}

impl StateStore {
    /// Creates a store rooted at `dir` for the given location.
    ///
    /// `offset` is the location's UTC offset (partition boundaries follow
    /// local calendar months); `grace_days` is how many days into a new
    /// month the previous partition is still consulted.
    #[must_use]
    pub fn new(dir: PathBuf, location: &str, offset: FixedOffset, grace_days: u32) -> Self {
        Self {
            dir,
            location: location.to_string(),
            offset,
            grace_days,
        }
    }

    /// Returns the partition file path for a given year and month.
    #[must_use]
    pub fn partition_path(&self, year: i32, month: u32) -> PathBuf {
        self.dir
            .join(format!("summaries-{}-{year}-{month:02}.json", self.location))
    }

    /// Merges `candidates` into the current-month partition and returns
    /// the deduplicated set at or after `target_time_ms`.
    ///
    /// Semantics:
    /// - the current partition is loaded (missing/corrupt reads recover
    ///   to an empty list and rewrite a fresh `[]` file);
    /// - within the grace window the previous partition is loaded too,
    ///   and its keys block the matching candidates from re-surfacing;
    /// - merge is last-write-wins by key in order previous partition,
    ///   current partition, candidates, with first-seen position kept so
    ///   the caller's priority ordering survives;
    /// - previous-month entries themselves are not carried into the
    ///   current-month file;
    /// - the merged set is written back atomically before returning.
    ///
    /// Idempotent on persisted content: re-running with the same
    /// candidates leaves the partition file unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the merged partition cannot be written.
    pub fn reconcile(
        &self,
        candidates: &[Incident],
        target_time_ms: i64,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<PersistedSummary>, StateError> {
        let local_now = now.with_timezone(&self.offset);
        let current_path = self.partition_path(local_now.year(), local_now.month());

        let current = self.load_or_recover(&current_path);

        let previous_keys: BTreeSet<String> = if local_now.day() <= self.grace_days {
            let previous_month = local_now
                .checked_sub_months(Months::new(1))
                .unwrap_or(local_now);
            let previous_path =
                self.partition_path(previous_month.year(), previous_month.month());
            self.load_or_recover(&previous_path)
                .into_iter()
                .map(|summary| summary.key)
                .collect()
        } else {
            BTreeSet::new()
        };

        // Order-preserving last-write-wins merge keyed by incident key.
        let mut order: Vec<String> = Vec::new();
        let mut merged: BTreeMap<String, PersistedSummary> = BTreeMap::new();

        for summary in current {
            if !merged.contains_key(&summary.key) {
                order.push(summary.key.clone());
            }
            merged.insert(summary.key.clone(), summary);
        }

        for incident in candidates {
            if previous_keys.contains(&incident.key) {
                log::debug!(
                    "incident {} already archived last month, skipping",
                    incident.key
                );
                continue;
            }
            if !merged.contains_key(&incident.key) {
                order.push(incident.key.clone());
            }
            merged.insert(
                incident.key.clone(),
                PersistedSummary::from_incident(incident, self.offset),
            );
        }

        let persisted: Vec<PersistedSummary> = order
            .iter()
            .filter_map(|key| merged.remove(key))
            .collect();

        self.write_partition(&current_path, &persisted)?;

        Ok(persisted
            .into_iter()
            .filter(|summary| summary.ts >= target_time_ms)
            .collect())
    }

    /// Loads a partition file, recovering to an empty list on any read
    /// failure.
    ///
    /// A missing or corrupt file is logged and replaced with a fresh `[]`
    /// so the next run reads cleanly. The recovery write itself is
    /// best-effort.
    fn load_or_recover(&self, path: &Path) -> Vec<PersistedSummary> {
        let parsed = fs::read(path)
            .map_err(|err| err.to_string())
            .and_then(|bytes| {
                serde_json::from_slice::<Vec<PersistedSummary>>(&bytes)
                    .map_err(|err| err.to_string())
            });

        match parsed {
            Ok(summaries) => summaries,
            Err(err) => {
                log::warn!(
                    "could not read partition {}: {err}; starting empty",
                    path.display()
                );
                if let Err(write_err) = self.write_partition(path, &[]) {
                    log::warn!(
                        "could not write recovery partition {}: {write_err}",
                        path.display()
                    );
                }
                Vec::new()
            }
        }
    }

    /// Atomically replaces a partition file: write to a temp file in the
    /// same directory, flush to disk, then rename over the target. A
    /// reader never observes a partial write.
    fn write_partition(
        &self,
        path: &Path,
        summaries: &[PersistedSummary],
    ) -> Result<(), StateError> {
        fs::create_dir_all(&self.dir)?;

        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&serde_json::to_vec(summaries)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}
