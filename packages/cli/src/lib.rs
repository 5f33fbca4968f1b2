#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! One bot run: fetch, classify, deduplicate, publish.
//!
//! [`run`] wires the packages together in strict sequence. All external
//! collaborators come in as arguments (feed source, publisher, state
//! store, district index) so the whole run is testable without network
//! or a real platform client.

pub mod config;

use chrono::{DateTime, Utc};
use traffic_watch_geography::{DistrictIndex, GeoError};
use traffic_watch_pipeline::exclude_weapons_and_robbery;
use traffic_watch_publish::{Publisher, publish_incidents};
use traffic_watch_report::{RunOutcome, feed_unavailable_notice, summary_thread};
use traffic_watch_source::{FetchQuery, IncidentSource, SourceError};
use traffic_watch_state::{StateError, StateStore};

use crate::config::LocationConfig;

/// Errors that end a run.
///
/// Per-item publish failures are not here; those are isolated and
/// logged inside the publish loop.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Config or boundary file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The incident feed fetch failed.
    #[error("feed error: {0}")]
    Source(#[from] SourceError),

    /// The archive partition could not be persisted.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// District boundaries could not be loaded.
    #[error("geography error: {0}")]
    Geo(#[from] GeoError),

    /// The requested location is not in the config file.
    #[error("unknown location: {location}")]
    UnknownLocation {
        /// The location id that was requested.
        location: String,
    },

    /// A config value is out of range.
    #[error("config error: {message}")]
    Config {
        /// Description of what is wrong.
        message: String,
    },
}

/// Explicit per-run values threaded through every step.
///
/// Derived once at startup; nothing downstream reads the clock or
/// global state on its own.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    /// When this run started.
    pub now: DateTime<Utc>,
    /// Days of lookback the run covers.
    pub days: u32,
    /// Lower bound on incident timestamps, epoch milliseconds.
    pub target_time_ms: i64,
}

impl RunContext {
    /// Builds a context covering the last `days` days ending at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>, days: u32) -> Self {
        let target_time_ms = now.timestamp_millis() - i64::from(days) * 86_400_000;
        Self {
            now,
            days,
            target_time_ms,
        }
    }
}

/// Executes one run for one location.
///
/// Sequence: fetch the feed, filter to the lookback window, veto
/// weapons/robbery reports, bucket by category, optionally assign
/// districts, reconcile against the archive, post incident threads,
/// post the summary last so it tops the timeline.
///
/// The summary and the feed-outage notice are posted through the same
/// publisher; a publish failure there is logged, not fatal, because the
/// archive has already been reconciled.
///
/// # Errors
///
/// Returns [`CliError`] if the fetch or the archive write fails; those
/// are the only steps nothing downstream can proceed without.
pub async fn run(
    ctx: &RunContext,
    location_id: &str,
    location: &LocationConfig,
    source: &dyn IncidentSource,
    publisher: &dyn Publisher,
    store: &StateStore,
    districts: Option<&DistrictIndex>,
) -> Result<RunOutcome, CliError> {
    let offset = location.offset()?;
    let query = FetchQuery {
        bounds: location.bounds,
        limit: location.per_day_limit * u64::from(ctx.days),
    };

    let all_incidents = source.fetch(&query).await?;
    log::info!("incidents total: {}", all_incidents.len());

    if all_incidents.is_empty() {
        let notice = feed_unavailable_notice(location_id);
        if let Err(err) = publisher.post_thread(&[notice]).await {
            log::error!("could not post feed outage notice: {err}");
        }
        return Ok(RunOutcome::FeedUnavailable);
    }

    let current: Vec<_> = all_incidents
        .into_iter()
        .filter(|incident| incident.ts >= ctx.target_time_ms)
        .collect();
    let potential = exclude_weapons_and_robbery(current);

    let mut outcome = traffic_watch_pipeline::run(potential);

    if let Some(index) = districts {
        index.assign_districts(&mut outcome.incidents);
    }

    let final_list = store.reconcile(
        &outcome.incidents,
        ctx.target_time_ms,
        ctx.now.with_timezone(&offset),
    )?;
    log::info!("final list after reconcile: {} incidents", final_list.len());

    let roster = location.roster.as_ref();
    let posted = publish_incidents(publisher, &final_list, offset, roster).await;
    log::info!("posted {posted} of {} incident threads", final_list.len());

    let summary = summary_thread(
        &final_list,
        &outcome.summary,
        ctx.days,
        location_id,
        roster,
    );
    if let Err(err) = publisher.post_thread(&summary).await {
        log::error!("could not post summary thread: {err}");
    }

    if final_list.is_empty() {
        Ok(RunOutcome::NothingToReport)
    } else {
        Ok(RunOutcome::Report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use traffic_watch_incident_models::Incident;
    use traffic_watch_publish::PublishError;

    use super::*;

    struct StaticSource {
        incidents: Vec<Incident>,
    }

    #[async_trait]
    impl IncidentSource for StaticSource {
        async fn fetch(&self, _query: &FetchQuery) -> Result<Vec<Incident>, SourceError> {
            Ok(self.incidents.clone())
        }
    }

    struct RecordingPublisher {
        threads: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn post_thread(&self, segments: &[String]) -> Result<(), PublishError> {
            self.threads.lock().unwrap().push(segments.to_vec());
            Ok(())
        }
    }

    fn incident(key: &str, ts: i64, raw: &str) -> Incident {
        Incident {
            key: key.into(),
            ts,
            raw: raw.into(),
            latitude: 38.9,
            longitude: -77.0,
            address: None,
            ll: None,
            updates: BTreeMap::new(),
            share_map: None,
            district: None,
            extra: BTreeMap::new(),
        }
    }

    fn location() -> LocationConfig {
        toml::from_str(
            r#"
            utc_offset_minutes = -300

            [bounds]
            lower_latitude = 38.791
            lower_longitude = -77.120
            upper_latitude = 38.996
            upper_longitude = -76.909
            "#,
        )
        .unwrap()
    }

    fn test_store() -> (StateStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("traffic-watch-cli-{}", uuid::Uuid::new_v4()));
        let offset = chrono::FixedOffset::west_opt(5 * 3600).unwrap();
        (StateStore::new(dir.clone(), "dc", offset, 3), dir)
    }

    fn ctx() -> RunContext {
        let now = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();
        RunContext::new(now, 1)
    }

    #[tokio::test(start_paused = true)]
    async fn full_run_posts_incidents_then_summary() {
        let ctx = ctx();
        let in_window = ctx.target_time_ms + 1000;
        let source = StaticSource {
            incidents: vec![
                incident("ped", in_window, "Pedestrian struck by vehicle"),
                incident("veto", in_window, "Armed robbery suspect fled, car crash nearby"),
                incident("veh", in_window, "Two-car collision on the bridge"),
                incident("stale", 100, "Car crash last week"),
            ],
        };
        let publisher = RecordingPublisher {
            threads: Mutex::new(Vec::new()),
        };
        let (store, dir) = test_store();

        let outcome = run(&ctx, "dc", &location(), &source, &publisher, &store, None)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Report);
        let threads = publisher.threads.lock().unwrap();
        // Two incident threads (vehicle-only first), then the summary.
        assert_eq!(threads.len(), 3);
        assert!(threads[0][0].starts_with("Two-car collision"));
        assert!(threads[1][0].starts_with("Pedestrian struck"));
        assert!(threads[2][0].contains("2 incidents of traffic violence"));
        assert!(threads[2][0].contains("1 involved pedestrians or cyclists"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_reposts_the_merged_list_without_duplicates() {
        let ctx = ctx();
        let in_window = ctx.target_time_ms + 1000;
        let source = StaticSource {
            incidents: vec![incident("veh", in_window, "Two-car collision on the bridge")],
        };
        let publisher = RecordingPublisher {
            threads: Mutex::new(Vec::new()),
        };
        let (store, dir) = test_store();

        run(&ctx, "dc", &location(), &source, &publisher, &store, None)
            .await
            .unwrap();
        run(&ctx, "dc", &location(), &source, &publisher, &store, None)
            .await
            .unwrap();

        let threads = publisher.threads.lock().unwrap();
        // First run: incident + summary. Second run re-posts the merged
        // list (same single incident) + summary.
        assert_eq!(threads.len(), 4);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_feed_posts_outage_notice() {
        let source = StaticSource {
            incidents: Vec::new(),
        };
        let publisher = RecordingPublisher {
            threads: Mutex::new(Vec::new()),
        };
        let (store, dir) = test_store();

        let outcome = run(&ctx(), "dc", &location(), &source, &publisher, &store, None)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::FeedUnavailable);
        let threads = publisher.threads.lock().unwrap();
        assert_eq!(threads.len(), 1);
        assert!(threads[0][0].contains("seems to be down"));

        let _ = std::fs::remove_dir_all(dir);
    }
}
