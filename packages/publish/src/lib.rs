#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Publisher boundary, posting order, and rate-limit pacing.
//!
//! The real social-media client lives outside this workspace; anything
//! that can post a thread of text segments implements [`Publisher`].
//! Posting is strictly sequential with a fixed delay between incidents
//! so an external rate limit is never tripped, and one failed post never
//! blocks the rest of the batch.

use std::time::Duration;

use async_trait::async_trait;
use chrono::FixedOffset;
use traffic_watch_geography::Roster;
use traffic_watch_incident_models::PersistedSummary;
use traffic_watch_report::incident_thread;

/// Fixed pause between incident threads. A policy constant for the
/// platform rate limit, not a computed backoff.
pub const INTER_POST_DELAY: Duration = Duration::from_secs(4);

/// Error from a publisher implementation.
#[derive(Debug, thiserror::Error)]
#[error("publish failed: {message}")]
pub struct PublishError {
    /// What the platform client reported.
    pub message: String,
}

impl PublishError {
    /// Wraps a platform error message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Anything that can post an ordered thread of text segments.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Posts the segments as one thread, first segment on top.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the platform rejects the thread.
    async fn post_thread(&self, segments: &[String]) -> Result<(), PublishError>;
}

/// Publisher that writes threads to the log. Used for dry runs and as
/// the in-tree default; the real client is wired in by the deployment.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn post_thread(&self, segments: &[String]) -> Result<(), PublishError> {
        log::info!("thread ({} segments):", segments.len());
        for segment in segments {
            log::info!("  | {}", segment.replace('\n', " / "));
        }
        Ok(())
    }
}

/// Posts one thread per incident, in the order given, pacing posts by
/// [`INTER_POST_DELAY`].
///
/// A failed post is logged and skipped; the batch continues. Returns the
/// number of threads that posted successfully.
pub async fn publish_incidents(
    publisher: &dyn Publisher,
    incidents: &[PersistedSummary],
    offset: FixedOffset,
    roster: Option<&Roster>,
) -> usize {
    let mut posted = 0;

    for incident in incidents {
        log::info!("posting incident {}: {}", incident.key, incident.raw);
        let thread = incident_thread(incident, offset, roster);

        match publisher.post_thread(&thread).await {
            Ok(()) => posted += 1,
            Err(err) => {
                log::error!("could not post incident {}: {err}", incident.key);
            }
        }

        tokio::time::sleep(INTER_POST_DELAY).await;
    }

    posted
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    struct RecordingPublisher {
        threads: Mutex<Vec<Vec<String>>>,
        fail_on: Option<usize>,
    }

    impl RecordingPublisher {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                threads: Mutex::new(Vec::new()),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn post_thread(&self, segments: &[String]) -> Result<(), PublishError> {
            let mut threads = self.threads.lock().unwrap();
            if self.fail_on == Some(threads.len()) {
                threads.push(Vec::new());
                return Err(PublishError::new("rate limited"));
            }
            threads.push(segments.to_vec());
            Ok(())
        }
    }

    fn summary(key: &str, raw: &str) -> PersistedSummary {
        PersistedSummary {
            key: key.into(),
            raw: raw.into(),
            ts: 0,
            date: "1/1/2026, 12:00:00 PM".into(),
            ll: None,
            share_map: None,
            updates: BTreeMap::new(),
            district: None,
        }
    }

    fn offset() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn posts_in_order_with_pacing() {
        let publisher = RecordingPublisher::new(None);
        let incidents = vec![summary("k1", "Car crash"), summary("k2", "Hit-and-run")];

        let posted = publish_incidents(&publisher, &incidents, offset(), None).await;

        assert_eq!(posted, 2);
        let threads = publisher.threads.lock().unwrap();
        assert!(threads[0][0].starts_with("Car crash"));
        assert!(threads[1][0].starts_with("Hit-and-run"));
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_does_not_block_the_batch() {
        let publisher = RecordingPublisher::new(Some(0));
        let incidents = vec![summary("k1", "Car crash"), summary("k2", "Hit-and-run")];

        let posted = publish_incidents(&publisher, &incidents, offset(), None).await;

        assert_eq!(posted, 1);
        let threads = publisher.threads.lock().unwrap();
        assert!(threads[1][0].starts_with("Hit-and-run"));
    }
}
