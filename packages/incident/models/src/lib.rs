#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident feed record types and the persisted summary format.
//!
//! [`Incident`] mirrors the shape of one record from the trending-incident
//! feed. Fields the pipeline does not interpret are preserved verbatim in
//! the [`Incident::extra`] passthrough map so re-serialization is lossless.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Marks whether an update record is the original report or an amendment.
///
/// The feed tags the first narrative of every incident `ROOT`; anything
/// else is appended narrative. Unrecognized tags deserialize as
/// [`UpdateType::Update`] so new feed variants never fail parsing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateType {
    /// The original report; carries the same text as [`Incident::raw`].
    Root,
    /// A later narrative amendment.
    #[serde(other)]
    Update,
}

/// A timestamped narrative amendment to an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentUpdate {
    /// Whether this is the root report or an amendment.
    #[serde(rename = "type")]
    pub update_type: UpdateType,
    /// Free-form narrative text.
    pub text: String,
    /// Epoch milliseconds when the update was posted.
    pub ts: i64,
}

/// One reported public-safety incident from the feed.
///
/// Constructed fresh each fetch cycle; the durable representation is
/// [`PersistedSummary`]. The `key` is the sole deduplication criterion:
/// two incidents with the same key are the same entity regardless of
/// content drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Globally unique identifier, stable across fetches.
    pub key: String,
    /// Epoch milliseconds when the incident was first reported.
    pub ts: i64,
    /// Primary human-readable description; input to all classification.
    pub raw: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Street address, when the feed provides one.
    #[serde(default)]
    pub address: Option<String>,
    /// `[latitude, longitude]` pair as the feed serializes it.
    #[serde(default)]
    pub ll: Option<[f64; 2]>,
    /// Updates keyed by the feed's per-update identifier. Absent on the
    /// wire for incidents with no amendments.
    #[serde(default)]
    pub updates: BTreeMap<String, IncidentUpdate>,
    /// Opaque URL of a renderable map image; never interpreted here.
    #[serde(default)]
    pub share_map: Option<String>,
    /// Council district label, filled by the geofencing step. Never
    /// present on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    /// Every feed field the pipeline does not model, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Incident {
    /// Iterates the texts of all updates, root report included.
    pub fn update_texts(&self) -> impl Iterator<Item = &str> {
        self.updates.values().map(|u| u.text.as_str())
    }

    /// Iterates updates that amend the original report (non-`ROOT`).
    pub fn amendments(&self) -> impl Iterator<Item = &IncidentUpdate> {
        self.updates
            .values()
            .filter(|u| u.update_type != UpdateType::Root)
    }
}

/// Durable, minimal projection of an [`Incident`].
///
/// One flat JSON array of these per month partition is the source of
/// truth for cross-run deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSummary {
    /// The incident's deduplication key.
    pub key: String,
    /// Raw description at the time the incident was recorded.
    pub raw: String,
    /// Epoch milliseconds when the incident was first reported.
    pub ts: i64,
    /// Local-time rendering of `ts`, formatted once at write time.
    pub date: String,
    /// `[latitude, longitude]` pair.
    #[serde(default)]
    pub ll: Option<[f64; 2]>,
    /// Map image URL carried through for the archive.
    #[serde(default)]
    pub share_map: Option<String>,
    /// Updates as last seen.
    #[serde(default)]
    pub updates: BTreeMap<String, IncidentUpdate>,
    /// Council district label, when geofencing ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

impl PersistedSummary {
    /// Projects an incident into its durable summary form.
    ///
    /// `offset` is the location's UTC offset, used to render the
    /// human-readable `date` field.
    #[must_use]
    pub fn from_incident(incident: &Incident, offset: FixedOffset) -> Self {
        Self {
            key: incident.key.clone(),
            raw: incident.raw.clone(),
            ts: incident.ts,
            date: format_local(incident.ts, offset),
            ll: incident
                .ll
                .or(Some([incident.latitude, incident.longitude])),
            share_map: incident.share_map.clone(),
            updates: incident.updates.clone(),
            district: incident.district.clone(),
        }
    }
}

/// Renders an epoch-millisecond timestamp as a local date-time string.
///
/// Timestamps outside the representable range fall back to the raw
/// millisecond value so formatting never fails.
#[must_use]
pub fn format_local(ts_ms: i64, offset: FixedOffset) -> String {
    Utc.timestamp_millis_opt(ts_ms).single().map_or_else(
        || ts_ms.to_string(),
        |dt: DateTime<Utc>| {
            dt.with_timezone(&offset)
                .format("%-m/%-d/%Y, %-I:%M:%S %p")
                .to_string()
        },
    )
}
