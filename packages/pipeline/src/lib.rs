#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Priority-ordered incident filtering and summary tallies.
//!
//! Takes the fetch batch (already vetoed for weapons/robbery at top level),
//! assigns each incident to at most one priority bucket, and produces the
//! final posting order plus the aggregate counts for the summary thread.
//!
//! Bucket order is a display convention: vehicle-only collisions surface
//! first, pedestrian/cyclist incidents last so they sit at the top of the
//! published timeline.

use serde::Serialize;
use traffic_watch_classify::{
    contains_flipped_text, contains_hit_and_run_text, contains_ped_bike_text,
    contains_vehicle_only_text, contains_vehicular_assault_text,
    contains_weapons_or_robbery_text,
};
use traffic_watch_incident_models::Incident;

/// Aggregate tallies over the final incident list.
///
/// Each count is an independent substring scan of the final list's raw
/// text, so one incident can contribute to several tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Incidents involving pedestrians or cyclists, via raw text or
    /// update text.
    pub ped_bike: usize,
    /// Incidents mentioning "hit-and-run".
    pub hit_and_run: usize,
    /// Incidents mentioning an overturned or flipped vehicle.
    pub overturned: usize,
    /// Incidents mentioning "vehicular assault".
    pub vehicular_assault: usize,
    /// Incidents mentioning "collision".
    pub collision: usize,
    /// Incidents mentioning an injury ("injur" catches both forms).
    pub injury: usize,
}

/// The filter pipeline's output: the ranked incident list and its tallies.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// All relevant incidents in posting order.
    pub incidents: Vec<Incident>,
    /// Aggregate counts over `incidents`.
    pub summary: Summary,
}

/// Drops incidents whose description matches the weapons/robbery veto.
///
/// Runs before any categorization: a crime report that mentions a getaway
/// car is not traffic violence, no matter what else it matches.
#[must_use]
pub fn exclude_weapons_and_robbery(incidents: Vec<Incident>) -> Vec<Incident> {
    incidents
        .into_iter()
        .filter(|incident| !contains_weapons_or_robbery_text(&incident.raw.to_lowercase()))
        .collect()
}

/// Tests whether any update narrative mentions pedestrians or cyclists
/// without tripping the weapons/robbery veto.
///
/// Every update is scanned, root report included; the veto applies per
/// update text.
fn has_ped_bike_update(incident: &Incident) -> bool {
    incident.update_texts().any(|text| {
        let lower = text.to_lowercase();
        !contains_weapons_or_robbery_text(&lower) && contains_ped_bike_text(&lower)
    })
}

/// Runs the priority bucketing over a vetoed candidate batch.
///
/// Each step removes its matches from the remaining pool before the next
/// runs, except that Flipped and HitAndRun draw from the same pool: an
/// incident matching both appears in both buckets. That duplication is
/// deliberate pending product clarification; the state store collapses it
/// by key before anything is published, and the tallies are recomputed
/// from the final list's text so the counts stay correct either way.
#[must_use]
pub fn run(candidates: Vec<Incident>) -> FilterOutcome {
    let (ped_bike, pool): (Vec<Incident>, Vec<Incident>) = candidates
        .into_iter()
        .partition(|incident| contains_ped_bike_text(&incident.raw.to_lowercase()));

    let (ped_bike_via_update, pool): (Vec<Incident>, Vec<Incident>) =
        pool.into_iter().partition(has_ped_bike_update);

    let flipped: Vec<Incident> = pool
        .iter()
        .filter(|incident| contains_flipped_text(&incident.raw.to_lowercase()))
        .cloned()
        .collect();
    let hit_and_run: Vec<Incident> = pool
        .iter()
        .filter(|incident| contains_hit_and_run_text(&incident.raw.to_lowercase()))
        .cloned()
        .collect();

    let pool: Vec<Incident> = pool
        .into_iter()
        .filter(|incident| {
            let lower = incident.raw.to_lowercase();
            !contains_flipped_text(&lower) && !contains_hit_and_run_text(&lower)
        })
        .collect();

    let (mut vehicle_only, pool): (Vec<Incident>, Vec<Incident>) = pool
        .into_iter()
        .partition(|incident| contains_vehicle_only_text(&incident.raw.to_lowercase()));
    // Oldest first; the only bucket with an internal ordering requirement.
    vehicle_only.sort_by_key(|incident| incident.ts);

    let vehicular_assault: Vec<Incident> = pool
        .into_iter()
        .filter(|incident| contains_vehicular_assault_text(&incident.raw.to_lowercase()))
        .collect();

    log::debug!(
        "buckets: vehicle_only={} flipped={} hit_and_run={} vehicular_assault={} ped_bike_via_update={} ped_bike={}",
        vehicle_only.len(),
        flipped.len(),
        hit_and_run.len(),
        vehicular_assault.len(),
        ped_bike_via_update.len(),
        ped_bike.len(),
    );

    let ped_bike_total = ped_bike.len() + ped_bike_via_update.len();

    let incidents: Vec<Incident> = vehicle_only
        .into_iter()
        .chain(flipped)
        .chain(hit_and_run)
        .chain(vehicular_assault)
        .chain(ped_bike_via_update)
        .chain(ped_bike)
        .collect();

    let summary = tally(&incidents, ped_bike_total);

    FilterOutcome { incidents, summary }
}

fn tally(incidents: &[Incident], ped_bike: usize) -> Summary {
    let raw_texts: Vec<String> = incidents
        .iter()
        .map(|incident| incident.raw.to_lowercase())
        .collect();
    let count = |predicate: &dyn Fn(&str) -> bool| {
        raw_texts.iter().filter(|text| predicate(text.as_str())).count()
    };

    Summary {
        ped_bike,
        hit_and_run: count(&|text| text.contains("hit-and-run")),
        overturned: count(&|text| {
            text.contains("overturned vehicle")
                || (text.contains("flipped") && text.contains("vehicle"))
        }),
        vehicular_assault: count(&|text| text.contains("vehicular assault")),
        collision: count(&|text| text.contains("collision")),
        injury: count(&|text| text.contains("injur")),
    }
}
