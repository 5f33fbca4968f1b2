#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Summary aggregation and thread text assembly for publishing.
//!
//! Pure string building: per-incident thread segments, the aggregate
//! summary thread, and the feed-outage notice. No network or file I/O.
//! The publisher decides how segments map onto its platform.

use chrono::FixedOffset;
use traffic_watch_geography::Roster;
use traffic_watch_incident_models::{PersistedSummary, UpdateType, format_local};
use traffic_watch_pipeline::Summary;

/// How a run ended, as far as the published output is concerned.
///
/// An empty feed result and a feed that returned nothing relevant are
/// different conditions and render differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The feed returned zero raw incidents; the service is likely down.
    FeedUnavailable,
    /// The feed worked but nothing relevant survived filtering.
    NothingToReport,
    /// Relevant incidents to publish.
    Report,
}

/// Disclaimer appended to every non-empty summary thread.
pub const DISCLAIMER: &str = "Disclaimer: This bot posts incidents called into 911 \
     and is not representative of all traffic violence that occurred.";

/// Builds the thread segments for one incident: the original report with
/// its local timestamp, each later amendment, and a representative
/// call-out when the incident landed in a known district.
#[must_use]
pub fn incident_thread(
    summary: &PersistedSummary,
    offset: FixedOffset,
    roster: Option<&Roster>,
) -> Vec<String> {
    let mut segments = vec![format!("{}\n\n{}", summary.raw, summary.date)];

    for update in summary.updates.values() {
        if update.update_type == UpdateType::Root {
            continue;
        }
        segments.push(format!(
            "{}\n\n{}",
            update.text,
            format_local(update.ts, offset)
        ));
    }

    if let (Some(district), Some(roster)) = (summary.district.as_deref(), roster) {
        if let Some(representative) = roster.representatives.get(district) {
            segments.push(format!(
                "This incident occurred in {} {district}.\n\nRepresentative: {representative}",
                roster.district_term
            ));
        }
    }

    segments
}

/// Builds the summary thread posted after all incident threads.
///
/// The headline carries one clause per non-zero tally; zero incidents
/// yields the "nothing to report" message instead.
#[must_use]
pub fn summary_thread(
    incidents: &[PersistedSummary],
    summary: &Summary,
    days: u32,
    location: &str,
    roster: Option<&Roster>,
) -> Vec<String> {
    let count = incidents.len();
    if count == 0 {
        return vec![format!(
            "There were no incidents of traffic violence reported to 911 today in the {location} area."
        )];
    }

    let mut headline = format!(
        "There {} {count} incident{} of traffic violence found over the last {}.",
        if count == 1 { "was" } else { "were" },
        if count == 1 { "" } else { "s" },
        if days == 1 {
            "24 hours".to_string()
        } else {
            format!("{days} days")
        },
    );

    for clause in tally_clauses(summary, count) {
        headline.push_str("\n\n");
        headline.push_str(&clause);
    }

    if let Some(roster) = roster {
        if let Some(sentence) = district_sentence(incidents, roster) {
            headline.push_str("\n\n");
            headline.push_str(&sentence);
        }
    }

    let mut thread = vec![headline, DISCLAIMER.to_string()];

    if let Some(roster) = roster {
        if !roster.at_large.is_empty() {
            thread.push(format!(
                "At large city council representatives and president: {}",
                format_list(&roster.at_large)
            ));
        }
    }

    thread
}

/// Notice posted when the feed returns nothing at all.
#[must_use]
pub fn feed_unavailable_notice(location: &str) -> String {
    format!(
        "The 911 incident feed for {location} seems to be down today. Travel safely out there!"
    )
}

fn tally_clauses(summary: &Summary, total: usize) -> Vec<String> {
    let mut clauses = Vec::new();

    if summary.ped_bike > 0 {
        clauses.push(format!(
            "{} involved pedestrians or cyclists",
            summary.ped_bike
        ));
    }
    if summary.hit_and_run > 0 {
        clauses.push(format!("{} were hit-and-runs", summary.hit_and_run));
    }
    if summary.vehicular_assault > 0 {
        clauses.push(format!(
            "{} involved vehicular assault",
            summary.vehicular_assault
        ));
    }
    if summary.overturned > 0 {
        clauses.push(format!(
            "{} involved overturning/flipping vehicles",
            summary.overturned
        ));
    }
    if summary.injury > 0 {
        clauses.push(format!("{} mentioned injuries", summary.injury));
    }
    if summary.collision > 0 {
        if summary.collision == total {
            clauses.push("All were collisions".to_string());
        } else {
            clauses.push(format!("{} were collisions", summary.collision));
        }
    }

    clauses
}

/// "The crash(es) occurred in <term>(s) A, B, and C." over the distinct,
/// sorted districts of the final list. `None` when no incident has a
/// district.
fn district_sentence(incidents: &[PersistedSummary], roster: &Roster) -> Option<String> {
    let mut districts: Vec<&str> = incidents
        .iter()
        .filter_map(|incident| incident.district.as_deref())
        .collect();
    districts.sort_unstable();
    districts.dedup();

    if districts.is_empty() {
        return None;
    }

    let subject = if incidents.len() == 1 {
        "The crash occurred in"
    } else {
        "The crashes occurred in"
    };
    let term_suffix = if districts.len() == 1 { "" } else { "s" };
    let owned: Vec<String> = districts.iter().map(ToString::to_string).collect();

    Some(format!(
        "{subject} {}{term_suffix} {}.",
        roster.district_term,
        format_list(&owned)
    ))
}

/// English list formatting: "A", "A and B", "A, B, and C".
#[must_use]
pub fn format_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use traffic_watch_incident_models::{IncidentUpdate, UpdateType};

    use super::*;

    fn offset() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    fn summary(key: &str, raw: &str, district: Option<&str>) -> PersistedSummary {
        PersistedSummary {
            key: key.into(),
            raw: raw.into(),
            ts: 1_700_000_000_000,
            date: "11/14/2023, 5:13:20 PM".into(),
            ll: Some([38.9, -77.0]),
            share_map: None,
            updates: BTreeMap::new(),
            district: district.map(str::to_string),
        }
    }

    fn roster() -> Roster {
        Roster {
            district_term: "ward".into(),
            representatives: BTreeMap::from([
                ("1".to_string(), "@one".to_string()),
                ("2".to_string(), "@two".to_string()),
            ]),
            at_large: vec!["@chair".into(), "@atlarge".into()],
        }
    }

    #[test]
    fn incident_thread_skips_root_update_and_adds_representative() {
        let mut incident = summary("k1", "Pedestrian struck by vehicle", Some("1"));
        incident.updates.insert(
            "u0".into(),
            IncidentUpdate {
                update_type: UpdateType::Root,
                text: "Pedestrian struck by vehicle".into(),
                ts: 1_700_000_000_000,
            },
        );
        incident.updates.insert(
            "u1".into(),
            IncidentUpdate {
                update_type: UpdateType::Update,
                text: "Victim transported to hospital".into(),
                ts: 1_700_000_600_000,
            },
        );

        let segments = incident_thread(&incident, offset(), Some(&roster()));
        assert_eq!(segments.len(), 3);
        assert!(segments[0].starts_with("Pedestrian struck by vehicle"));
        assert!(segments[1].starts_with("Victim transported"));
        assert!(segments[2].contains("ward 1"));
        assert!(segments[2].contains("@one"));
    }

    #[test]
    fn incident_thread_without_district_has_no_representative_segment() {
        let segments = incident_thread(
            &summary("k1", "Car crash", None),
            offset(),
            Some(&roster()),
        );
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn summary_headline_pluralization() {
        let one = summary_thread(
            &[summary("k1", "Car collision", None)],
            &Summary {
                collision: 1,
                ..Summary::default()
            },
            1,
            "dc",
            None,
        );
        assert!(one[0].starts_with("There was 1 incident of traffic violence"));
        assert!(one[0].contains("24 hours"));
        assert!(one[0].contains("All were collisions"));
        assert_eq!(one[1], DISCLAIMER);

        let many = summary_thread(
            &[
                summary("k1", "Car collision", None),
                summary("k2", "Hit-and-run", None),
            ],
            &Summary {
                collision: 1,
                hit_and_run: 1,
                ..Summary::default()
            },
            3,
            "dc",
            None,
        );
        assert!(many[0].starts_with("There were 2 incidents"));
        assert!(many[0].contains("3 days"));
        assert!(many[0].contains("1 were hit-and-runs"));
        assert!(many[0].contains("1 were collisions"));
    }

    #[test]
    fn empty_report_renders_nothing_to_report() {
        let thread = summary_thread(&[], &Summary::default(), 1, "dc", None);
        assert_eq!(thread.len(), 1);
        assert!(thread[0].contains("no incidents of traffic violence"));
        assert!(thread[0].contains("dc"));
    }

    #[test]
    fn feed_outage_is_distinct_from_empty_report() {
        let notice = feed_unavailable_notice("dc");
        assert!(notice.contains("seems to be down"));
        assert_ne!(
            vec![notice],
            summary_thread(&[], &Summary::default(), 1, "dc", None)
        );
    }

    #[test]
    fn district_sentence_lists_sorted_unique_districts() {
        let incidents = vec![
            summary("k1", "Car collision", Some("2")),
            summary("k2", "Hit-and-run", Some("1")),
            summary("k3", "Car crash", Some("2")),
        ];
        let thread = summary_thread(
            &incidents,
            &Summary {
                collision: 1,
                ..Summary::default()
            },
            1,
            "dc",
            Some(&roster()),
        );

        assert!(thread[0].contains("The crashes occurred in wards 1 and 2."));
        assert!(thread[2].starts_with("At large"));
        assert!(thread[2].contains("@chair and @atlarge"));
    }

    #[test]
    fn list_formatting() {
        let items: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(format_list(&items), "a, b, and c");
        assert_eq!(format_list(&items[..2]), "a and b");
        assert_eq!(format_list(&items[..1]), "a");
        assert_eq!(format_list(&[]), "");
    }
}
