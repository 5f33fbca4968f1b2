#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Keyword-based traffic violence category classification.
//!
//! Each category is defined by a fixed, hand-curated keyword set matched
//! case-insensitively as substrings of the incident description. These are
//! pure predicates; an incident can match several categories at once, and
//! the filter pipeline decides precedence.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Traffic violence categories assigned by the filter pipeline.
///
/// [`Category::WeaponsOrRobbery`] is exclusionary: incidents matching it
/// are crime reports that happen to mention vehicles (getaway cars,
/// suspects who fled) and are vetoed from every other category.
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
pub enum Category {
    /// Pedestrian, cyclist, or scooter rider involvement.
    PedBike,
    /// Vehicle-only collision, nobody outside a car mentioned.
    VehicleOnly,
    /// Vehicle flipped or overturned.
    Flipped,
    /// Driver left the scene.
    HitAndRun,
    /// Vehicle used as a weapon.
    VehicularAssault,
    /// Weapons or robbery report; vetoes everything else.
    WeaponsOrRobbery,
}

impl Category {
    /// Tests whether already-lowercased text matches this category's
    /// keyword set.
    #[must_use]
    pub fn matches(self, text: &str) -> bool {
        match self {
            Self::PedBike => contains_ped_bike_text(text),
            Self::VehicleOnly => contains_vehicle_only_text(text),
            Self::Flipped => contains_flipped_text(text),
            Self::HitAndRun => contains_hit_and_run_text(text),
            Self::VehicularAssault => contains_vehicular_assault_text(text),
            Self::WeaponsOrRobbery => contains_weapons_or_robbery_text(text),
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Weapons or robbery vocabulary. "unfounded" is here because the feed
/// appends it to retracted reports.
#[must_use]
pub fn contains_weapons_or_robbery_text(text: &str) -> bool {
    contains_any(
        text,
        &[
            "unfounded",
            "robbed",
            "robber",
            "burglar",
            "breaking into",
            "broke into",
            "stolen",
            "gunmen",
            "gunman",
            "gunpoint",
            "gunfire",
            "armed",
            "fled",
        ],
    )
}

/// Pedestrian, cyclist, and micromobility vocabulary.
#[must_use]
pub fn contains_ped_bike_text(text: &str) -> bool {
    contains_any(
        text,
        &[
            "pedestrian",
            "cyclist",
            "struck by vehicle",
            "hit by vehicle",
            "bicycle",
            "scooter",
        ],
    )
}

/// Vehicle-only collision vocabulary. "car" alone is too noisy, so it
/// only counts alongside "crash" or "collision".
#[must_use]
pub fn contains_vehicle_only_text(text: &str) -> bool {
    (text.contains("car") && (text.contains("crash") || text.contains("collision")))
        || contains_any(
            text,
            &[
                "vehicle crashed",
                "vehicle careened",
                "vehicle collision",
                "dragging vehicle",
            ],
        )
}

/// Overturned/flipped vehicle vocabulary.
#[must_use]
pub fn contains_flipped_text(text: &str) -> bool {
    contains_any(text, &["vehicle flipped", "overturned vehicle"])
}

/// Hit-and-run vocabulary. The feed always hyphenates it.
#[must_use]
pub fn contains_hit_and_run_text(text: &str) -> bool {
    text.contains("hit-and-run")
}

/// Vehicular assault vocabulary.
#[must_use]
pub fn contains_vehicular_assault_text(text: &str) -> bool {
    text.contains("vehicular assault")
}
