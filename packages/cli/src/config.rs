//! Per-location TOML configuration.
//!
//! One `locations.toml` holds every metro area the bot can run against:
//! the feed bounding box, the local UTC offset, the archive policy, and
//! the optional representative roster for district call-outs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::Deserialize;
use traffic_watch_geography::Roster;
use traffic_watch_source::BoundingBox;

use crate::CliError;

/// Default feed record cap per day of lookback. Generous enough to
/// cover a busy day in the largest configured metro.
const DEFAULT_PER_DAY_LIMIT: u64 = 200;

/// Default number of days into a new month during which the previous
/// month's archive partition is still consulted.
const DEFAULT_GRACE_DAYS: u32 = 3;

fn default_per_day_limit() -> u64 {
    DEFAULT_PER_DAY_LIMIT
}

fn default_grace_days() -> u32 {
    DEFAULT_GRACE_DAYS
}

/// The whole config file: location id -> location settings.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// All configured locations.
    pub locations: BTreeMap<String, LocationConfig>,
}

/// Settings for one metro area.
#[derive(Debug, Deserialize)]
pub struct LocationConfig {
    /// Feed query bounding box.
    pub bounds: BoundingBox,
    /// Local UTC offset in minutes (e.g. -300 for US Eastern standard).
    pub utc_offset_minutes: i32,
    /// Feed record cap per day of lookback.
    #[serde(default = "default_per_day_limit")]
    pub per_day_limit: u64,
    /// Days into a new month the previous archive partition still
    /// participates in deduplication.
    #[serde(default = "default_grace_days")]
    pub grace_days: u32,
    /// Path to the district boundary `GeoJSON`, for `--with-districts`.
    #[serde(default)]
    pub geojson_path: Option<PathBuf>,
    /// Representative roster, for district call-outs in the report.
    #[serde(default)]
    pub roster: Option<Roster>,
}

impl LocationConfig {
    /// The location's fixed UTC offset.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the configured offset is out of
    /// range (beyond ±24 hours).
    pub fn offset(&self) -> Result<FixedOffset, CliError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| CliError::Config {
            message: format!("utc_offset_minutes {} out of range", self.utc_offset_minutes),
        })
    }
}

impl Config {
    /// Loads and parses the config file.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Looks up a location by id.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::UnknownLocation`] if the id is not configured.
    pub fn location(&self, id: &str) -> Result<&LocationConfig, CliError> {
        self.locations
            .get(id)
            .ok_or_else(|| CliError::UnknownLocation {
                location: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [locations.dc]
        utc_offset_minutes = -300
        geojson_path = "assets/dc/wards.geojson"

        [locations.dc.bounds]
        lower_latitude = 38.791
        lower_longitude = -77.120
        upper_latitude = 38.996
        upper_longitude = -76.909

        [locations.dc.roster]
        district_term = "ward"
        at_large = ["@chair"]

        [locations.dc.roster.representatives]
        "Ward 1" = "@wardone"

        [locations.richmond]
        utc_offset_minutes = -300
        per_day_limit = 400
        grace_days = 5

        [locations.richmond.bounds]
        lower_latitude = 37.425
        lower_longitude = -77.669
        upper_latitude = 37.716
        upper_longitude = -77.285
    "#;

    #[test]
    fn parses_locations_with_defaults() {
        let config: Config = toml::from_str(SAMPLE).unwrap();

        let dc = config.location("dc").unwrap();
        assert_eq!(dc.per_day_limit, 200);
        assert_eq!(dc.grace_days, 3);
        assert!(dc.roster.is_some());
        assert_eq!(
            dc.roster.as_ref().unwrap().representatives["Ward 1"],
            "@wardone"
        );

        let richmond = config.location("richmond").unwrap();
        assert_eq!(richmond.per_day_limit, 400);
        assert_eq!(richmond.grace_days, 5);
        assert!(richmond.roster.is_none());
    }

    #[test]
    fn unknown_location_is_an_error() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert!(matches!(
            config.location("atlantis"),
            Err(CliError::UnknownLocation { .. })
        ));
    }

    #[test]
    fn offset_round_trips() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let offset = config.location("dc").unwrap().offset().unwrap();
        assert_eq!(offset.local_minus_utc(), -300 * 60);
    }
}
