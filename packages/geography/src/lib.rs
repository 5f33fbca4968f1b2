#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Council district geofencing and representative rosters.
//!
//! Maps incident coordinates to council districts via point-in-polygon
//! over a `GeoJSON` feature collection. District sets are tens of
//! features at most, so a linear scan suffices.

use std::collections::BTreeMap;

use geo::{Contains, MultiPolygon, Point};
use geojson::GeoJson;
use serde::Deserialize;
use traffic_watch_incident_models::Incident;

/// Errors that can occur while loading district boundaries.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// The boundary file is not valid `GeoJSON`.
    #[error("GeoJSON parse error: {0}")]
    Parse(#[from] geojson::Error),

    /// The boundary file holds no usable polygon features.
    #[error("no district polygons in feature collection")]
    NoDistricts,
}

/// Representative roster for one location, loaded from config.
///
/// Keys of `representatives` are district labels as they appear in the
/// boundary file's `NAME` property.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Roster {
    /// How this location names its districts (e.g. "ward",
    /// "city council district").
    pub district_term: String,
    /// District label -> representative handle or name.
    #[serde(default)]
    pub representatives: BTreeMap<String, String>,
    /// At-large representatives, listed in the summary thread.
    #[serde(default)]
    pub at_large: Vec<String>,
}

#[derive(Debug)]
struct DistrictEntry {
    name: String,
    polygon: MultiPolygon<f64>,
}

/// District polygons for one location, ready for lookups.
#[derive(Debug)]
pub struct DistrictIndex {
    districts: Vec<DistrictEntry>,
}

impl DistrictIndex {
    /// Parses a `GeoJSON` feature collection of district polygons.
    ///
    /// Each feature's `NAME` property becomes the district label.
    /// Features without a usable polygon or name are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the input is not valid `GeoJSON` or no
    /// feature yields a polygon.
    pub fn from_geojson_str(geojson_str: &str) -> Result<Self, GeoError> {
        let GeoJson::FeatureCollection(collection) = geojson_str.parse::<GeoJson>()? else {
            return Err(GeoError::NoDistricts);
        };

        let mut districts = Vec::new();
        for feature in collection.features {
            let Some(name) = feature
                .property("NAME")
                .and_then(geojson::JsonValue::as_str)
                .map(str::to_string)
            else {
                log::warn!("district feature without a NAME property, skipping");
                continue;
            };
            let Some(polygon) = feature.geometry.and_then(to_multipolygon) else {
                log::warn!("district {name} has no polygon geometry, skipping");
                continue;
            };
            districts.push(DistrictEntry { name, polygon });
        }

        if districts.is_empty() {
            return Err(GeoError::NoDistricts);
        }
        log::info!("loaded {} district polygons", districts.len());

        Ok(Self { districts })
    }

    /// Looks up the district containing a point. Districts tile the city
    /// without overlap, so first match wins.
    #[must_use]
    pub fn lookup(&self, longitude: f64, latitude: f64) -> Option<&str> {
        let point = Point::new(longitude, latitude);
        self.districts
            .iter()
            .find(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.name.as_str())
    }

    /// Fills the `district` field of each incident from its coordinates.
    /// Incidents outside every district are left untouched.
    pub fn assign_districts(&self, incidents: &mut [Incident]) {
        for incident in incidents {
            incident.district = self
                .lookup(incident.longitude, incident.latitude)
                .map(str::to_string);
        }
    }
}

fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}
