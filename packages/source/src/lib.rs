#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident feed source trait and the trending-feed fetcher.
//!
//! The pipeline only consumes the resulting incident array; everything
//! about how it is obtained lives behind [`IncidentSource`].

use async_trait::async_trait;
use serde::Deserialize;
use traffic_watch_incident_models::Incident;

/// Errors that can occur while fetching the incident feed.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON shape.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Geographic bounding box for the feed query.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub lower_latitude: f64,
    /// Western edge.
    pub lower_longitude: f64,
    /// Northern edge.
    pub upper_latitude: f64,
    /// Eastern edge.
    pub upper_longitude: f64,
}

/// One feed query: a bounding box and a record cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchQuery {
    /// Area to query.
    pub bounds: BoundingBox,
    /// Maximum number of records to return.
    pub limit: u64,
}

/// Supplier of raw incident records for a bounding region.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    /// Fetches up to `query.limit` recent incidents inside the bounds.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the fetch or parse fails.
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Incident>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    results: Vec<Incident>,
}

/// Fetcher for the Citizen-style trending incident endpoint.
pub struct CitizenSource {
    client: reqwest::Client,
    base_url: String,
}

impl CitizenSource {
    /// Default production endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://citizen.com";

    /// Creates a fetcher against the production endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL)
    }

    /// Creates a fetcher against an alternate endpoint (tests, mirrors).
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn trending_url(&self, query: &FetchQuery) -> String {
        format!(
            "{}/api/incident/trending?lowerLatitude={}&lowerLongitude={}&upperLatitude={}&upperLongitude={}&fullResponse=true&limit={}",
            self.base_url,
            query.bounds.lower_latitude,
            query.bounds.lower_longitude,
            query.bounds.upper_latitude,
            query.bounds.upper_longitude,
            query.limit,
        )
    }
}

impl Default for CitizenSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IncidentSource for CitizenSource {
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<Incident>, SourceError> {
        let url = self.trending_url(query);
        log::info!("fetching incident feed: {url}");

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let response: TrendingResponse = serde_json::from_str(&body)?;
        log::info!("feed returned {} incidents", response.results.len());
        Ok(response.results)
    }
}
