// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP client for the flight logging backend.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use log::debug;

use super::{get_json, FetchError, FlightSource};
use crate::model::Flight;

/// Time window for the route map statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteRange {
    #[default]
    All,
    Week,
}

impl RouteRange {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Week => "week",
        }
    }
}

/// Aggregate statistics exposed under `/api/stats/`.
///
/// Response bodies differ per statistic and are handed back untouched as
/// [`serde_json::Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsEndpoint {
    Summary,
    Summary24h,
    ClassificationDetailed,
    Hourly,
    TopAircraft,
    TopOperators,
    Countries,
    Routes,
    AltitudeDistribution,
    AircraftTypes,
    ActivityByDay,
    RecentNotable,
    RoutesMap(RouteRange),
}

impl StatsEndpoint {
    /// Every statistic the dashboard loads, with the route map over all time.
    pub const ALL: [StatsEndpoint; 13] = [
        Self::Summary,
        Self::Summary24h,
        Self::ClassificationDetailed,
        Self::Hourly,
        Self::TopAircraft,
        Self::TopOperators,
        Self::Countries,
        Self::Routes,
        Self::AltitudeDistribution,
        Self::AircraftTypes,
        Self::ActivityByDay,
        Self::RecentNotable,
        Self::RoutesMap(RouteRange::All),
    ];

    /// Path segment after `/api/stats/`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Summary24h => "summary-24h",
            Self::ClassificationDetailed => "classification-detailed",
            Self::Hourly => "hourly",
            Self::TopAircraft => "top-aircraft",
            Self::TopOperators => "top-operators",
            Self::Countries => "countries",
            Self::Routes => "routes",
            Self::AltitudeDistribution => "altitude-distribution",
            Self::AircraftTypes => "aircraft-types",
            Self::ActivityByDay => "activity-by-day",
            Self::RecentNotable => "recent-notable",
            Self::RoutesMap(_) => "routes-map",
        }
    }
}

impl fmt::Display for StatsEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoutesMap(range) => write!(f, "routes-map?range={}", range.as_str()),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for StatsEndpoint {
    type Err = String;

    /// Parses names like `top-aircraft`, plus `routes-map-week` for the
    /// weekly route map.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "routes-map-week" => return Ok(Self::RoutesMap(RouteRange::Week)),
            "routes-map" | "routes-map-all" => return Ok(Self::RoutesMap(RouteRange::All)),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|endpoint| endpoint.name() == s)
            .ok_or_else(|| format!("unknown statistic: {s}"))
    }
}

/// Client for `/api/flights` and `/api/stats/*`.
#[derive(Debug, Clone)]
pub struct HttpFlightApi {
    client: reqwest::Client,
    base: String,
}

impl HttpFlightApi {
    /// Create a client for the backend at `base`, e.g. `http://localhost:8080`.
    #[must_use]
    pub fn new(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Fetch one statistic as raw JSON.
    pub async fn stats(&self, endpoint: StatsEndpoint) -> Result<serde_json::Value, FetchError> {
        let url = format!("{}/api/stats/{}", self.base, endpoint.name());
        let mut request = self.client.get(&url);
        if let StatsEndpoint::RoutesMap(range) = endpoint {
            request = request.query(&[("range", range.as_str())]);
        }
        debug!("Fetching statistic {}", endpoint);
        get_json(request, &url).await
    }
}

#[async_trait]
impl FlightSource for HttpFlightApi {
    async fn list_flights(&self, limit: usize) -> Result<Vec<Flight>, FetchError> {
        let url = format!("{}/api/flights", self.base);
        let request = self.client.get(&url).query(&[("limit", limit)]);
        get_json(request, &url).await
    }

    async fn search_by_time(&self, datetime: &str) -> Result<Vec<Flight>, FetchError> {
        let url = format!("{}/api/flights/search-by-time", self.base);
        let request = self.client.get(&url).query(&[("datetime", datetime)]);
        get_json(request, &url).await
    }
}
