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

//! Remote data sources.
//!
//! The caches never talk HTTP directly. They are handed a [`FlightSource`] or
//! [`PhotoSource`] so the polling and caching logic can be exercised without
//! a network, and so the backend location is injected rather than ambient.

mod http;
mod planespotters;

pub use http::{HttpFlightApi, RouteRange, StatsEndpoint};
pub use planespotters::{PlanespottersApi, DEFAULT_PLANESPOTTERS_BASE};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Flight, Photo};

/// Errors that can occur while fetching remote data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot build request URL from {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Source of flight listings.
#[async_trait]
pub trait FlightSource: Send + Sync {
    /// Fetch the most recent flights, newest first, at most `limit` of them.
    async fn list_flights(&self, limit: usize) -> Result<Vec<Flight>, FetchError>;

    /// Fetch flights seen around the given local datetime string.
    async fn search_by_time(&self, datetime: &str) -> Result<Vec<Flight>, FetchError>;
}

/// Source of aircraft photos keyed by registration.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// All photos known for `reg`, best first. Empty when none exist.
    async fn photos_for_registration(&self, reg: &str) -> Result<Vec<Photo>, FetchError>;
}

/// Issue a GET and decode the JSON body, mapping each failure stage to a
/// [`FetchError`] variant.
pub(crate) async fn get_json<T>(request: reqwest::RequestBuilder, url: &str) -> Result<T, FetchError>
where
    T: serde::de::DeserializeOwned,
{
    let response = request.send().await.map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })?;

    serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}
