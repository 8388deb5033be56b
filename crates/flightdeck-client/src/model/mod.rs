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

//! Wire model for the flight logging API and the photo lookup service.
//!
//! Every attribute of a [`Flight`] is optional: the backend omits columns it
//! has not enriched yet, and the client must render whatever it is given.
//! Attributes the client does not interpret are kept in [`Flight::extra`] so
//! nothing is lost when a record is passed through to the display layer.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// Formats the backend uses for naive local timestamps
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Stable identity of a flight record.
///
/// The backend uses integer primary keys, but the client treats the id as
/// opaque and accepts string ids as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlightId {
    Int(i64),
    Text(String),
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for FlightId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for FlightId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// One tracked flight as returned by `/api/flights`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    /// Record id. `None` for transient rows that carry no merge guarantee.
    #[serde(default)]
    pub id: Option<FlightId>,
    #[serde(default)]
    pub callsign: Option<String>,
    /// Aircraft registration (tail number).
    #[serde(default)]
    pub reg: Option<String>,
    /// ICAO aircraft type designator, e.g. "B738".
    #[serde(default)]
    pub type_code: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub origin_iata: Option<String>,
    #[serde(default)]
    pub dest_iata: Option<String>,
    /// Last time the backend saw this flight, exactly as sent on the wire.
    #[serde(default)]
    pub last_seen: Option<String>,
    /// Number of sightings. Owned by the backend, never modified locally.
    #[serde(default)]
    pub times_seen: Option<u64>,
    /// Everything else the backend sends.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Flight {
    /// Fields searched by the text filter, in display order.
    #[must_use]
    pub fn searchable_fields(&self) -> [Option<&str>; 6] {
        [
            self.callsign.as_deref(),
            self.reg.as_deref(),
            self.type_code.as_deref(),
            self.model.as_deref(),
            self.origin_iata.as_deref(),
            self.dest_iata.as_deref(),
        ]
    }

    /// Registration if present and non-empty.
    #[must_use]
    pub fn registration(&self) -> Option<&str> {
        self.reg.as_deref().filter(|reg| !reg.is_empty())
    }

    /// Parse `last_seen` into an absolute timestamp.
    ///
    /// Accepts RFC 3339 as well as the naive ISO timestamps the backend writes,
    /// which are interpreted in the local time zone.
    #[must_use]
    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.last_seen.as_deref()?.trim();

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }

        NAIVE_TIMESTAMP_FORMATS.iter().find_map(|format| {
            let naive = NaiveDateTime::parse_from_str(raw, format).ok()?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|ts| ts.with_timezone(&Utc))
        })
    }
}

/// An aircraft photo from the photo lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    /// Large thumbnail image URL.
    pub thumbnail_url: Option<String>,
    /// Page on the photo service crediting the photographer.
    pub link: Option<String>,
    pub photographer: Option<String>,
}

/// Cached state of a photo lookup for one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoEntry {
    /// No lookup has been issued yet. Eligible for an on-demand fetch.
    NotRequested,
    /// Looked up, nothing usable came back. Never fetched again.
    Absent,
    /// Looked up and found.
    Present(Photo),
}

impl PhotoEntry {
    /// True once a lookup has completed, whatever its outcome.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::NotRequested)
    }

    #[must_use]
    pub fn photo(&self) -> Option<&Photo> {
        match self {
            Self::Present(photo) => Some(photo),
            _ => None,
        }
    }
}

/// The photo chosen to illustrate a flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestPhoto {
    pub photo: Photo,
    /// True when the photo was borrowed from another aircraft of the same type.
    pub is_fallback: bool,
    /// Registration the photo was actually taken of.
    pub source_reg: String,
}
