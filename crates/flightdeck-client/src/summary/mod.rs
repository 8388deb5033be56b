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

//! Summary figures for the status bar and per-row badges.

use std::fmt;

use crate::model::Flight;

/// Traffic level for the number of flights in view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficStatus {
    NoTargets,
    LowTraffic,
    Active,
    HighDensity,
}

impl TrafficStatus {
    #[must_use]
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Self::NoTargets,
            1..=4 => Self::LowTraffic,
            5..=14 => Self::Active,
            _ => Self::HighDensity,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NoTargets => "NO TARGETS",
            Self::LowTraffic => "LOW TRAFFIC",
            Self::Active => "ACTIVE",
            Self::HighDensity => "HIGH DENSITY",
        }
    }
}

impl fmt::Display for TrafficStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Three-cell density gauge.
#[must_use]
pub fn density_glyph(count: usize) -> &'static str {
    match count {
        0..=3 => "▢▢▢",
        4..=8 => "▣▢▢",
        9..=15 => "▣▣▢",
        _ => "▣▣▣",
    }
}

/// Badge for how often an aircraft has been seen.
#[must_use]
pub fn seen_indicator(times_seen: Option<u64>) -> &'static str {
    match times_seen.unwrap_or(0) {
        10.. => " ✦",
        6..=9 => " ••",
        3..=5 => " •",
        _ => "",
    }
}

/// The flight with the highest sighting count. Earlier flights win ties.
#[must_use]
pub fn most_observed(flights: &[Flight]) -> Option<&Flight> {
    flights.iter().reduce(|best, flight| {
        if flight.times_seen.unwrap_or(0) > best.times_seen.unwrap_or(0) {
            flight
        } else {
            best
        }
    })
}

/// Whether `iata` is one of the configured local airports.
#[must_use]
pub fn is_local_airport<S: AsRef<str>>(iata: Option<&str>, local_airports: &[S]) -> bool {
    iata.filter(|code| !code.is_empty()).is_some_and(|code| {
        local_airports
            .iter()
            .any(|local| local.as_ref().eq_ignore_ascii_case(code))
    })
}
