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

//! Live flight snapshot and its derived views.
//!
//! [`LiveSnapshotCache`] holds the latest complete listing from the backend.
//! A successful refresh replaces the listing wholesale. A failed one leaves
//! the previous listing in place so the display keeps showing the last known
//! state. Alongside the listing the cache remembers when each flight id was
//! first observed locally, which drives the short "fresh" highlight on newly
//! appeared rows.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, error, info};

use crate::api::{FetchError, FlightSource};
use crate::model::{Flight, FlightId};

/// How long a newly observed flight counts as fresh.
pub const FRESH_WINDOW: Duration = Duration::from_millis(8000);

// Staged row fading by backend last_seen age
const OPACITY_FULL_SECS: f64 = 30.0;
const OPACITY_STALE_SECS: f64 = 120.0;
const OPACITY_OLD_SECS: f64 = 300.0;
const OPACITY_STALE: f32 = 0.86;
const OPACITY_OLD: f32 = 0.68;

/// Opacity of rows whose last sighting is five minutes old or unknown.
pub const OPACITY_FLOOR: f32 = 0.48;

/// Display weight for a row based on how long ago the backend last saw it.
///
/// Full weight under 30 s, then 0.86 under 120 s, 0.68 under 300 s and
/// [`OPACITY_FLOOR`] from there on. A missing or unparseable `last_seen`
/// also gets the floor.
#[must_use]
pub fn age_opacity(flight: &Flight, now: DateTime<Utc>) -> f32 {
    let Some(last_seen) = flight.last_seen_at() else {
        return OPACITY_FLOOR;
    };

    #[allow(clippy::cast_precision_loss, reason = "millisecond ages fit easily in f64")]
    let age_secs = (now - last_seen).num_milliseconds() as f64 / 1000.0;

    if age_secs < OPACITY_FULL_SECS {
        1.0
    } else if age_secs < OPACITY_STALE_SECS {
        OPACITY_STALE
    } else if age_secs < OPACITY_OLD_SECS {
        OPACITY_OLD
    } else {
        OPACITY_FLOOR
    }
}

/// Case-insensitive substring match over callsign, registration, type code,
/// model, origin and destination.
///
/// The query is trimmed first. An empty query returns every flight in its
/// original order.
#[must_use]
pub fn filter_by_text(flights: &[Flight], query: &str) -> Vec<Flight> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return flights.to_vec();
    }

    flights
        .iter()
        .filter(|flight| {
            flight
                .searchable_fields()
                .into_iter()
                .flatten()
                .any(|value| value.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
struct SnapshotState {
    flights: Vec<Flight>,
    first_seen: HashMap<FlightId, DateTime<Utc>>,
    last_refresh: Option<DateTime<Utc>>,
    applied_ticket: u64,
    query: String,
    /// Results of an active time search. Replaces the text-filtered view.
    time_results: Option<Vec<Flight>>,
    /// Bumped by every time search and clear; only the latest may install.
    time_generation: u64,
}

/// The authoritative local copy of the backend's current flight listing.
pub struct LiveSnapshotCache {
    source: Arc<dyn FlightSource>,
    limit: usize,
    fresh_window: TimeDelta,
    next_ticket: AtomicU64,
    state: RwLock<SnapshotState>,
}

impl std::fmt::Debug for LiveSnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSnapshotCache")
            .field("limit", &self.limit)
            .field("flight_count", &self.len())
            .finish_non_exhaustive()
    }
}

impl LiveSnapshotCache {
    /// Create an empty cache that lists at most `limit` flights per refresh.
    #[must_use]
    pub fn new(source: Arc<dyn FlightSource>, limit: usize) -> Self {
        Self {
            source,
            limit,
            fresh_window: TimeDelta::from_std(FRESH_WINDOW).unwrap_or(TimeDelta::MAX),
            next_ticket: AtomicU64::new(0),
            state: RwLock::new(SnapshotState::default()),
        }
    }

    /// Override the fresh window.
    #[must_use]
    pub fn with_fresh_window(mut self, window: Duration) -> Self {
        self.fresh_window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
        self
    }

    /// Fetch the current listing and replace the snapshot with it.
    ///
    /// On failure the snapshot and first-seen record are left untouched and
    /// the error is logged and returned. Returns the number of flights in the
    /// new listing on success.
    pub async fn refresh(&self) -> Result<usize, FetchError> {
        let ticket = self.take_ticket();

        match self.source.list_flights(self.limit).await {
            Ok(flights) => {
                let count = flights.len();
                if self.apply(ticket, flights, Utc::now()) {
                    debug!("Refresh #{} applied ({} flights)", ticket, count);
                }
                Ok(count)
            }
            Err(e) => {
                error!("Flight refresh failed: {}", e);
                Err(e)
            }
        }
    }

    /// Install an already fetched listing as observed at `now`.
    pub fn ingest(&self, flights: Vec<Flight>, now: DateTime<Utc>) {
        let ticket = self.take_ticket();
        self.apply(ticket, flights, now);
    }

    fn take_ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the snapshot unless a newer refresh has already been applied.
    fn apply(&self, ticket: u64, flights: Vec<Flight>, now: DateTime<Utc>) -> bool {
        let Ok(mut state) = self.state.write() else {
            return false;
        };

        if ticket <= state.applied_ticket {
            debug!(
                "Discarding refresh #{} (already applied #{})",
                ticket, state.applied_ticket
            );
            return false;
        }

        let active: HashSet<&FlightId> = flights.iter().filter_map(|f| f.id.as_ref()).collect();

        let before = state.first_seen.len();
        state.first_seen.retain(|id, _| active.contains(id));
        let departed = before - state.first_seen.len();

        let mut arrived = 0;
        for id in active {
            state.first_seen.entry(id.clone()).or_insert_with(|| {
                arrived += 1;
                now
            });
        }

        if arrived > 0 || departed > 0 {
            info!(
                "Snapshot: {} flights ({} new, {} gone)",
                flights.len(),
                arrived,
                departed
            );
        }

        state.flights = flights;
        state.last_refresh = Some(now);
        state.applied_ticket = ticket;
        true
    }

    /// Current listing, in backend order.
    #[must_use]
    pub fn flights(&self) -> Vec<Flight> {
        self.state
            .read()
            .map(|s| s.flights.clone())
            .unwrap_or_default()
    }

    /// Number of flights in the current listing.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.flights.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// When `id` was first observed locally, if it is in the current listing.
    #[must_use]
    pub fn first_seen(&self, id: &FlightId) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.first_seen.get(id).copied())
    }

    /// Ids that currently have a first-seen record.
    #[must_use]
    pub fn tracked_ids(&self) -> HashSet<FlightId> {
        self.state
            .read()
            .map(|s| s.first_seen.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Completion time of the last applied refresh.
    #[must_use]
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.state.read().ok().and_then(|s| s.last_refresh)
    }

    /// Whole seconds since the last applied refresh, never negative.
    #[must_use]
    pub fn seconds_since_refresh(&self, now: DateTime<Utc>) -> Option<u64> {
        self.last_refresh()
            .map(|at| u64::try_from((now - at).num_seconds()).unwrap_or(0))
    }

    /// True while `id` was first observed less than the fresh window ago.
    #[must_use]
    pub fn is_fresh(&self, id: &FlightId, now: DateTime<Utc>) -> bool {
        self.first_seen(id)
            .is_some_and(|first| now - first < self.fresh_window)
    }

    /// Text-filter the current listing without changing the stored query.
    #[must_use]
    pub fn apply_text_filter(&self, query: &str) -> Vec<Flight> {
        self.state
            .read()
            .map(|s| filter_by_text(&s.flights, query))
            .unwrap_or_default()
    }

    /// Set the query used by [`filtered_view`](Self::filtered_view).
    pub fn set_query(&self, query: &str) {
        if let Ok(mut state) = self.state.write() {
            state.query = query.to_string();
        }
    }

    #[must_use]
    pub fn query(&self) -> String {
        self.state
            .read()
            .map(|s| s.query.clone())
            .unwrap_or_default()
    }

    /// Search the backend for flights around `datetime` and make the result
    /// the active view until cleared.
    ///
    /// A blank `datetime` clears the time search instead. A failed search is
    /// logged and installs an empty result. A search overtaken by a newer
    /// search or a clear returns its results without installing them.
    pub async fn apply_time_filter(&self, datetime: &str) -> Vec<Flight> {
        let datetime = datetime.trim();
        if datetime.is_empty() {
            self.clear_time_filter();
            return self.filtered_view();
        }

        let generation = match self.state.write() {
            Ok(mut state) => {
                state.time_generation += 1;
                state.time_generation
            }
            Err(_) => return Vec::new(),
        };

        let results = match self.source.search_by_time(datetime).await {
            Ok(results) => {
                info!("Time search for {} matched {} flights", datetime, results.len());
                results
            }
            Err(e) => {
                error!("Time search for {} failed: {}", datetime, e);
                Vec::new()
            }
        };

        if let Ok(mut state) = self.state.write() {
            if state.time_generation == generation {
                state.time_results = Some(results.clone());
            } else {
                debug!("Discarding superseded time search for {}", datetime);
            }
        }
        results
    }

    /// Drop the active time search, returning to the text-filtered listing.
    pub fn clear_time_filter(&self) {
        if let Ok(mut state) = self.state.write() {
            state.time_generation += 1;
            state.time_results = None;
        }
    }

    #[must_use]
    pub fn has_time_filter(&self) -> bool {
        self.state
            .read()
            .map(|s| s.time_results.is_some())
            .unwrap_or(false)
    }

    /// What the display should show: the time search result if one is
    /// active, otherwise the listing filtered by the stored query.
    #[must_use]
    pub fn filtered_view(&self) -> Vec<Flight> {
        self.state
            .read()
            .map(|s| match &s.time_results {
                Some(results) => results.clone(),
                None => filter_by_text(&s.flights, &s.query),
            })
            .unwrap_or_default()
    }
}
