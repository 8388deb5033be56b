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

//! Client library for a flight logging backend.
//!
//! Keeps a live, locally held copy of the backend's flight listing in sync by
//! polling, and lazily fills a photo cache for the aircraft on screen. The
//! pieces can be used on their own or through a [`Session`]:
//!
//! - **Snapshot layer** ([`snapshot`]): the current listing, first-seen
//!   tracking, text and time filters, row freshness and fading
//! - **Photo layer** ([`photos`]): per-registration photo cache with a
//!   same-type stand-in and a throttled bulk fill
//! - **Scheduler** ([`scheduler`]): data poll and clock timers
//! - **Sources** ([`api`]): HTTP clients for the backend and the photo service
//!
//! # Quick Start
//!
//! ```no_run
//! use flightdeck_client::{ClientConfig, Session};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(ClientConfig {
//!         api_base: "http://192.168.1.20:8080".to_string(),
//!         ..Default::default()
//!     })?;
//!     let scheduler = session.start_polling();
//!
//!     loop {
//!         let now = scheduler.now();
//!         for flight in session.snapshot().filtered_view() {
//!             println!("{:?} {:?}", flight.callsign, flight.reg);
//!         }
//!         println!("last sweep {:?}s ago", session.snapshot().seconds_since_refresh(now));
//!         tokio::time::sleep(Duration::from_secs(1)).await;
//!     }
//! }
//! ```

pub mod api;
pub mod model;
pub mod photos;
pub mod scheduler;
pub mod snapshot;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use api::{
    FetchError, FlightSource, HttpFlightApi, PhotoSource, PlanespottersApi, RouteRange,
    StatsEndpoint, DEFAULT_PLANESPOTTERS_BASE,
};
pub use model::{BestPhoto, Flight, FlightId, Photo, PhotoEntry};
pub use photos::{BulkFillReport, PhotoCache, BULK_FILL_DELAY};
pub use scheduler::{PollScheduler, SchedulerConfig, SchedulerState};
pub use snapshot::{age_opacity, filter_by_text, LiveSnapshotCache, FRESH_WINDOW, OPACITY_FLOOR};
pub use summary::{density_glyph, is_local_airport, most_observed, seen_indicator, TrafficStatus};

/// Configuration for a [`Session`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL.
    pub api_base: String,
    /// Photo service base URL.
    pub photo_api_base: String,
    /// Maximum flights requested per refresh.
    pub flight_limit: usize,
    /// Poll and clock periods.
    pub scheduler: SchedulerConfig,
    /// Pause between lookups during a photo bulk fill.
    pub photo_fill_delay: Duration,
    /// How long a newly observed flight is highlighted.
    pub fresh_window: Duration,
    /// Timeout for each HTTP request.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080".to_string(),
            photo_api_base: DEFAULT_PLANESPOTTERS_BASE.to_string(),
            flight_limit: 150,
            scheduler: SchedulerConfig::default(),
            photo_fill_delay: BULK_FILL_DELAY,
            fresh_window: FRESH_WINDOW,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Which rows of the live list are expanded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExpandState {
    #[default]
    Collapsed,
    /// Every row, with photos being filled in the background.
    All,
    One(FlightId),
}

impl ExpandState {
    /// Whether the row for `id` is expanded.
    #[must_use]
    pub fn is_expanded(&self, id: Option<&FlightId>) -> bool {
        match self {
            Self::Collapsed => false,
            Self::All => true,
            Self::One(expanded) => id == Some(expanded),
        }
    }
}

/// One viewing session: configuration, both caches, and the expand state.
///
/// Nothing here is global. Everything a display layer needs is reached
/// through the session it was handed.
pub struct Session {
    config: ClientConfig,
    api: HttpFlightApi,
    snapshot: Arc<LiveSnapshotCache>,
    photos: Arc<PhotoCache>,
    expand: Mutex<ExpandState>,
    bulk_fill: Mutex<Option<CancellationToken>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("api_base", &self.config.api_base)
            .field("snapshot", &self.snapshot)
            .field("photos", &self.photos)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session talking to the backend and photo service over HTTP.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let api = HttpFlightApi::new(client.clone(), &config.api_base);
        let photo_api = PlanespottersApi::new(client, &config.photo_api_base);

        Ok(Self::assemble(
            config,
            api.clone(),
            Arc::new(api),
            Arc::new(photo_api),
        ))
    }

    /// Create a session with custom flight and photo sources. Statistics are
    /// still fetched over HTTP from `config.api_base`.
    pub fn with_sources(
        config: ClientConfig,
        flights: Arc<dyn FlightSource>,
        photos: Arc<dyn PhotoSource>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let api = HttpFlightApi::new(client, &config.api_base);

        Ok(Self::assemble(config, api, flights, photos))
    }

    fn assemble(
        config: ClientConfig,
        api: HttpFlightApi,
        flights: Arc<dyn FlightSource>,
        photos: Arc<dyn PhotoSource>,
    ) -> Self {
        let snapshot = LiveSnapshotCache::new(flights, config.flight_limit)
            .with_fresh_window(config.fresh_window);

        Self {
            config,
            api,
            snapshot: Arc::new(snapshot),
            photos: Arc::new(PhotoCache::new(photos)),
            expand: Mutex::new(ExpandState::default()),
            bulk_fill: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn snapshot(&self) -> &Arc<LiveSnapshotCache> {
        &self.snapshot
    }

    #[must_use]
    pub fn photos(&self) -> &Arc<PhotoCache> {
        &self.photos
    }

    /// Start polling the backend. Stop by dropping or stopping the handle.
    #[must_use]
    pub fn start_polling(&self) -> PollScheduler {
        PollScheduler::start(Arc::clone(&self.snapshot), self.config.scheduler)
    }

    /// Fetch one statistic as raw JSON.
    pub async fn stats(&self, endpoint: StatsEndpoint) -> Result<serde_json::Value, FetchError> {
        self.api.stats(endpoint).await
    }

    /// Load the photo for one flight if it has not been looked up yet.
    pub async fn load_photo(&self, flight: &Flight) -> bool {
        match flight.registration() {
            Some(reg) => {
                self.photos
                    .fetch_if_missing(reg, flight.type_code.as_deref())
                    .await
            }
            None => false,
        }
    }

    /// The photo to show for `flight`, possibly borrowed from its type.
    #[must_use]
    pub fn best_photo(&self, flight: &Flight) -> Option<BestPhoto> {
        self.photos
            .best_photo_for(flight.registration()?, flight.type_code.as_deref())
    }

    #[must_use]
    pub fn expand_state(&self) -> ExpandState {
        self.expand
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Expand every row and start filling photos for the current view, or
    /// collapse everything if all rows are already expanded.
    ///
    /// Returns the bulk fill task when one was started.
    pub fn toggle_expand_all(&self) -> Option<JoinHandle<BulkFillReport>> {
        if self.expand_state() == ExpandState::All {
            self.collapse_all();
            return None;
        }

        self.set_expand(ExpandState::All);

        let cancel = CancellationToken::new();
        if let Ok(mut slot) = self.bulk_fill.lock() {
            if let Some(previous) = slot.replace(cancel.clone()) {
                previous.cancel();
            }
        }

        let flights = self.snapshot.filtered_view();
        let photos = Arc::clone(&self.photos);
        let delay = self.config.photo_fill_delay;
        info!("Expanding all rows, filling photos for {} flights", flights.len());

        Some(tokio::spawn(async move {
            photos.bulk_fill(&flights, delay, &cancel).await
        }))
    }

    /// Collapse every row and stop any running photo bulk fill.
    pub fn collapse_all(&self) {
        self.set_expand(ExpandState::Collapsed);
        if let Ok(mut slot) = self.bulk_fill.lock() {
            if let Some(cancel) = slot.take() {
                cancel.cancel();
            }
        }
    }

    /// Row click: focuses the row when everything is expanded, otherwise
    /// toggles it.
    pub fn click_row(&self, id: &FlightId) {
        let next = match self.expand_state() {
            ExpandState::One(current) if &current == id => ExpandState::Collapsed,
            _ => ExpandState::One(id.clone()),
        };
        self.set_expand(next);
    }

    fn set_expand(&self, state: ExpandState) {
        if let Ok(mut expand) = self.expand.lock() {
            *expand = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{aircraft, photo, FakeFlightSource, FakePhotoSource};
    use chrono::Utc;
    use tokio::time::sleep;

    fn session_with(photos: FakePhotoSource) -> (Session, Arc<FakePhotoSource>) {
        let photos = Arc::new(photos);
        let session = Session::with_sources(
            ClientConfig::default(),
            Arc::new(FakeFlightSource::default()),
            photos.clone(),
        )
        .unwrap();
        (session, photos)
    }

    fn fleet(n: i64) -> Vec<Flight> {
        (1..=n).map(|i| aircraft(i, &format!("N{i}"), "B738")).collect()
    }

    #[test]
    fn test_expand_state_rows() {
        let id = FlightId::Int(3);
        assert!(!ExpandState::Collapsed.is_expanded(Some(&id)));
        assert!(ExpandState::All.is_expanded(None));
        assert!(ExpandState::One(id.clone()).is_expanded(Some(&id)));
        assert!(!ExpandState::One(id).is_expanded(Some(&FlightId::Int(4))));
    }

    #[tokio::test]
    async fn test_click_row() {
        let (session, _) = session_with(FakePhotoSource::default());
        let a = FlightId::Int(1);
        let b = FlightId::Int(2);

        session.click_row(&a);
        assert_eq!(session.expand_state(), ExpandState::One(a.clone()));
        session.click_row(&b);
        assert_eq!(session.expand_state(), ExpandState::One(b.clone()));
        session.click_row(&b);
        assert_eq!(session.expand_state(), ExpandState::Collapsed);

        session.set_expand(ExpandState::All);
        session.click_row(&a);
        assert_eq!(session.expand_state(), ExpandState::One(a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expand_all_fills_filtered_view() {
        let (session, source) = session_with(FakePhotoSource::default());
        session.snapshot().ingest(fleet(3), Utc::now());
        session.snapshot().set_query("n2");

        let report = session.toggle_expand_all().unwrap().await.unwrap();

        assert_eq!(session.expand_state(), ExpandState::All);
        assert_eq!(report.dispatched, 1);
        assert_eq!(source.requested(), vec!["N2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collapse_cancels_bulk_fill() {
        let (session, source) = session_with(FakePhotoSource::default());
        session.snapshot().ingest(fleet(5), Utc::now());

        let handle = session.toggle_expand_all().unwrap();
        sleep(Duration::from_millis(300)).await;
        assert!(session.toggle_expand_all().is_none());

        let report = handle.await.unwrap();
        assert_eq!(session.expand_state(), ExpandState::Collapsed);
        assert_eq!(report, BulkFillReport { dispatched: 2, cancelled: true });
        assert_eq!(source.requested(), vec!["N1", "N2"]);
    }

    #[tokio::test]
    async fn test_load_photo_and_best_photo() {
        let (session, source) =
            session_with(FakePhotoSource::default().with_photo("N1", photo("n1")));
        let flights = fleet(2);

        assert!(session.best_photo(&flights[1]).is_none());
        assert!(session.load_photo(&flights[0]).await);
        assert!(session.load_photo(&flights[1]).await);
        assert!(!session.load_photo(&flights[1]).await);

        let best = session.best_photo(&flights[1]).unwrap();
        assert!(best.is_fallback);
        assert_eq!(best.source_reg, "N1");
        assert_eq!(source.requested().len(), 2);
    }
}
