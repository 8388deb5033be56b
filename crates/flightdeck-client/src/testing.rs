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

//! In-memory sources for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::{FetchError, FlightSource, PhotoSource};
use crate::model::{Flight, FlightId, Photo};

pub(crate) fn fake_error() -> FetchError {
    FetchError::Status {
        url: "http://fake/api".to_string(),
        status: 503,
    }
}

pub(crate) fn flight(id: i64, last_seen: &str) -> Flight {
    Flight {
        id: Some(FlightId::Int(id)),
        last_seen: Some(last_seen.to_string()),
        ..Default::default()
    }
}

pub(crate) fn aircraft(id: i64, reg: &str, type_code: &str) -> Flight {
    Flight {
        id: Some(FlightId::Int(id)),
        reg: Some(reg.to_string()),
        type_code: Some(type_code.to_string()),
        ..Default::default()
    }
}

pub(crate) fn photo(src: &str) -> Photo {
    Photo {
        thumbnail_url: Some(src.to_string()),
        link: Some(format!("{src}/credit")),
        photographer: Some("Test Photographer".to_string()),
    }
}

/// Replays queued listing responses in order. An empty queue yields an
/// empty listing.
#[derive(Debug, Default)]
pub(crate) struct FakeFlightSource {
    listings: Mutex<VecDeque<Result<Vec<Flight>, FetchError>>>,
    search: Mutex<Option<Result<Vec<Flight>, FetchError>>>,
    timed_searches: Mutex<HashMap<String, (Duration, Vec<Flight>)>>,
    latency: Duration,
    pub(crate) list_calls: AtomicUsize,
    pub(crate) search_calls: Mutex<Vec<String>>,
}

impl FakeFlightSource {
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn push_ok(&self, flights: Vec<Flight>) {
        self.listings.lock().unwrap().push_back(Ok(flights));
    }

    pub(crate) fn push_err(&self) {
        self.listings.lock().unwrap().push_back(Err(fake_error()));
    }

    pub(crate) fn set_search(&self, result: Result<Vec<Flight>, FetchError>) {
        *self.search.lock().unwrap() = Some(result);
    }

    /// Answer searches for `datetime` with `flights` after `delay`.
    pub(crate) fn set_search_for(&self, datetime: &str, delay: Duration, flights: Vec<Flight>) {
        self.timed_searches
            .lock()
            .unwrap()
            .insert(datetime.to_string(), (delay, flights));
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlightSource for FakeFlightSource {
    async fn list_flights(&self, _limit: usize) -> Result<Vec<Flight>, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.listings.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn search_by_time(&self, datetime: &str) -> Result<Vec<Flight>, FetchError> {
        self.search_calls.lock().unwrap().push(datetime.to_string());
        let timed = self.timed_searches.lock().unwrap().get(datetime).cloned();
        if let Some((delay, flights)) = timed {
            tokio::time::sleep(delay).await;
            return Ok(flights);
        }
        self.search
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Serves photos from a fixed table and records every lookup.
#[derive(Debug, Default)]
pub(crate) struct FakePhotoSource {
    photos: HashMap<String, Vec<Photo>>,
    failing: HashSet<String>,
    latency: Duration,
    cancel_after: Option<(usize, CancellationToken)>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl FakePhotoSource {
    pub(crate) fn with_photo(mut self, reg: &str, photo: Photo) -> Self {
        self.photos.entry(reg.to_string()).or_default().push(photo);
        self
    }

    pub(crate) fn failing_for(mut self, reg: &str) -> Self {
        self.failing.insert(reg.to_string());
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Cancel `token` as soon as the `n`th lookup has completed.
    pub(crate) fn cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.calls().into_iter().map(|(reg, _)| reg).collect()
    }
}

#[async_trait]
impl PhotoSource for FakePhotoSource {
    async fn photos_for_registration(&self, reg: &str) -> Result<Vec<Photo>, FetchError> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((reg.to_string(), Instant::now()));
            calls.len()
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some((n, token)) = &self.cancel_after {
            if count >= *n {
                token.cancel();
            }
        }

        if self.failing.contains(reg) {
            return Err(fake_error());
        }
        Ok(self.photos.get(reg).cloned().unwrap_or_default())
    }
}
