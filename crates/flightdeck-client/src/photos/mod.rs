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

//! Aircraft photo cache.
//!
//! Photos are looked up by registration, at most once per registration for
//! the life of the cache. A lookup that finds nothing and a lookup that fails
//! both resolve to [`PhotoEntry::Absent`] and are never retried. The first
//! photo found for each aircraft type is also kept as a stand-in for other
//! aircraft of that type that have no photo of their own.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::api::PhotoSource;
use crate::model::{BestPhoto, Flight, Photo, PhotoEntry};

/// Pause between lookups during a bulk fill.
pub const BULK_FILL_DELAY: Duration = Duration::from_millis(220);

#[derive(Debug, Clone)]
struct TypeFallback {
    photo: Photo,
    source_reg: String,
}

#[derive(Debug, Default)]
struct PhotoState {
    /// Resolved lookups only. Missing key means not requested.
    entries: HashMap<String, PhotoEntry>,
    /// First photo seen per type code.
    fallbacks: HashMap<String, TypeFallback>,
    /// Lookups currently in flight.
    pending: HashSet<String>,
}

/// Clears a pending lookup when the lookup finishes or its future is dropped.
struct PendingGuard<'a> {
    state: &'a Mutex<PhotoState>,
    reg: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.pending.remove(self.reg);
        }
    }
}

/// Outcome of a [`PhotoCache::bulk_fill`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkFillReport {
    /// Lookups actually issued.
    pub dispatched: usize,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
}

/// Session-scoped photo cache keyed by registration.
pub struct PhotoCache {
    source: Arc<dyn PhotoSource>,
    state: Mutex<PhotoState>,
}

impl std::fmt::Debug for PhotoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoCache")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl PhotoCache {
    #[must_use]
    pub fn new(source: Arc<dyn PhotoSource>) -> Self {
        Self {
            source,
            state: Mutex::new(PhotoState::default()),
        }
    }

    /// Current state for `reg` without triggering a lookup.
    #[must_use]
    pub fn lookup(&self, reg: &str) -> PhotoEntry {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.entries.get(reg).cloned())
            .unwrap_or(PhotoEntry::NotRequested)
    }

    /// Number of resolved registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a lookup for `reg` is in flight.
    #[must_use]
    pub fn is_pending(&self, reg: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.pending.contains(reg))
            .unwrap_or(false)
    }

    /// Look up `reg` unless it is empty, already resolved, or already in
    /// flight. Returns whether a lookup was issued.
    ///
    /// When a photo is found and `type_hint` names a type with no stand-in
    /// photo yet, the photo becomes that type's stand-in.
    pub async fn fetch_if_missing(&self, reg: &str, type_hint: Option<&str>) -> bool {
        if reg.is_empty() {
            return false;
        }

        {
            let Ok(mut state) = self.state.lock() else {
                return false;
            };
            if state.entries.contains_key(reg) || state.pending.contains(reg) {
                return false;
            }
            state.pending.insert(reg.to_string());
        }
        let _pending = PendingGuard {
            state: &self.state,
            reg,
        };

        let entry = match self.source.photos_for_registration(reg).await {
            Ok(photos) => match photos.into_iter().next() {
                Some(photo) => PhotoEntry::Present(photo),
                None => {
                    debug!("No photo available for {}", reg);
                    PhotoEntry::Absent
                }
            },
            Err(e) => {
                warn!("Failed to fetch photo for {}: {}", reg, e);
                PhotoEntry::Absent
            }
        };

        if let Ok(mut state) = self.state.lock() {
            if let (PhotoEntry::Present(photo), Some(type_code)) =
                (&entry, type_hint.filter(|t| !t.is_empty()))
            {
                state
                    .fallbacks
                    .entry(type_code.to_string())
                    .or_insert_with(|| TypeFallback {
                        photo: photo.clone(),
                        source_reg: reg.to_string(),
                    });
            }

            state.entries.insert(reg.to_string(), entry);
        }

        true
    }

    /// The photo to show for `reg`: its own if one was found, otherwise the
    /// stand-in for `type_code` when `reg` has been looked up and came back
    /// empty.
    #[must_use]
    pub fn best_photo_for(&self, reg: &str, type_code: Option<&str>) -> Option<BestPhoto> {
        let state = self.state.lock().ok()?;

        match state.entries.get(reg)? {
            PhotoEntry::Present(photo) => Some(BestPhoto {
                photo: photo.clone(),
                is_fallback: false,
                source_reg: reg.to_string(),
            }),
            PhotoEntry::Absent => {
                let fallback = state.fallbacks.get(type_code?)?;
                (fallback.source_reg != reg).then(|| BestPhoto {
                    photo: fallback.photo.clone(),
                    is_fallback: true,
                    source_reg: fallback.source_reg.clone(),
                })
            }
            PhotoEntry::NotRequested => None,
        }
    }

    /// Look up photos for `flights` one at a time, in order, pausing `delay`
    /// after each lookup.
    ///
    /// Flights without a registration or already resolved are skipped without
    /// a pause. Cancelling `cancel` stops the run before the next lookup; a
    /// lookup already in flight still completes and is cached.
    pub async fn bulk_fill(
        &self,
        flights: &[Flight],
        delay: Duration,
        cancel: &CancellationToken,
    ) -> BulkFillReport {
        let mut report = BulkFillReport::default();

        for flight in flights {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let Some(reg) = flight.registration() else {
                continue;
            };
            if self.lookup(reg).is_resolved() {
                continue;
            }

            if !self.fetch_if_missing(reg, flight.type_code.as_deref()).await {
                continue;
            }
            report.dispatched += 1;

            tokio::select! {
                () = sleep(delay) => {}
                () = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
            }
        }

        if report.cancelled {
            info!("Photo bulk fill cancelled after {} lookups", report.dispatched);
        } else {
            info!("Photo bulk fill finished ({} lookups)", report.dispatched);
        }
        report
    }
}
