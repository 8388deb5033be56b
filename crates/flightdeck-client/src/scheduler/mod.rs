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

//! Fixed-interval drivers for the live view.
//!
//! [`PollScheduler`] runs two independent timers: a data poll that refreshes
//! the [`LiveSnapshotCache`], and a clock tick that publishes the current
//! time so derived values (freshness, row opacity, time since the last
//! sweep) can be recomputed between polls. The clock never waits on the
//! network.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::snapshot::LiveSnapshotCache;

/// Shortest period either timer will run at.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Timer periods for the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Period between snapshot refreshes.
    pub poll_interval: Duration,
    /// Period between clock ticks.
    pub clock_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            clock_interval: Duration::from_millis(1000),
        }
    }
}

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

/// Handle to the running poll and clock timers.
///
/// Timers start immediately: the first refresh is dispatched on start, then
/// every poll interval. Each refresh runs in its own task so a slow response
/// never delays the next tick. Dropping the handle stops both timers.
pub struct PollScheduler {
    cancel_token: CancellationToken,
    clock_rx: watch::Receiver<DateTime<Utc>>,
}

impl std::fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PollScheduler {
    /// Start both timers on the current Tokio runtime.
    #[must_use]
    pub fn start(cache: Arc<LiveSnapshotCache>, config: SchedulerConfig) -> Self {
        let poll_interval = config.poll_interval.max(MIN_PERIOD);
        let clock_interval = config.clock_interval.max(MIN_PERIOD);
        let cancel_token = CancellationToken::new();
        let (clock_tx, clock_rx) = watch::channel(Utc::now());

        info!(
            "Starting poll scheduler (poll {}ms, clock {}ms)",
            poll_interval.as_millis(),
            clock_interval.as_millis()
        );

        tokio::spawn(poll_loop(cache, poll_interval, cancel_token.clone()));
        tokio::spawn(clock_loop(clock_tx, clock_interval, cancel_token.clone()));

        Self {
            cancel_token,
            clock_rx,
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.cancel_token.is_cancelled() {
            SchedulerState::Stopped
        } else {
            SchedulerState::Running
        }
    }

    /// Receiver that changes on every clock tick.
    #[must_use]
    pub fn clock(&self) -> watch::Receiver<DateTime<Utc>> {
        self.clock_rx.clone()
    }

    /// Time of the most recent clock tick.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        *self.clock_rx.borrow()
    }

    /// Stop both timers. Refreshes already in flight may still complete.
    pub fn stop(&self) {
        if !self.cancel_token.is_cancelled() {
            info!("Stopping poll scheduler");
            self.cancel_token.cancel();
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn poll_loop(cache: Arc<LiveSnapshotCache>, period: Duration, cancel_token: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    let _ = cache.refresh().await;
                });
            }
            () = cancel_token.cancelled() => {
                debug!("Poll timer stopped");
                return;
            }
        }
    }
}

async fn clock_loop(
    clock_tx: watch::Sender<DateTime<Utc>>,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                clock_tx.send_replace(Utc::now());
            }
            () = cancel_token.cancelled() => {
                debug!("Clock timer stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{flight, FakeFlightSource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn spawn_tick_counter(mut clock: watch::Receiver<DateTime<Utc>>) -> Arc<AtomicUsize> {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        tokio::spawn(async move {
            while clock.changed().await.is_ok() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        ticks
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_immediately_then_every_interval() {
        let source = Arc::new(FakeFlightSource::default());
        source.push_ok(vec![flight(1, "T0")]);
        let cache = Arc::new(LiveSnapshotCache::new(source.clone(), 150));

        let scheduler = PollScheduler::start(Arc::clone(&cache), SchedulerConfig::default());
        assert_eq!(scheduler.state(), SchedulerState::Running);

        sleep(Duration::from_millis(10)).await;
        assert_eq!(source.list_calls(), 1);
        assert_eq!(cache.len(), 1);

        sleep(Duration::from_millis(5000)).await;
        assert_eq!(source.list_calls(), 2);

        sleep(Duration::from_millis(5000)).await;
        assert_eq!(source.list_calls(), 3);

        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(source.list_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_retries_on_next_tick() {
        let source = Arc::new(FakeFlightSource::default());
        source.push_ok(vec![flight(1, "T0")]);
        source.push_err();
        source.push_err();
        source.push_ok(vec![flight(2, "T1")]);
        let cache = Arc::new(LiveSnapshotCache::new(source.clone(), 150));

        let _scheduler = PollScheduler::start(Arc::clone(&cache), SchedulerConfig::default());

        sleep(Duration::from_millis(10_010)).await;
        assert_eq!(source.list_calls(), 3);
        assert_eq!(cache.flights(), vec![flight(1, "T0")]);

        sleep(Duration::from_millis(5000)).await;
        assert_eq!(cache.flights(), vec![flight(2, "T1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_ticks_while_refresh_in_flight() {
        let source = Arc::new(FakeFlightSource::default().with_latency(Duration::from_secs(12)));
        let cache = Arc::new(LiveSnapshotCache::new(source.clone(), 150));

        let scheduler = PollScheduler::start(Arc::clone(&cache), SchedulerConfig::default());
        let ticks = spawn_tick_counter(scheduler.clock());

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
        assert!(cache.last_refresh().is_none());

        // Slow refreshes do not hold back the next poll
        sleep(Duration::from_millis(6600)).await;
        assert_eq!(source.list_calls(), 3);

        scheduler.stop();
        sleep(Duration::from_secs(5)).await;
        let after_stop = ticks.load(Ordering::SeqCst);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_timers() {
        let source = Arc::new(FakeFlightSource::default());
        let cache = Arc::new(LiveSnapshotCache::new(source.clone(), 150));

        let scheduler = PollScheduler::start(cache, SchedulerConfig::default());
        sleep(Duration::from_millis(10)).await;
        drop(scheduler);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(source.list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_intervals_are_clamped() {
        let source = Arc::new(FakeFlightSource::default());
        let cache = Arc::new(LiveSnapshotCache::new(source.clone(), 150));

        let scheduler = PollScheduler::start(
            cache,
            SchedulerConfig {
                poll_interval: Duration::ZERO,
                clock_interval: Duration::ZERO,
            },
        );
        sleep(Duration::from_millis(10)).await;

        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert!(source.list_calls() > 1);
        scheduler.stop();
    }
}
