//! Refresh controller.
//!
//! Owns the view state (`Idle`, `Loading`, `Ready`, `Failed`), the refresh
//! interval and the single recurring timer. Decides per load whether the
//! cache can stand in for the network.
//!
//! Overlapping loads are not serialized: a manual refresh fired while a
//! scheduled one is in flight races it, and whichever fetch *completes*
//! last sets the final state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheEntry, CacheStore, WeatherCache};
use crate::error::WeatherError;
use crate::location::Location;
use crate::payload::ForecastPayload;
use crate::policy::{should_use_cache, RefreshInterval};
use crate::provider::ForecastSource;
use crate::request::ForecastRequest;

/// What a front-end should show.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshState {
    Idle,
    Loading,
    Ready {
        payload: Arc<ForecastPayload>,
        fetched_at: DateTime<Utc>,
        from_cache: bool,
    },
    /// The previous payload is dropped; only the error is shown.
    Failed(WeatherError),
}

impl RefreshState {
    pub fn payload(&self) -> Option<&ForecastPayload> {
        match self {
            Self::Ready { payload, .. } => Some(payload.as_ref()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&WeatherError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready { .. } => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Timer bookkeeping, exposed so callers can verify there are no leaked or
/// doubled timers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    pub armed: u64,
    pub cancelled: u64,
    pub fired: u64,
}

struct Shared<S, K> {
    source: S,
    cache: WeatherCache<K>,
    request: ForecastRequest,
    interval: Mutex<RefreshInterval>,
    state: watch::Sender<RefreshState>,
    network_fetches: AtomicU64,
    armed: AtomicU64,
    cancelled: AtomicU64,
    fired: AtomicU64,
}

impl<S: ForecastSource, K: CacheStore> Shared<S, K> {
    fn set_state(&self, state: RefreshState) {
        tracing::debug!("Refresh state -> {}", state.name());
        self.state.send_replace(state);
    }

    /// Fetch from the network regardless of cache age.
    async fn refresh(&self) {
        self.set_state(RefreshState::Loading);
        self.network_fetches.fetch_add(1, Ordering::SeqCst);

        match self.source.fetch(&self.request).await {
            Ok(payload) => {
                let fetched_at = Utc::now().trunc_subsecs(3);
                let entry = CacheEntry::new(payload, fetched_at);
                if let Err(e) = self.cache.store(&entry) {
                    tracing::warn!("Failed to save forecast cache: {}", e);
                }
                tracing::info!("Forecast updated at {}", fetched_at);
                self.set_state(RefreshState::Ready {
                    payload: Arc::new(entry.payload),
                    fetched_at,
                    from_cache: false,
                });
            }
            Err(e) => {
                tracing::error!("Failed to fetch forecast: {}", e);
                self.set_state(RefreshState::Failed(e));
            }
        }
    }
}

/// The one pending recurring refresh.
struct ScheduledRefresh {
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

/// Drives forecast loads: once at start, on demand, and on a timer.
///
/// Timer methods spawn onto the ambient Tokio runtime and must be called
/// from within one.
pub struct RefreshController<S: ForecastSource, K: CacheStore + 'static> {
    shared: Arc<Shared<S, K>>,
    timer: Mutex<Option<ScheduledRefresh>>,
}

impl<S: ForecastSource, K: CacheStore + 'static> RefreshController<S, K> {
    pub fn new(source: S, store: K, location: Location, interval: RefreshInterval) -> Self {
        let (state, _) = watch::channel(RefreshState::Idle);
        let cache = WeatherCache::new(store, &location);

        Self {
            shared: Arc::new(Shared {
                source,
                cache,
                request: ForecastRequest::new(location),
                interval: Mutex::new(interval),
                state,
                network_fetches: AtomicU64::new(0),
                armed: AtomicU64::new(0),
                cancelled: AtomicU64::new(0),
                fired: AtomicU64::new(0),
            }),
            timer: Mutex::new(None),
        }
    }

    /// Initial load.
    ///
    /// Arms the recurring timer, then serves the cached payload if it is
    /// younger than the current interval, otherwise fetches. An unreadable
    /// cache counts as a miss.
    pub async fn start(&self) -> RefreshState {
        let interval = self.interval();
        tracing::info!(
            "Starting forecast refresh for {} ({})",
            self.shared.request.location().label(),
            interval.label()
        );
        self.shared.set_state(RefreshState::Loading);
        self.schedule(interval);

        let cached = match self.shared.cache.load() {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Ignoring unreadable forecast cache: {}", e);
                None
            }
        };

        match cached {
            Some(entry) if should_use_cache(Some(&entry), Utc::now(), interval) => {
                tracing::info!("Using cached forecast from {}", entry.fetched_at);
                self.shared.set_state(RefreshState::Ready {
                    payload: Arc::new(entry.payload),
                    fetched_at: entry.fetched_at,
                    from_cache: true,
                });
            }
            _ => self.shared.refresh().await,
        }

        self.state()
    }

    /// "Update now": fetch from the network from any state.
    pub async fn force_refresh(&self) -> RefreshState {
        tracing::info!("Manual forecast refresh");
        self.shared.refresh().await;
        self.state()
    }

    /// Change the refresh interval.
    ///
    /// If a timer is pending it is cancelled and exactly one replacement is
    /// armed at the new interval. Never fetches by itself. Setting the
    /// current interval again is a no-op.
    pub fn set_interval(&self, interval: RefreshInterval) {
        let mut timer = self.timer.lock();
        {
            let mut current = self.shared.interval.lock();
            if *current == interval {
                return;
            }
            tracing::info!("Refresh interval {} -> {}", *current, interval);
            *current = interval;
        }

        if let Some(old) = timer.take() {
            self.cancel(old);
            *timer = Some(self.arm(interval));
        }
    }

    /// Cancel the pending timer. State and cache are left as they are.
    pub fn stop(&self) {
        if let Some(old) = self.timer.lock().take() {
            self.cancel(old);
            tracing::info!("Forecast refresh stopped");
        }
    }

    pub fn interval(&self) -> RefreshInterval {
        *self.shared.interval.lock()
    }

    pub fn state(&self) -> RefreshState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.shared.state.subscribe()
    }

    pub fn is_scheduled(&self) -> bool {
        self.timer.lock().is_some()
    }

    pub fn timer_stats(&self) -> TimerStats {
        TimerStats {
            armed: self.shared.armed.load(Ordering::SeqCst),
            cancelled: self.shared.cancelled.load(Ordering::SeqCst),
            fired: self.shared.fired.load(Ordering::SeqCst),
        }
    }

    /// Network calls issued so far (cache hits excluded).
    pub fn network_fetches(&self) -> u64 {
        self.shared.network_fetches.load(Ordering::SeqCst)
    }

    /// Replace whatever timer is pending with one at `interval`.
    fn schedule(&self, interval: RefreshInterval) {
        let mut timer = self.timer.lock();
        if let Some(old) = timer.take() {
            self.cancel(old);
        }
        *timer = Some(self.arm(interval));
    }

    fn arm(&self, interval: RefreshInterval) -> ScheduledRefresh {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let shared = Arc::clone(&self.shared);
        let period = interval.as_duration();
        let first = Instant::now() + period;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                shared.fired.fetch_add(1, Ordering::SeqCst);
                tracing::info!("Scheduled forecast refresh ({})", interval);
                shared.refresh().await;
            }
        });

        self.shared.armed.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Armed refresh timer every {}", interval);
        ScheduledRefresh {
            token,
            _handle: handle,
        }
    }

    fn cancel(&self, timer: ScheduledRefresh) {
        timer.token.cancel();
        self.shared.cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

impl<S: ForecastSource, K: CacheStore + 'static> Drop for RefreshController<S, K> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            self.cancel(timer);
        }
    }
}
