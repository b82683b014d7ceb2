//! Suggestion controller.
//!
//! Runs one load cycle per `load`/`refresh` command:
//!
//! ```text
//! Idle -> [cache hit] -----------------------------> Ready(tier)
//!      -> [cache miss] -> LocatingPosition -> Fetching -> Ready(tier)
//!                             |                  |
//!                             |                  +-> Ready(Unavailable)  fetch failed
//!                             +-> PermissionDenied
//!                             +-> Ready(Unavailable)                     no position
//! ```
//!
//! Permission, position and fetch problems end in a state the UI can render;
//! only a contract violation from a collaborator (`InvalidInput`) reaches the
//! caller, and it parks the controller in [`Phase::Error`].
//!
//! A new command cancels the cycle in flight. Each cycle carries a generation
//! number and may only publish state or write the cache while it is still the
//! newest one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use menuscan_core::{
    AppConfig, FetchError, GeoError, GeoSource, KeyValueStore, NearbyFetcher, PermissionState,
    PlaceRecord, TextSearchFetcher,
};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

use crate::cache::SuggestionCache;
use crate::classifier::{classify, Classification, ConfidenceTier};
use crate::debounce::SearchDebouncer;
use crate::error::SuggestError;
use crate::ranking::rank;

/// Tunables for a [`SuggestionController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Nearby search radius in meters.
    pub nearby_radius_m: u32,
    /// Maximum number of places requested per nearby search.
    pub nearby_limit: usize,
    /// Upper bound for a position request and for each place query.
    pub request_timeout: Duration,
    /// Quiet period before a typed search is dispatched.
    pub search_debounce: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            nearby_radius_m: 500,
            nearby_limit: 10,
            request_timeout: Duration::from_secs(8),
            search_debounce: Duration::from_millis(300),
        }
    }
}

impl ControllerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            nearby_radius_m: config.nearby_radius_m,
            nearby_limit: config.nearby_limit,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            search_debounce: Duration::from_millis(config.search_debounce_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    LocatingPosition,
    Fetching,
    Ready,
    /// Location access is denied or restricted; the UI offers "enable location".
    PermissionDenied,
    /// A collaborator broke its contract. Cleared by the next command.
    Error,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::LocatingPosition => write!(f, "locating_position"),
            Phase::Fetching => write!(f, "fetching"),
            Phase::Ready => write!(f, "ready"),
            Phase::PermissionDenied => write!(f, "permission_denied"),
            Phase::Error => write!(f, "error"),
        }
    }
}

/// Most recent absorbed failure, kept for display and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastError {
    PositionUnavailable(String),
    Fetch(String),
    Search(String),
    InvalidInput(String),
}

impl std::fmt::Display for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LastError::PositionUnavailable(reason) => write!(f, "position unavailable: {reason}"),
            LastError::Fetch(reason) => write!(f, "nearby fetch failed: {reason}"),
            LastError::Search(reason) => write!(f, "search failed: {reason}"),
            LastError::InvalidInput(reason) => write!(f, "invalid place data: {reason}"),
        }
    }
}

/// The single observable value exposed to the UI.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerState {
    pub phase: Phase,
    pub tier: ConfidenceTier,
    pub ranked: Vec<PlaceRecord>,
    pub suggestion_count: usize,
    pub is_loading: bool,
    pub permission: PermissionState,
    pub last_error: Option<LastError>,
    /// Whether `ranked` was served from the suggestion cache.
    pub from_cache: bool,
    pub search_query: Option<String>,
    pub search_results: Vec<PlaceRecord>,
    pub is_searching: bool,
    /// Failure of the latest text search. Never touches `last_error`.
    pub search_error: Option<LastError>,
}

impl ControllerState {
    /// The suggestions the UI should list, already cut to `suggestion_count`.
    #[must_use]
    pub fn visible_suggestions(&self) -> &[PlaceRecord] {
        self.classification().visible(&self.ranked)
    }

    /// The pre-selected place in the [`ConfidenceTier::AutoSelect`] tier.
    #[must_use]
    pub fn preselected(&self) -> Option<&PlaceRecord> {
        self.classification().preselected(&self.ranked)
    }

    fn classification(&self) -> Classification {
        Classification {
            tier: self.tier,
            suggestion_count: self.suggestion_count,
        }
    }

    fn settle(
        &mut self,
        ranked: Vec<PlaceRecord>,
        classification: Classification,
        from_cache: bool,
        error: Option<LastError>,
    ) {
        self.phase = Phase::Ready;
        self.tier = classification.tier;
        self.suggestion_count = classification.suggestion_count;
        self.ranked = ranked;
        self.is_loading = false;
        self.from_cache = from_cache;
        self.last_error = error;
    }

    fn settle_empty(&mut self, error: LastError) {
        self.settle(Vec::new(), classify(&[]), false, Some(error));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared<G, N, T, S> {
    geo: G,
    nearby: N,
    text: T,
    cache: SuggestionCache<S>,
    config: ControllerConfig,
    state: watch::Sender<ControllerState>,
    generation: AtomicU64,
    search_generation: AtomicU64,
    // Held while checking a generation and committing its results.
    commit: Mutex<()>,
}

impl<G, N, T, S> Shared<G, N, T, S>
where
    G: GeoSource,
    N: NearbyFetcher,
    T: TextSearchFetcher,
    S: KeyValueStore,
{
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Applies `update` only if `generation` is still the newest cycle.
    fn publish(&self, generation: u64, update: impl FnOnce(&mut ControllerState)) -> bool {
        let _guard = lock(&self.commit);
        if !self.is_current(generation) {
            return false;
        }
        self.state.send_modify(update);
        true
    }

    fn publish_search(&self, generation: u64, update: impl FnOnce(&mut ControllerState)) {
        let _guard = lock(&self.commit);
        if self.search_generation.load(Ordering::SeqCst) == generation {
            self.state.send_modify(update);
        }
    }

    async fn with_timeout<F, V, E>(
        &self,
        fut: F,
        on_timeout: impl FnOnce(Duration) -> E,
    ) -> Result<V, E>
    where
        F: std::future::Future<Output = Result<V, E>>,
    {
        let limit = self.config.request_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| Err(on_timeout(limit)))
    }

    async fn run_cycle(&self, generation: u64, force_refresh: bool) -> Result<(), SuggestError> {
        let permission = self.geo.permission();
        self.publish(generation, |s| {
            s.is_loading = true;
            s.permission = permission;
        });

        if force_refresh {
            tracing::debug!("refresh requested, bypassing suggestion cache");
        } else if let Some(ranked) = self.cache.read(self.geo.last_known_position().as_ref()) {
            let classification = classify(&ranked);
            tracing::info!(
                tier = %classification.tier,
                places = ranked.len(),
                "serving suggestions from cache"
            );
            self.publish(generation, |s| s.settle(ranked, classification, true, None));
            return Ok(());
        }

        if permission.is_blocked() {
            self.deny(generation, permission);
            return Ok(());
        }

        self.publish(generation, |s| s.phase = Phase::LocatingPosition);
        let position = self
            .with_timeout(self.geo.current_position(), |limit| {
                GeoError::PositionUnavailable(format!("no fix within {}s", limit.as_secs()))
            })
            .await;

        let origin = match position {
            Ok(origin) => origin,
            Err(GeoError::PermissionDenied(state)) => {
                self.deny(generation, state);
                return Ok(());
            }
            Err(GeoError::PositionUnavailable(reason)) => {
                tracing::warn!(%reason, "position unavailable, no suggestions this cycle");
                self.publish(generation, |s| {
                    s.settle_empty(LastError::PositionUnavailable(reason));
                });
                return Ok(());
            }
        };

        let permission = self.geo.permission();
        self.publish(generation, |s| {
            s.phase = Phase::Fetching;
            s.permission = permission;
        });

        let radius_m = self.config.nearby_radius_m;
        let limit = self.config.nearby_limit;
        let fetched = self
            .with_timeout(self.nearby.fetch_nearby(origin, radius_m, limit), |limit| {
                FetchError::new(format!("nearby query timed out after {}s", limit.as_secs()))
            })
            .await;

        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    %origin,
                    "nearby fetch failed, manual search still available"
                );
                self.publish(generation, |s| s.settle_empty(LastError::Fetch(e.message)));
                return Ok(());
            }
        };

        let ranked = match rank(records) {
            Ok(ranked) => ranked,
            Err(e) => {
                tracing::error!(error = %e, "nearby fetcher returned an invalid place record");
                let reason = e.to_string();
                self.publish(generation, |s| {
                    s.phase = Phase::Error;
                    s.is_loading = false;
                    s.last_error = Some(LastError::InvalidInput(reason));
                });
                return Err(e);
            }
        };

        let classification = classify(&ranked);
        let _guard = lock(&self.commit);
        if !self.is_current(generation) {
            tracing::debug!("discarding results of a superseded suggestion cycle");
            return Ok(());
        }
        if !ranked.is_empty() {
            self.cache.write(&ranked, origin);
        }
        tracing::info!(
            tier = %classification.tier,
            places = ranked.len(),
            %origin,
            "suggestions ready"
        );
        self.state
            .send_modify(|s| s.settle(ranked, classification, false, None));
        Ok(())
    }

    fn deny(&self, generation: u64, permission: PermissionState) {
        tracing::info!(%permission, "location permission unavailable");
        self.publish(generation, |s| {
            s.phase = Phase::PermissionDenied;
            s.permission = permission;
            s.is_loading = false;
            s.from_cache = false;
            s.ranked.clear();
            s.tier = ConfidenceTier::Unavailable;
            s.suggestion_count = 0;
        });
    }

    async fn run_search(&self, query: String) {
        let generation = self.search_generation.load(Ordering::SeqCst);
        self.publish_search(generation, |s| {
            s.is_searching = true;
            s.search_error = None;
        });

        let outcome = self
            .with_timeout(self.text.search(&query), |limit| {
                FetchError::new(format!("search timed out after {}s", limit.as_secs()))
            })
            .await
            .map_err(|e| LastError::Search(e.message))
            .and_then(|records| {
                rank(records).map_err(|e| {
                    tracing::error!(error = %e, "text search returned an invalid place record");
                    LastError::InvalidInput(e.to_string())
                })
            });

        match outcome {
            Ok(ranked) => {
                tracing::debug!(query, results = ranked.len(), "search results ready");
                self.publish_search(generation, |s| {
                    s.search_results = ranked;
                    s.is_searching = false;
                });
            }
            Err(error) => {
                tracing::warn!(query, %error, "text search failed");
                self.publish_search(generation, |s| {
                    s.search_results.clear();
                    s.is_searching = false;
                    s.search_error = Some(error);
                });
            }
        }
    }
}

/// Orchestrates position, nearby fetch, ranking, caching and classification
/// behind a single observable [`ControllerState`].
///
/// Create it inside a tokio runtime; it owns background tasks for the search
/// debouncer and the permission watcher. Dropping it (or calling
/// [`shutdown`](Self::shutdown)) cancels all in-flight work.
pub struct SuggestionController<G, N, T, S> {
    shared: Arc<Shared<G, N, T, S>>,
    cycle: Mutex<Option<AbortHandle>>,
    debouncer: SearchDebouncer,
    permission_watch: JoinHandle<()>,
    shut_down: AtomicBool,
}

impl<G, N, T, S> SuggestionController<G, N, T, S>
where
    G: GeoSource,
    N: NearbyFetcher,
    T: TextSearchFetcher,
    S: KeyValueStore,
{
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(
        geo: G,
        nearby: N,
        text: T,
        cache: SuggestionCache<S>,
        config: ControllerConfig,
    ) -> Self {
        let initial = ControllerState {
            permission: geo.permission(),
            ..ControllerState::default()
        };
        let (state, _) = watch::channel(initial);
        let permission_changes = geo.permission_changes();
        let debounce = config.search_debounce;

        let shared = Arc::new(Shared {
            geo,
            nearby,
            text,
            cache,
            config,
            state,
            generation: AtomicU64::new(0),
            search_generation: AtomicU64::new(0),
            commit: Mutex::new(()),
        });

        let search_shared = Arc::clone(&shared);
        let debouncer = SearchDebouncer::spawn(debounce, move |query| {
            let shared = Arc::clone(&search_shared);
            async move { shared.run_search(query).await }
        });

        let permission_watch = tokio::spawn(watch_permission(
            Arc::clone(&shared),
            permission_changes,
        ));

        Self {
            shared,
            cycle: Mutex::new(None),
            debouncer,
            permission_watch,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Shows suggestions for the current location, from cache when possible.
    ///
    /// Resolves once this cycle settles or is superseded by a newer command.
    ///
    /// # Errors
    ///
    /// - [`SuggestError::InvalidInput`] if the nearby fetcher returned a record
    ///   that cannot be ranked.
    /// - [`SuggestError::ShutDown`] after [`shutdown`](Self::shutdown).
    pub async fn load(&self) -> Result<(), SuggestError> {
        self.start_cycle(false).await
    }

    /// Like [`load`](Self::load), but always bypasses the cache.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub async fn refresh(&self) -> Result<(), SuggestError> {
        self.start_cycle(true).await
    }

    /// Queues a text search. Rapid calls are coalesced; an empty query clears
    /// the search results. Results land in [`ControllerState::search_results`]
    /// and never touch the suggestion cache.
    pub fn search_by_text(&self, query: &str) {
        if self.shut_down.load(Ordering::SeqCst) {
            tracing::debug!("search ignored after shutdown");
            return;
        }
        let query = query.trim();
        if query.is_empty() {
            self.shared.search_generation.fetch_add(1, Ordering::SeqCst);
            self.debouncer.cancel();
            self.shared.state.send_modify(|s| {
                s.search_query = None;
                s.search_results.clear();
                s.is_searching = false;
                s.search_error = None;
            });
            return;
        }
        self.shared
            .state
            .send_modify(|s| s.search_query = Some(query.to_owned()));
        self.debouncer.submit(query);
    }

    async fn start_cycle(&self, force_refresh: bool) -> Result<(), SuggestError> {
        // The newest generation must own the stored handle.
        let (generation, handle) = {
            let mut cycle = lock(&self.cycle);
            if self.shut_down.load(Ordering::SeqCst) {
                return Err(SuggestError::ShutDown);
            }
            let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let shared = Arc::clone(&self.shared);
            let handle =
                tokio::spawn(async move { shared.run_cycle(generation, force_refresh).await });
            if let Some(previous) = cycle.replace(handle.abort_handle()) {
                previous.abort();
            }
            (generation, handle)
        };

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                if self.shut_down.load(Ordering::SeqCst) {
                    Err(SuggestError::ShutDown)
                } else {
                    tracing::debug!(generation, "suggestion cycle superseded");
                    Ok(())
                }
            }
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

impl<G, N, T, S> SuggestionController<G, N, T, S> {
    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.shared.state.subscribe()
    }

    /// Cancels in-flight work, stops background tasks and forgets all
    /// in-memory suggestion state. The persisted cache is left alone.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let mut cycle = lock(&self.cycle);
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            if let Some(handle) = cycle.take() {
                handle.abort();
            }
        }
        self.shared.search_generation.fetch_add(1, Ordering::SeqCst);
        self.debouncer.shutdown();
        self.permission_watch.abort();
        self.shared.state.send_replace(ControllerState::default());
        tracing::debug!("suggestion controller shut down");
    }
}

impl<G, N, T, S> Drop for SuggestionController<G, N, T, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn watch_permission<G, N, T, S>(
    shared: Arc<Shared<G, N, T, S>>,
    mut changes: watch::Receiver<PermissionState>,
) {
    while changes.changed().await.is_ok() {
        let permission = *changes.borrow_and_update();
        tracing::debug!(%permission, "location permission changed");
        shared.state.send_modify(|s| s.permission = permission);
    }
}
