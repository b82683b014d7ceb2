//! Fake collaborators for driving `SuggestionController` in tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use menuscan_core::{
    Clock, Coordinate, FetchError, GeoError, GeoSource, KeyValueStore, NearbyFetcher,
    PermissionState, PlaceRecord, StorageError, TextSearchFetcher,
};
use menuscan_suggest::{ControllerConfig, MemoryStore, SuggestionCache, SuggestionController};
use tokio::sync::watch;

pub const ORIGIN: Coordinate = Coordinate::new(37.7749, -122.4194);

// ---------------------------------------------------------------------------
// Geo
// ---------------------------------------------------------------------------

struct GeoInner {
    position: Mutex<Result<Coordinate, GeoError>>,
    last_known: Mutex<Option<Coordinate>>,
    delay: Mutex<Duration>,
    permission: watch::Sender<PermissionState>,
    calls: AtomicUsize,
}

#[derive(Clone)]
pub struct FakeGeo(Arc<GeoInner>);

impl FakeGeo {
    pub fn granted_at(position: Coordinate) -> Self {
        let (permission, _) = watch::channel(PermissionState::Granted);
        Self(Arc::new(GeoInner {
            position: Mutex::new(Ok(position)),
            last_known: Mutex::new(None),
            delay: Mutex::new(Duration::ZERO),
            permission,
            calls: AtomicUsize::new(0),
        }))
    }

    pub fn with_permission(self, state: PermissionState) -> Self {
        self.0.permission.send_replace(state);
        if state.is_blocked() {
            *self.0.position.lock().unwrap() = Err(GeoError::PermissionDenied(state));
        }
        self
    }

    pub fn fail_with(&self, error: GeoError) {
        *self.0.position.lock().unwrap() = Err(error);
    }

    pub fn set_last_known(&self, position: Option<Coordinate>) {
        *self.0.last_known.lock().unwrap() = position;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.0.delay.lock().unwrap() = delay;
    }

    pub fn change_permission(&self, state: PermissionState) {
        self.0.permission.send_replace(state);
    }

    pub fn calls(&self) -> usize {
        self.0.calls.load(Ordering::SeqCst)
    }
}

impl GeoSource for FakeGeo {
    async fn current_position(&self) -> Result<Coordinate, GeoError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.0.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.0.position.lock().unwrap().clone()
    }

    fn last_known_position(&self) -> Option<Coordinate> {
        *self.0.last_known.lock().unwrap()
    }

    fn permission(&self) -> PermissionState {
        *self.0.permission.borrow()
    }

    fn permission_changes(&self) -> watch::Receiver<PermissionState> {
        self.0.permission.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Place queries
// ---------------------------------------------------------------------------

type Scripted = (Duration, Result<Vec<PlaceRecord>, FetchError>);

struct FetchInner {
    scripted: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Result<Vec<PlaceRecord>, FetchError>>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

/// Scripted fetcher: answers queued responses in order, then the fallback.
#[derive(Clone)]
pub struct FakeFetcher(Arc<FetchInner>);

impl FakeFetcher {
    pub fn returning(records: Vec<PlaceRecord>) -> Self {
        Self(Arc::new(FetchInner {
            scripted: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(records)),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }))
    }

    pub fn failing(message: &str) -> Self {
        let fetcher = Self::returning(Vec::new());
        *fetcher.0.fallback.lock().unwrap() = Err(FetchError::new(message));
        fetcher
    }

    pub fn then(self, delay: Duration, records: Vec<PlaceRecord>) -> Self {
        self.0.scripted.lock().unwrap().push_back((delay, Ok(records)));
        self
    }

    pub fn set_fallback(&self, records: Vec<PlaceRecord>) {
        *self.0.fallback.lock().unwrap() = Ok(records);
    }

    pub fn calls(&self) -> usize {
        self.0.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.0.queries.lock().unwrap().clone()
    }

    async fn answer(&self, query: String) -> Result<Vec<PlaceRecord>, FetchError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        self.0.queries.lock().unwrap().push(query);
        let scripted = self.0.scripted.lock().unwrap().pop_front();
        match scripted {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => self.0.fallback.lock().unwrap().clone(),
        }
    }
}

impl NearbyFetcher for FakeFetcher {
    async fn fetch_nearby(
        &self,
        origin: Coordinate,
        radius_m: u32,
        limit: usize,
    ) -> Result<Vec<PlaceRecord>, FetchError> {
        self.answer(format!("{origin} r={radius_m} n={limit}")).await
    }
}

impl TextSearchFetcher for FakeFetcher {
    async fn search(&self, query: &str) -> Result<Vec<PlaceRecord>, FetchError> {
        self.answer(query.to_owned()).await
    }
}

// ---------------------------------------------------------------------------
// Storage and time
// ---------------------------------------------------------------------------

/// Memory store whose contents outlive the controller that wrote them.
#[derive(Clone, Default)]
pub struct SharedStore(Arc<MemoryStore>);

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.0.remove(key)
    }
}

pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new() -> Arc<Self> {
        let start = DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Arc::new(Self(Mutex::new(start)))
    }

    pub fn advance(&self, secs: i64) {
        *self.0.lock().unwrap() += TimeDelta::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn cache(store: &SharedStore, clock: &Arc<ManualClock>) -> SuggestionCache<SharedStore> {
    SuggestionCache::with_policy(
        store.clone(),
        Arc::clone(clock) as Arc<dyn Clock>,
        Duration::from_secs(300),
        100.0,
    )
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A(30 m, data, 4.2), B(35 m, no data, 4.8), C(500 m, data, 5.0), deliberately unsorted.
pub fn scenario_places() -> Vec<PlaceRecord> {
    vec![
        PlaceRecord::new("c", "C", ORIGIN, 500.0)
            .with_rating(5.0)
            .with_menu_data(4),
        PlaceRecord::new("b", "B", ORIGIN, 35.0).with_rating(4.8),
        PlaceRecord::new("a", "A", ORIGIN, 30.0)
            .with_rating(4.2)
            .with_menu_data(6),
    ]
}

pub fn far_places() -> Vec<PlaceRecord> {
    (0..7_u32)
        .map(|i| {
            PlaceRecord::new(
                format!("far{i}"),
                format!("Far {i}"),
                ORIGIN,
                200.0 + f64::from(i) * 60.0,
            )
        })
        .collect()
}

pub fn ids(records: &[PlaceRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

pub struct Harness {
    pub geo: FakeGeo,
    pub nearby: FakeFetcher,
    pub text: FakeFetcher,
    pub store: SharedStore,
    pub clock: Arc<ManualClock>,
}

pub type Controller = SuggestionController<FakeGeo, FakeFetcher, FakeFetcher, SharedStore>;

impl Harness {
    pub fn new(geo: FakeGeo, nearby: FakeFetcher) -> Self {
        Self {
            geo,
            nearby,
            text: FakeFetcher::returning(Vec::new()),
            store: SharedStore::default(),
            clock: ManualClock::new(),
        }
    }

    pub fn controller(&self) -> Controller {
        SuggestionController::new(
            self.geo.clone(),
            self.nearby.clone(),
            self.text.clone(),
            cache(&self.store, &self.clock),
            ControllerConfig::default(),
        )
    }

    pub fn cached_ids(&self) -> Option<Vec<String>> {
        cache(&self.store, &self.clock)
            .peek()
            .map(|entry| entry.ranked.into_iter().map(|r| r.id).collect())
    }
}
