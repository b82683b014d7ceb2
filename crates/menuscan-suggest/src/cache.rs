//! Single-slot cache of the most recent ranked suggestions.
//!
//! An entry is served only while it is both fresh (younger than the TTL) and
//! local (the device is within the locality radius of where the entry was
//! fetched). Every other outcome is a miss, and a miss is never an error.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use menuscan_core::{haversine_m, Clock, Coordinate, KeyValueStore, PlaceRecord, SystemClock};
use serde::{Deserialize, Serialize};

/// Fixed storage key of the single cache entry.
pub const CACHE_KEY: &str = "menuscan.suggestions.v1";

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_LOCALITY_M: f64 = 100.0;

/// The persisted cache slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub ranked: Vec<PlaceRecord>,
    pub origin: Coordinate,
    pub fetched_at: DateTime<Utc>,
}

/// Why a lookup did not produce a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Empty,
    Expired,
    MovedAway,
    Corrupt,
    StorageUnavailable,
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissReason::Empty => write!(f, "empty"),
            MissReason::Expired => write!(f, "expired"),
            MissReason::MovedAway => write!(f, "moved_away"),
            MissReason::Corrupt => write!(f, "corrupt"),
            MissReason::StorageUnavailable => write!(f, "storage_unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CacheEntry),
    Miss(MissReason),
}

/// Owned, injectable suggestion cache over any [`KeyValueStore`].
pub struct SuggestionCache<S> {
    store: S,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    locality_m: f64,
    // Serializes read-validate-discard against write so the slot is replaced atomically.
    slot: Mutex<()>,
}

impl<S: KeyValueStore> SuggestionCache<S> {
    /// Cache with the default 300 s TTL, 100 m locality radius and system clock.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, Arc::new(SystemClock), DEFAULT_TTL, DEFAULT_LOCALITY_M)
    }

    pub fn with_policy(store: S, clock: Arc<dyn Clock>, ttl: Duration, locality_m: f64) -> Self {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        Self {
            store,
            clock,
            ttl,
            locality_m,
            slot: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached ranked list if it is fresh and local.
    ///
    /// An unknown `current` position does not invalidate the entry.
    pub fn read(&self, current: Option<&Coordinate>) -> Option<Vec<PlaceRecord>> {
        match self.lookup(current) {
            CacheLookup::Hit(entry) => Some(entry.ranked),
            CacheLookup::Miss(_) => None,
        }
    }

    /// Like [`read`](Self::read), but reports why a miss happened.
    ///
    /// Expired and corrupt entries are removed from the store.
    pub fn lookup(&self, current: Option<&Coordinate>) -> CacheLookup {
        let _guard = self.lock();

        let raw = match self.store.get(CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::miss(MissReason::Empty),
            Err(e) => {
                tracing::warn!(error = %e, "suggestion cache unreadable, treating as miss");
                return Self::miss(MissReason::StorageUnavailable);
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "discarding undeserializable suggestion cache entry");
                self.discard();
                return Self::miss(MissReason::Corrupt);
            }
        };

        let age = self.clock.now() - entry.fetched_at;
        // An entry stamped in the future means the clock moved backwards.
        if age < TimeDelta::zero() || age >= self.ttl {
            tracing::debug!(age_secs = age.num_seconds(), "suggestion cache entry expired");
            self.discard();
            return Self::miss(MissReason::Expired);
        }

        if let Some(current) = current {
            let moved_m = haversine_m(&entry.origin, current);
            if moved_m >= self.locality_m {
                tracing::debug!(
                    moved_m,
                    locality_m = self.locality_m,
                    "position moved away from cached origin"
                );
                return Self::miss(MissReason::MovedAway);
            }
        }

        tracing::debug!(
            places = entry.ranked.len(),
            age_secs = age.num_seconds(),
            "suggestion cache hit"
        );
        CacheLookup::Hit(entry)
    }

    /// Replaces the cached entry, stamped with the current time.
    ///
    /// Storage failures are logged and swallowed: a failed write only costs
    /// a future fetch.
    pub fn write(&self, ranked: &[PlaceRecord], origin: Coordinate) {
        let entry = CacheEntry {
            ranked: ranked.to_vec(),
            origin,
            fetched_at: self.clock.now(),
        };
        let _guard = self.lock();
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "could not serialize suggestion cache entry");
                return;
            }
        };
        if let Err(e) = self.store.set(CACHE_KEY, &raw) {
            tracing::warn!(error = %e, "could not persist suggestion cache entry");
        }
    }

    /// Returns the stored entry without applying freshness or locality.
    pub fn peek(&self) -> Option<CacheEntry> {
        let _guard = self.lock();
        let raw = self.store.get(CACHE_KEY).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn clear(&self) {
        let _guard = self.lock();
        self.discard();
    }

    fn discard(&self) {
        if let Err(e) = self.store.remove(CACHE_KEY) {
            tracing::warn!(error = %e, "could not remove suggestion cache entry");
        }
    }

    fn miss(reason: MissReason) -> CacheLookup {
        tracing::debug!(%reason, "suggestion cache miss");
        CacheLookup::Miss(reason)
    }
}
