//! Collaborator contracts consumed by the suggestion engine.
//!
//! Each collaborator is a trait so the engine can be composed with real
//! implementations (HTTP client, file store) or with fakes in tests.

use std::future::Future;

use thiserror::Error;
use tokio::sync::watch;

use crate::geo::Coordinate;
use crate::place::PlaceRecord;

/// Location authorization as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    /// The user has not been asked yet; requesting a position will prompt.
    #[default]
    NotDetermined,
    Granted,
    Denied,
    /// Blocked by policy (parental controls, MDM); the user cannot grant it.
    Restricted,
}

impl PermissionState {
    /// `true` when a position request cannot succeed without user action.
    #[must_use]
    pub fn is_blocked(self) -> bool {
        matches!(self, PermissionState::Denied | PermissionState::Restricted)
    }
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionState::NotDetermined => write!(f, "not_determined"),
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
            PermissionState::Restricted => write!(f, "restricted"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeoError {
    #[error("location permission {0}")]
    PermissionDenied(PermissionState),

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
}

/// Failure of a nearby or text-search query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("place fetch failed: {message}")]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Supplies the device position and its permission state.
pub trait GeoSource: Send + Sync + 'static {
    /// Resolves the current position once.
    fn current_position(&self) -> impl Future<Output = Result<Coordinate, GeoError>> + Send;

    /// Most recent fix the platform already has, without requesting a new one.
    fn last_known_position(&self) -> Option<Coordinate> {
        None
    }

    /// Current permission state, without prompting.
    fn permission(&self) -> PermissionState;

    /// Notification channel for permission changes.
    fn permission_changes(&self) -> watch::Receiver<PermissionState>;
}

/// Queries places around a coordinate.
pub trait NearbyFetcher: Send + Sync + 'static {
    fn fetch_nearby(
        &self,
        origin: Coordinate,
        radius_m: u32,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<PlaceRecord>, FetchError>> + Send;
}

/// Free-text place search, independent of location.
pub trait TextSearchFetcher: Send + Sync + 'static {
    fn search(&self, query: &str)
        -> impl Future<Output = Result<Vec<PlaceRecord>, FetchError>> + Send;
}

/// Minimal string key-value storage.
pub trait KeyValueStore: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError`] when the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
