//! Client for the restaurant backend's nearby and text-search endpoints.

pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use client::{PlacesClient, MAX_RADIUS_M};
pub use error::PlacesError;
pub use types::{NearbyResult, SearchResult};
