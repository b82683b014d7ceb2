//! Wire types for the restaurant backend and their conversion to
//! [`PlaceRecord`].

use chrono::{DateTime, NaiveDateTime, Utc};
use menuscan_core::{Coordinate, PlaceRecord};
use serde::Deserialize;

/// One entry of `GET /restaurants/nearby`.
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyResult {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub vicinity: String,
    /// Whole meters from the query origin.
    pub distance_meters: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: Option<f64>,
    pub price_level: Option<u8>,
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub photos_available: bool,
    pub is_open: Option<bool>,
    pub has_menu_data: bool,
    #[serde(default)]
    pub safe_items_count: Option<u32>,
    #[serde(default)]
    pub last_analyzed: Option<String>,
}

/// One entry of `GET /restaurants/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
    pub price_level: Option<u8>,
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub photos_available: bool,
    pub has_menu_data: bool,
}

/// Parses backend timestamps, which may or may not carry an offset.
/// Offset-less values are taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_owned())
    }
}

impl NearbyResult {
    /// Converts to a [`PlaceRecord`], or `None` when the coordinate is out of range.
    #[must_use]
    pub fn into_record(self) -> Option<PlaceRecord> {
        let coordinate = Coordinate::new(self.latitude, self.longitude);
        if !coordinate.is_valid() {
            tracing::warn!(place_id = %self.place_id, %coordinate, "skipping place with invalid coordinate");
            return None;
        }
        let last_analyzed = self.last_analyzed.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::debug!(place_id = %self.place_id, raw, "unparseable last_analyzed timestamp");
            }
            parsed
        });

        let mut record =
            PlaceRecord::new(self.place_id, self.name, coordinate, self.distance_meters);
        record.rating = self.rating;
        record.has_data = self.has_menu_data;
        record.safe_item_count = self.safe_items_count;
        record.last_analyzed = last_analyzed;
        record.vicinity = non_empty(self.vicinity);
        record.cuisine_type = self.cuisine_type.and_then(non_empty);
        record.price_level = self.price_level;
        record.is_open = self.is_open;
        record.photos_available = self.photos_available;
        Some(record)
    }
}

impl SearchResult {
    /// Converts to a [`PlaceRecord`] with distance `0.0`; text search has no
    /// origin to measure from.
    #[must_use]
    pub fn into_record(self) -> Option<PlaceRecord> {
        let coordinate = Coordinate::new(self.latitude, self.longitude);
        if !coordinate.is_valid() {
            tracing::warn!(place_id = %self.place_id, %coordinate, "skipping place with invalid coordinate");
            return None;
        }
        let mut record = PlaceRecord::new(self.place_id, self.name, coordinate, 0.0);
        record.rating = self.rating;
        record.has_data = self.has_menu_data;
        record.vicinity = self.address.and_then(non_empty);
        record.cuisine_type = self.cuisine_type.and_then(non_empty);
        record.price_level = self.price_level;
        record.photos_available = self.photos_available;
        Some(record)
    }
}
