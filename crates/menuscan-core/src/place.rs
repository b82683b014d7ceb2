//! Place records returned by nearby and text-search queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// One candidate restaurant.
///
/// Records are immutable once fetched; a new query produces new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// Provider place ID, unique per place.
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    /// Distance from the query origin in meters. Text-search results carry `0.0`.
    pub distance_m: f64,
    /// Provider rating on a 0-5 scale.
    pub rating: Option<f64>,
    /// Whether the backend has analyzed this restaurant's menu.
    pub has_data: bool,
    /// Number of menu items safe for the user's protocols. Only meaningful
    /// when `has_data` is set.
    pub safe_item_count: Option<u32>,
    pub last_analyzed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub is_open: Option<bool>,
    #[serde(default)]
    pub photos_available: bool,
}

impl PlaceRecord {
    /// Minimal record with no rating, no menu data and no display metadata.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        coordinate: Coordinate,
        distance_m: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinate,
            distance_m,
            rating: None,
            has_data: false,
            safe_item_count: None,
            last_analyzed: None,
            vicinity: None,
            cuisine_type: None,
            price_level: None,
            is_open: None,
            photos_available: false,
        }
    }

    #[must_use]
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Marks the record as having analyzed menu data.
    #[must_use]
    pub fn with_menu_data(mut self, safe_item_count: u32) -> Self {
        self.has_data = true;
        self.safe_item_count = Some(safe_item_count);
        self
    }

    /// Rating used for ordering; a missing rating counts as zero.
    #[must_use]
    pub fn rating_or_zero(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }

    /// Safe-item count, hidden when the record has no menu data.
    #[must_use]
    pub fn safe_items(&self) -> Option<u32> {
        if self.has_data {
            self.safe_item_count
        } else {
            None
        }
    }
}
