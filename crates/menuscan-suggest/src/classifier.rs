//! Confidence tiers derived from the leading suggestion's distance.
//!
//! A single 50 m threshold decides both the tier and how many suggestions the
//! UI shows:
//!
//! | Leading distance | Tier                | Suggestions                   |
//! |------------------|---------------------|-------------------------------|
//! | (empty list)     | `Unavailable`       | 0                             |
//! | < 50 m           | `AutoSelect`        | 3 (pre-selected + 2 alternates) |
//! | >= 50 m          | `RankedSuggestions` | 5                             |
//!
//! Counts are capped at the list length.

use menuscan_core::PlaceRecord;

pub const AUTO_SELECT_THRESHOLD_M: f64 = 50.0;
pub const AUTO_SELECT_ALTERNATES: usize = 2;
pub const RANKED_SUGGESTION_COUNT: usize = 5;

/// UX branch for the suggestion sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfidenceTier {
    /// The first suggestion is close enough to pre-select.
    AutoSelect,
    /// Show a short ranked list to pick from.
    RankedSuggestions,
    /// Nothing to suggest; fall back to manual search.
    #[default]
    Unavailable,
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceTier::AutoSelect => write!(f, "auto_select"),
            ConfidenceTier::RankedSuggestions => write!(f, "ranked_suggestions"),
            ConfidenceTier::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub tier: ConfidenceTier,
    pub suggestion_count: usize,
}

impl Classification {
    /// The record to pre-select, only for [`ConfidenceTier::AutoSelect`].
    #[must_use]
    pub fn preselected<'a>(&self, ranked: &'a [PlaceRecord]) -> Option<&'a PlaceRecord> {
        match self.tier {
            ConfidenceTier::AutoSelect => ranked.first(),
            _ => None,
        }
    }

    /// The slice of `ranked` the UI should display.
    #[must_use]
    pub fn visible<'a>(&self, ranked: &'a [PlaceRecord]) -> &'a [PlaceRecord] {
        &ranked[..self.suggestion_count.min(ranked.len())]
    }
}

/// Classifies an already-ranked list.
#[must_use]
pub fn classify(ranked: &[PlaceRecord]) -> Classification {
    let Some(leading) = ranked.first() else {
        return Classification {
            tier: ConfidenceTier::Unavailable,
            suggestion_count: 0,
        };
    };

    let (tier, wanted) = if leading.distance_m < AUTO_SELECT_THRESHOLD_M {
        (ConfidenceTier::AutoSelect, 1 + AUTO_SELECT_ALTERNATES)
    } else {
        (ConfidenceTier::RankedSuggestions, RANKED_SUGGESTION_COUNT)
    };

    Classification {
        tier,
        suggestion_count: wanted.min(ranked.len()),
    }
}
