//! `suggest` and `search` command handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use menuscan_core::{AppConfig, Coordinate, PermissionState, PlaceRecord, SystemClock};
use menuscan_places::PlacesClient;
use menuscan_suggest::{
    ConfidenceTier, ControllerConfig, ControllerState, FileStore, Phase, SuggestionCache,
    SuggestionController,
};

use crate::geo::FixedGeo;

#[derive(Debug)]
pub(crate) struct SuggestArgs {
    pub lat: f64,
    pub lng: f64,
    pub refresh: bool,
    pub cuisine: Option<String>,
    pub protocols: Vec<String>,
    pub permission: PermissionState,
}

pub(crate) fn open_cache(config: &AppConfig) -> SuggestionCache<FileStore> {
    SuggestionCache::with_policy(
        FileStore::new(config.cache_dir.clone()),
        Arc::new(SystemClock),
        Duration::from_secs(config.cache_ttl_secs),
        config.cache_radius_m,
    )
}

/// Runs one suggestion cycle for the given coordinate and prints the result.
///
/// # Errors
///
/// Returns an error if the coordinate is out of range, the HTTP client cannot
/// be built, or the backend returns records that cannot be ranked.
pub(crate) async fn run_suggest(config: &AppConfig, args: SuggestArgs) -> anyhow::Result<()> {
    let origin = Coordinate::new(args.lat, args.lng);
    if !origin.is_valid() {
        anyhow::bail!("coordinate {origin} is out of range");
    }

    let client = PlacesClient::from_config(config)
        .context("failed to build restaurant backend client")?
        .with_cuisine_type(args.cuisine)
        .with_protocols(args.protocols);

    let controller = SuggestionController::new(
        FixedGeo::new(origin, args.permission),
        client.clone(),
        client,
        open_cache(config),
        ControllerConfig::from_app_config(config),
    );

    if args.refresh {
        controller.refresh().await?;
    } else {
        controller.load().await?;
    }

    let state = controller.state();
    controller.shutdown();
    print_state(&state);
    Ok(())
}

/// Searches by name and prints the results in suggestion order.
///
/// # Errors
///
/// Returns an error if the backend request fails or returns records that
/// cannot be ranked.
pub(crate) async fn run_search(
    config: &AppConfig,
    query: &str,
    location: Option<&str>,
) -> anyhow::Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("search query must not be empty");
    }

    let client =
        PlacesClient::from_config(config).context("failed to build restaurant backend client")?;
    let records = client
        .text_search(query, location)
        .await
        .with_context(|| format!("search for {query:?} failed"))?;
    let ranked = menuscan_suggest::rank(records)?;

    if ranked.is_empty() {
        println!("no restaurants match {query:?}");
        return Ok(());
    }
    print_places(&ranked, false);
    Ok(())
}

fn print_state(state: &ControllerState) {
    match state.phase {
        Phase::PermissionDenied => {
            println!(
                "location permission is {}; enable location or use `menuscan search`",
                state.permission
            );
            return;
        }
        Phase::Error => {
            if let Some(err) = &state.last_error {
                println!("error: {err}");
            }
            return;
        }
        _ => {}
    }

    let source = if state.from_cache { "cache" } else { "backend" };
    match state.tier {
        ConfidenceTier::AutoSelect => {
            if let Some(place) = state.preselected() {
                println!("you are probably at {} ({source})", place.name);
            }
        }
        ConfidenceTier::RankedSuggestions => println!("restaurants nearby ({source})"),
        ConfidenceTier::Unavailable => {
            match &state.last_error {
                Some(err) => println!("no suggestions: {err}"),
                None => println!("no restaurants found nearby"),
            }
            println!("try `menuscan search <name>` instead");
            return;
        }
    }
    print_places(state.visible_suggestions(), true);
}

fn print_places(places: &[PlaceRecord], with_distance: bool) {
    println!(
        "{:<4}{:<32}{:>9}{:>8}{:>7}  VICINITY",
        "#", "NAME", "DISTANCE", "RATING", "SAFE"
    );
    for (i, place) in places.iter().enumerate() {
        println!("{}", format_row(i + 1, place, with_distance));
    }
}

fn format_row(position: usize, place: &PlaceRecord, with_distance: bool) -> String {
    let name = if place.name.chars().count() > 30 {
        format!("{}...", place.name.chars().take(27).collect::<String>())
    } else {
        place.name.clone()
    };
    let distance = if with_distance {
        format!("{:.0} m", place.distance_m)
    } else {
        "\u{2014}".to_string()
    };
    let rating = place
        .rating
        .map_or_else(|| "\u{2014}".to_string(), |r| format!("{r:.1}"));
    let safe = place
        .safe_items()
        .map_or_else(|| "\u{2014}".to_string(), |n| n.to_string());
    format!(
        "{:<4}{:<32}{:>9}{:>8}{:>7}  {}",
        position,
        name,
        distance,
        rating,
        safe,
        place.vicinity.as_deref().unwrap_or("")
    )
}
