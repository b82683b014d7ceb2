//! `cache` command handlers.

use chrono::Utc;
use menuscan_core::AppConfig;

use crate::suggest::open_cache;

/// Prints the persisted suggestion entry, its origin and whether it is still fresh.
pub(crate) fn run_cache_show(config: &AppConfig) {
    let cache = open_cache(config);
    let Some(entry) = cache.peek() else {
        println!("suggestion cache is empty ({})", config.cache_dir.display());
        return;
    };

    let age_secs = (Utc::now() - entry.fetched_at).num_seconds();
    let ttl_secs = i64::try_from(config.cache_ttl_secs).unwrap_or(i64::MAX);
    let freshness = if age_secs < ttl_secs { "fresh" } else { "expired" };
    println!(
        "{} places fetched at {} near {} ({age_secs}s old, {freshness})",
        entry.ranked.len(),
        entry.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"),
        entry.origin,
    );
    for (i, place) in entry.ranked.iter().enumerate() {
        println!("{:>3}. {} ({:.0} m)", i + 1, place.name, place.distance_m);
    }
}

pub(crate) fn run_cache_clear(config: &AppConfig) {
    open_cache(config).clear();
    println!("suggestion cache cleared");
}
