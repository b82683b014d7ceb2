use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation live here, decoupled from the process environment,
/// so tests can drive it with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_meters = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(var, format!("must be a positive distance, got {value}")));
        }
        Ok(value)
    };

    let api_base_url = require("MENUSCAN_API_BASE_URL")?;
    if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
        return Err(invalid(
            "MENUSCAN_API_BASE_URL",
            format!("expected an http(s) URL, got '{api_base_url}'"),
        ));
    }

    let env = parse_environment(&or_default("MENUSCAN_ENV", "development"))?;
    let log_level = or_default("MENUSCAN_LOG_LEVEL", "info");
    let cache_dir = PathBuf::from(or_default("MENUSCAN_CACHE_DIR", "./.menuscan"));

    let request_timeout_secs = parse_u64("MENUSCAN_REQUEST_TIMEOUT_SECS", "8")?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "MENUSCAN_REQUEST_TIMEOUT_SECS",
            "must be at least 1".to_string(),
        ));
    }
    let user_agent = or_default("MENUSCAN_USER_AGENT", "menuscan/0.1 (suggestions)");
    let max_retries = parse_u32("MENUSCAN_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("MENUSCAN_RETRY_BACKOFF_BASE_MS", "250")?;

    let nearby_radius_m = parse_u32("MENUSCAN_NEARBY_RADIUS_M", "500")?;
    if nearby_radius_m == 0 || nearby_radius_m > 50_000 {
        return Err(invalid(
            "MENUSCAN_NEARBY_RADIUS_M",
            format!("must be between 1 and 50000, got {nearby_radius_m}"),
        ));
    }
    let nearby_limit = parse_usize("MENUSCAN_NEARBY_LIMIT", "10")?;
    if nearby_limit == 0 {
        return Err(invalid("MENUSCAN_NEARBY_LIMIT", "must be at least 1".to_string()));
    }

    let cache_ttl_secs = parse_u64("MENUSCAN_CACHE_TTL_SECS", "300")?;
    let cache_radius_m = parse_meters("MENUSCAN_CACHE_RADIUS_M", "100")?;
    let search_debounce_ms = parse_u64("MENUSCAN_SEARCH_DEBOUNCE_MS", "300")?;

    Ok(AppConfig {
        api_base_url,
        env,
        log_level,
        cache_dir,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        nearby_radius_m,
        nearby_limit,
        cache_ttl_secs,
        cache_radius_m,
        search_debounce_ms,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MENUSCAN_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
