//! Retry with exponential back-off and jitter for the restaurant backend.
//!
//! [`retry_with_backoff`] wraps a fallible request and retries transient
//! failures only. Client errors and malformed bodies are returned at once.

use std::future::Future;
use std::time::Duration;

use crate::error::PlacesError;

/// Upper bound for a single back-off sleep.
const MAX_DELAY_MS: u64 = 10_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// Retriable: timeouts, connection failures, HTTP 429 and 5xx.
pub(crate) fn is_retriable(err: &PlacesError) -> bool {
    match err {
        PlacesError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        PlacesError::RateLimited { .. } => true,
        PlacesError::UnexpectedStatus { status, .. } => *status >= 500,
        PlacesError::Deserialize { .. }
        | PlacesError::InvalidBaseUrl { .. }
        | PlacesError::RadiusTooLarge { .. } => false,
    }
}

/// Sleep before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// scaled by a random factor in `[0.75, 1.25)` and capped at 10 s.
///
/// A `Retry-After` hint from a 429 raises the delay to at least that long.
fn backoff_delay(attempt: u32, backoff_base_ms: u64, err: &PlacesError) -> Duration {
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;

    let hinted = match err {
        PlacesError::RateLimited {
            retry_after_secs: Some(secs),
        } => secs.saturating_mul(1_000).min(MAX_DELAY_MS),
        _ => 0,
    };
    Duration::from_millis(jittered.max(hinted))
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, PlacesError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlacesError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = backoff_delay(attempt, backoff_base_ms, &err);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient restaurant backend error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
