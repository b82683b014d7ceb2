use menuscan_core::FetchError;
use thiserror::Error;

/// Errors returned by the restaurant backend client.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// HTTP 429. `retry_after_secs` comes from the `Retry-After` header when present.
    #[error("rate limited by restaurant backend (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("unexpected HTTP status {status} from {url}: {detail}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        detail: String,
    },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("search radius {radius_m} m exceeds the backend maximum of {max_m} m")]
    RadiusTooLarge { radius_m: u32, max_m: u32 },
}

impl From<PlacesError> for FetchError {
    fn from(err: PlacesError) -> Self {
        FetchError::new(err.to_string())
    }
}
