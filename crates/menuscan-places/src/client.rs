//! HTTP client for the restaurant backend.
//!
//! Wraps `reqwest` with typed errors, retry on transient failures and
//! conversion of the backend's JSON into [`PlaceRecord`]s.

use std::time::Duration;

use menuscan_core::{
    AppConfig, Coordinate, FetchError, NearbyFetcher, PlaceRecord, TextSearchFetcher,
};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::PlacesError;
use crate::retry::retry_with_backoff;
use crate::types::{NearbyResult, SearchResult};

/// Largest radius the backend accepts for a nearby query.
pub const MAX_RADIUS_M: u32 = 50_000;

/// Client for the `/restaurants` endpoints.
///
/// Use [`PlacesClient::from_config`] in the binary or
/// [`PlacesClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct PlacesClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
    cuisine_type: Option<String>,
    protocols: Vec<String>,
    search_location: Option<String>,
}

impl PlacesClient {
    /// Builds a client from the loaded application config.
    ///
    /// # Errors
    ///
    /// See [`PlacesClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, PlacesError> {
        Self::with_base_url(
            &config.api_base_url,
            config.request_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_ms,
        )
    }

    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PlacesError::InvalidBaseUrl`] if
    /// `base_url` is not an absolute http(s) URL.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(5)))
            .user_agent(user_agent)
            .build()?;

        // A trailing slash makes `Url::join` append to the base path instead
        // of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| PlacesError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PlacesError::InvalidBaseUrl {
                base_url: base_url.to_owned(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        Ok(Self {
            client,
            base_url: parsed,
            max_retries,
            backoff_base_ms,
            cuisine_type: None,
            protocols: Vec::new(),
            search_location: None,
        })
    }

    /// Restricts nearby queries to one cuisine.
    #[must_use]
    pub fn with_cuisine_type(mut self, cuisine_type: Option<String>) -> Self {
        self.cuisine_type = cuisine_type;
        self
    }

    /// Dietary protocols the backend counts safe menu items for.
    #[must_use]
    pub fn with_protocols(mut self, protocols: Vec<String>) -> Self {
        self.protocols = protocols;
        self
    }

    /// Free-text location hint (city, address) sent with text searches.
    #[must_use]
    pub fn with_search_location(mut self, location: Option<String>) -> Self {
        self.search_location = location;
        self
    }

    /// Restaurants around `origin`, closest first, at most `limit` of them.
    ///
    /// Entries with out-of-range coordinates are skipped.
    ///
    /// # Errors
    ///
    /// - [`PlacesError::RadiusTooLarge`] if `radius_m` exceeds [`MAX_RADIUS_M`].
    /// - [`PlacesError::RateLimited`] or [`PlacesError::UnexpectedStatus`] for
    ///   non-2xx responses, after retries where they apply.
    /// - [`PlacesError::Http`] on network failure after retries.
    /// - [`PlacesError::Deserialize`] if the body does not match the expected shape.
    pub async fn nearby(
        &self,
        origin: Coordinate,
        radius_m: u32,
        limit: usize,
    ) -> Result<Vec<PlaceRecord>, PlacesError> {
        if radius_m > MAX_RADIUS_M {
            return Err(PlacesError::RadiusTooLarge {
                radius_m,
                max_m: MAX_RADIUS_M,
            });
        }

        let latitude = origin.lat.to_string();
        let longitude = origin.lng.to_string();
        let radius = radius_m.to_string();
        let mut params = vec![
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("radius_meters", radius.as_str()),
        ];
        if let Some(cuisine) = &self.cuisine_type {
            params.push(("cuisine_type", cuisine.as_str()));
        }
        for protocol in &self.protocols {
            params.push(("protocols", protocol.as_str()));
        }

        let url = self.build_url("restaurants/nearby", &params)?;
        let results: Vec<NearbyResult> = self
            .get_json(&url, &format!("nearby({origin}, r={radius_m})"))
            .await?;

        let received = results.len();
        let records: Vec<PlaceRecord> = results
            .into_iter()
            .filter_map(NearbyResult::into_record)
            .take(limit)
            .collect();
        tracing::debug!(
            %origin,
            radius_m,
            received,
            kept = records.len(),
            "nearby query complete"
        );
        Ok(records)
    }

    /// Restaurants matching `query` by name, optionally near a free-text location.
    ///
    /// # Errors
    ///
    /// Same as [`PlacesClient::nearby`], minus the radius check.
    pub async fn text_search(
        &self,
        query: &str,
        location: Option<&str>,
    ) -> Result<Vec<PlaceRecord>, PlacesError> {
        let mut params = vec![("query", query)];
        if let Some(location) = location {
            params.push(("location", location));
        }

        let url = self.build_url("restaurants/search", &params)?;
        let results: Vec<SearchResult> = self
            .get_json(&url, &format!("search(query={query})"))
            .await?;

        let records: Vec<PlaceRecord> = results
            .into_iter()
            .filter_map(SearchResult::into_record)
            .collect();
        tracing::debug!(query, results = records.len(), "text search complete");
        Ok(records)
    }

    /// Resolves `path` against the base URL and appends percent-encoded
    /// query parameters.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, PlacesError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| PlacesError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Sends a GET with retry and parses a 2xx body as `T`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<T, PlacesError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok());
                return Err(PlacesError::RateLimited { retry_after_secs });
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(PlacesError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                    detail: error_detail(&body),
                });
            }

            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|e| PlacesError::Deserialize {
                context: context.to_owned(),
                source: e,
            })
        })
        .await
    }
}

/// Extracts the `detail` message of an error body, falling back to the raw
/// body cut to 200 characters.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(serde_json::Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

impl NearbyFetcher for PlacesClient {
    async fn fetch_nearby(
        &self,
        origin: Coordinate,
        radius_m: u32,
        limit: usize,
    ) -> Result<Vec<PlaceRecord>, FetchError> {
        Ok(self.nearby(origin, radius_m, limit).await?)
    }
}

impl TextSearchFetcher for PlacesClient {
    async fn search(&self, query: &str) -> Result<Vec<PlaceRecord>, FetchError> {
        Ok(self
            .text_search(query, self.search_location.as_deref())
            .await?)
    }
}
