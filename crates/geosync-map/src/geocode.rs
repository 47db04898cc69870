//! Free-text location search.

use crate::loader::request_error;
use async_trait::async_trait;
use geosync_core::config::SourcesConfig;
use geosync_core::error::FetchError;
use geosync_core::types::{Feature, LatLng};
use geosync_core::Result;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const LABEL_FIELDS: [&str; 5] = ["name", "street", "city", "state", "country"];

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub label: String,
    pub position: LatLng,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeResult>>;
}

/// Decodes a geocoder response.
///
/// Entries without a usable point are skipped. The label joins the non-empty
/// name, street, city, state, and country properties.
pub fn parse_response(body: &Value) -> Vec<GeocodeResult> {
    let Some(features) = body.get("features").and_then(Value::as_array) else {
        return Vec::new();
    };

    features
        .iter()
        .filter_map(Feature::from_json_value)
        .filter_map(|feature| {
            let position = feature.point_position()?;
            let label = LABEL_FIELDS
                .iter()
                .filter_map(|field| feature.properties.get(*field)?.as_str())
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            Some(GeocodeResult { label, position })
        })
        .collect()
}

/// HTTP geocoder taking `q` and `limit` query parameters.
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    url: String,
    limit: usize,
    timeout: Duration,
}

impl GeocodeClient {
    pub fn new(client: Client, url: impl Into<String>, limit: usize, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            limit,
            timeout,
        }
    }

    pub fn from_config(sources: &SourcesConfig, client: Client) -> Self {
        Self::new(
            client,
            sources.geocode_url.clone(),
            sources.geocode_limit,
            sources.request_timeout(),
        )
    }
}

#[async_trait]
impl Geocoder for GeocodeClient {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeResult>> {
        let limit = self.limit.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", query), ("limit", limit.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error(&self.url, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| request_error(&self.url, self.timeout, e))?;
        Ok(parse_response(&body))
    }
}

/// Search box behavior: waits for a quiet period and drops superseded
/// queries.
pub struct DebouncedSearch {
    geocoder: Arc<dyn Geocoder>,
    delay: Duration,
    current: Mutex<CancellationToken>,
}

impl DebouncedSearch {
    pub fn new(geocoder: Arc<dyn Geocoder>, delay: Duration) -> Self {
        Self {
            geocoder,
            delay,
            current: Mutex::new(CancellationToken::new()),
        }
    }

    /// Searches once `delay` passes without a newer call.
    ///
    /// Returns `None` when a newer call superseded this one. Blank queries
    /// and failed requests yield an empty list.
    pub async fn search(&self, query: &str) -> Option<Vec<GeocodeResult>> {
        let token = {
            let mut current = self.current.lock();
            current.cancel();
            *current = CancellationToken::new();
            current.clone()
        };

        let query = query.trim();
        if query.is_empty() {
            return Some(Vec::new());
        }

        tokio::select! {
            _ = token.cancelled() => return None,
            _ = tokio::time::sleep(self.delay) => {}
        }

        let result = tokio::select! {
            _ = token.cancelled() => return None,
            result = self.geocoder.search(query) => result,
        };

        match result {
            Ok(results) => {
                debug!(query, results = results.len(), "Geocode search complete");
                Some(results)
            }
            Err(e) => {
                warn!(query, error = %e, "Geocode search failed");
                Some(Vec::new())
            }
        }
    }

    /// Drops the pending search, if any.
    pub fn cancel(&self) {
        self.current.lock().cancel();
    }
}
