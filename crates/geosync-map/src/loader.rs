//! Feature collection loading.
//!
//! Every layer has a [`FeatureSource`]. Loads are fail-soft: a failed fetch
//! is logged and yields an empty collection, so one bad source never blocks
//! the others. Loaded collections are filtered to the configured radius
//! around the reference point.

use async_trait::async_trait;
use futures::future::join_all;
use geosync_core::config::AppConfig;
use geosync_core::error::{FetchError, ParseError};
use geosync_core::types::{FeatureCollection, LatLng, LayerKey};
use geosync_core::{GeoSyncError, Result};
use metrics::{counter, describe_counter};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A source of one feature collection.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<FeatureCollection>;
}

/// Fetches a GeoJSON document over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeatureSource {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpFeatureSource {
    pub fn new(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Maps a reqwest error onto the fetch taxonomy.
pub(crate) fn request_error(url: &str, timeout: Duration, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else if let Some(status) = error.status() {
        FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::failed(url, error.to_string())
    }
}

#[async_trait]
impl FeatureSource for HttpFeatureSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<FeatureCollection> {
        let response = self
            .client
            .get(&self.url)
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

        FeatureCollection::from_value(&body).ok_or_else(|| {
            ParseError::not_feature_collection(format!("{} has no features array", self.url))
                .into()
        })
    }
}

/// An in-memory collection.
#[derive(Debug, Clone, Default)]
pub struct StaticFeatureSource {
    collection: FeatureCollection,
}

impl StaticFeatureSource {
    pub fn new(collection: FeatureCollection) -> Self {
        Self { collection }
    }

    /// Decodes a GeoJSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let collection = FeatureCollection::from_value(&value).ok_or_else(|| {
            GeoSyncError::from(ParseError::not_feature_collection("missing features array"))
        })?;
        Ok(Self { collection })
    }
}

#[async_trait]
impl FeatureSource for StaticFeatureSource {
    fn describe(&self) -> String {
        format!("static({} features)", self.collection.len())
    }

    async fn fetch(&self) -> Result<FeatureCollection> {
        Ok(self.collection.clone())
    }
}

/// Loads and radius-filters the collections of every data layer.
pub struct FeatureLoader {
    sources: HashMap<LayerKey, Arc<dyn FeatureSource>>,
    center: LatLng,
    radius_m: f64,
    cancel: CancellationToken,
}

impl FeatureLoader {
    pub fn new(center: LatLng, radius_m: f64) -> Self {
        describe_counter!(
            "geosync_fetches_total",
            "Feature collection fetches started"
        );
        describe_counter!(
            "geosync_fetch_failures_total",
            "Feature collection fetches that failed and yielded an empty layer"
        );

        Self {
            sources: HashMap::new(),
            center,
            radius_m,
            cancel: CancellationToken::new(),
        }
    }

    /// HTTP sources for every configured layer URL.
    pub fn from_config(config: &AppConfig, client: Client) -> Self {
        let mut loader = Self::new(config.map.reference, config.map.radius_m);
        for key in LayerKey::ALL {
            if let Some(url) = config.sources.resolved_url(key) {
                loader = loader.with_source(
                    key,
                    Arc::new(HttpFeatureSource::new(
                        client.clone(),
                        url,
                        config.sources.request_timeout(),
                    )),
                );
            }
        }
        loader
    }

    pub fn with_source(mut self, key: LayerKey, source: Arc<dyn FeatureSource>) -> Self {
        self.sources.insert(key, source);
        self
    }

    pub fn has_source(&self, key: LayerKey) -> bool {
        self.sources.contains_key(&key)
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Token canceled by [`cancel`](Self::cancel).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Aborts in-flight and future loads.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Loads one layer.
    ///
    /// Missing sources, failed fetches, and canceled loads all yield an
    /// empty collection.
    pub async fn load(&self, key: LayerKey) -> FeatureCollection {
        let Some(source) = self.sources.get(&key) else {
            debug!(layer = %key, "No source configured");
            return FeatureCollection::default();
        };

        counter!("geosync_fetches_total").increment(1);
        let result: Result<FeatureCollection> = tokio::select! {
            _ = self.cancel.cancelled() => Err(FetchError::cancelled(source.describe()).into()),
            result = source.fetch() => result,
        };

        match result {
            Ok(collection) => {
                let total = collection.len();
                let filtered = collection.filter_by_radius(self.center, self.radius_m);
                info!(
                    layer = %key,
                    source = %source.describe(),
                    total,
                    within_radius = filtered.len(),
                    "Loaded feature collection"
                );
                filtered
            }
            Err(e) => {
                counter!("geosync_fetch_failures_total").increment(1);
                warn!(layer = %key, source = %source.describe(), error = %e, transient = e.is_transient(), "Layer fetch failed, using empty layer");
                FeatureCollection::default()
            }
        }
    }

    /// Loads every configured layer concurrently and joins the results.
    pub async fn load_all(&self) -> HashMap<LayerKey, FeatureCollection> {
        let keys: Vec<LayerKey> = LayerKey::ALL
            .into_iter()
            .filter(|k| self.sources.contains_key(k))
            .collect();

        let loaded = join_all(keys.iter().map(|&key| self.load(key))).await;
        keys.into_iter().zip(loaded).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosync_core::geo::miles_to_meters;
    use geosync_core::types::Feature;
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingSource;

    #[async_trait]
    impl FeatureSource for FailingSource {
        fn describe(&self) -> String {
            "failing".to_string()
        }

        async fn fetch(&self) -> Result<FeatureCollection> {
            Err(FetchError::failed("http://localhost/broken.geojson", "connection refused").into())
        }
    }

    struct SlowSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeatureSource for SlowSource {
        fn describe(&self) -> String {
            "slow".to_string()
        }

        async fn fetch(&self) -> Result<FeatureCollection> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(FeatureCollection::new(vec![Feature::point(
                LatLng::new(40.7128, -74.0060),
                Map::new(),
            )]))
        }
    }

    fn shops() -> FeatureCollection {
        FeatureCollection::new(vec![
            Feature::point(LatLng::new(40.7130, -74.0050), Map::new()),
            Feature::point(LatLng::new(41.5000, -74.0000), Map::new()),
        ])
    }

    fn loader() -> FeatureLoader {
        FeatureLoader::new(LatLng::new(40.7128, -74.0060), miles_to_meters(3.0))
    }

    #[tokio::test]
    async fn test_load_filters_by_radius() {
        let loader = loader().with_source(
            LayerKey::CoffeeShops,
            Arc::new(StaticFeatureSource::new(shops())),
        );
        assert_eq!(loader.load(LayerKey::CoffeeShops).await.len(), 1);
        assert!(loader.load(LayerKey::Storefronts).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_all_is_fail_soft() {
        let loader = loader()
            .with_source(LayerKey::CoffeeShops, Arc::new(StaticFeatureSource::new(shops())))
            .with_source(LayerKey::SubwayStations, Arc::new(FailingSource));

        let loaded = loader.load_all().await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[&LayerKey::CoffeeShops].len(), 1);
        assert!(loaded[&LayerKey::SubwayStations].is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_load() {
        let source = Arc::new(SlowSource {
            calls: AtomicUsize::new(0),
        });
        let loader = Arc::new(loader().with_source(LayerKey::CoffeeShops, source.clone()));

        let task = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load(LayerKey::CoffeeShops).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        loader.cancel();

        let collection = task.await.unwrap();
        assert!(collection.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_static_source_from_json() {
        let source = StaticFeatureSource::from_json(
            r#"{"features": [{"geometry": {"type": "Point", "coordinates": [-74.0, 40.7]}, "properties": {}}]}"#,
        )
        .unwrap();
        assert_eq!(source.describe(), "static(1 features)");
        assert!(StaticFeatureSource::from_json(r#"{"type": "Feature"}"#).is_err());
        assert!(StaticFeatureSource::from_json("not json").is_err());
    }
}
