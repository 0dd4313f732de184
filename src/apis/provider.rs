/// Generic provider client
///
/// Builds provider URLs (base URL + endpoint + query params + auth), routes
/// every call through the provider's dispatch queue and turns the raw
/// response into either a decoded payload or a [`ProviderError`].
use crate::apis::client::{HttpRequest, HttpResponse, Transport};
use crate::apis::queue::{ProviderQueue, QueueSettings};
use crate::apis::stats::{ApiStats, ApiStatsTracker};
use crate::errors::ProviderError;
use crate::logger::{self, LogTag};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Longest response body excerpt carried in a `Status` error
const MAX_ERROR_BODY_CHARS: usize = 200;

/// How a provider expects its API key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    None,
    /// Key sent in the named request header
    Header(&'static str),
    /// Key appended as the named query parameter
    Query(&'static str),
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub key: String,
    pub base_url: String,
    pub api_key: String,
    pub auth: AuthScheme,
    pub min_interval: Duration,
    pub timeout: Duration,
    pub max_queue_depth: usize,
    pub enabled: bool,
}

impl ProviderSettings {
    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings::new(&self.key, self.min_interval)
            .with_call_timeout(self.timeout)
            .with_max_depth(self.max_queue_depth)
    }
}

pub struct ProviderClient {
    settings: ProviderSettings,
    transport: Arc<dyn Transport>,
    queue: Arc<ProviderQueue>,
    stats: Arc<ApiStatsTracker>,
}

impl ProviderClient {
    pub fn new(
        settings: ProviderSettings,
        transport: Arc<dyn Transport>,
        queue: Arc<ProviderQueue>,
    ) -> Self {
        Self {
            settings,
            transport,
            queue,
            stats: Arc::new(ApiStatsTracker::new()),
        }
    }

    pub fn key(&self) -> &str {
        &self.settings.key
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn queue(&self) -> &Arc<ProviderQueue> {
        &self.queue
    }

    pub async fn get_stats(&self) -> ApiStats {
        self.stats.get_stats().await
    }

    /// Build the full request URL for `endpoint` with `params`
    pub fn build_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url, ProviderError> {
        let base = format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        let mut url = Url::parse(&base).map_err(|e| ProviderError::Network {
            provider: self.settings.key.clone(),
            message: format!("Invalid URL '{}': {}", base, e),
        })?;

        {
            let mut query = url.query_pairs_mut();
            for (name, value) in params {
                query.append_pair(name, value);
            }
            if let AuthScheme::Query(name) = self.settings.auth {
                if !self.settings.api_key.is_empty() {
                    query.append_pair(name, &self.settings.api_key);
                }
            }
        }
        // An empty query_pairs_mut() leaves a dangling '?'
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }

    fn build_request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<HttpRequest, ProviderError> {
        let url = self.build_url(endpoint, params)?;
        let mut headers = Vec::new();
        if let AuthScheme::Header(name) = self.settings.auth {
            if !self.settings.api_key.is_empty() {
                headers.push((name.to_string(), self.settings.api_key.clone()));
            }
        }

        Ok(HttpRequest {
            url: url.to_string(),
            headers,
            timeout: self.settings.timeout,
        })
    }

    /// GET `endpoint` through the dispatch queue and decode the JSON body
    pub async fn fetch<T>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        let provider = self.settings.key.clone();
        if !self.settings.enabled {
            return Err(ProviderError::Disabled(provider));
        }

        let request = self.build_request(endpoint, params)?;
        logger::debug(
            LogTag::Api,
            &format!("[{}] Queueing GET {}", provider.to_uppercase(), endpoint),
        );

        let transport = self.transport.clone();
        let outcome = self
            .queue
            .enqueue(move || async move {
                let start = Instant::now();
                let result = transport.get(request).await;
                (result, start.elapsed().as_millis() as f64)
            })
            .await;

        let (result, elapsed) = match outcome {
            Ok(done) => done,
            Err(queue_err) => {
                self.stats.record_request(false, 0.0).await;
                self.stats.record_error(queue_err.to_string()).await;
                logger::warning(
                    LogTag::Api,
                    &format!("[{}] {} not completed: {}", provider.to_uppercase(), endpoint, queue_err),
                );
                return Err(ProviderError::Queue(queue_err));
            }
        };

        let response = match result {
            Ok(response) => response,
            Err(message) => {
                return Err(self
                    .fail(endpoint, elapsed, ProviderError::Network { provider, message })
                    .await);
            }
        };

        self.decode(endpoint, elapsed, response).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        elapsed: f64,
        response: HttpResponse,
    ) -> Result<T, ProviderError> {
        let provider = self.settings.key.clone();

        if !response.is_success() {
            let message: String = response.body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(self
                .fail(
                    endpoint,
                    elapsed,
                    ProviderError::Status {
                        provider,
                        status: response.status,
                        message,
                    },
                )
                .await);
        }

        match serde_json::from_str::<T>(&response.body) {
            Ok(value) => {
                self.stats.record_request(true, elapsed).await;
                logger::verbose(
                    LogTag::Api,
                    &format!(
                        "[{}] {} OK in {:.0}ms ({} bytes)",
                        provider.to_uppercase(),
                        endpoint,
                        elapsed,
                        response.body.len()
                    ),
                );
                Ok(value)
            }
            Err(e) => Err(self
                .fail(
                    endpoint,
                    elapsed,
                    ProviderError::Decode {
                        provider,
                        message: e.to_string(),
                    },
                )
                .await),
        }
    }

    async fn fail(&self, endpoint: &str, elapsed: f64, error: ProviderError) -> ProviderError {
        self.stats.record_request(false, elapsed).await;
        self.stats.record_error(error.to_string()).await;
        logger::warning(
            LogTag::Api,
            &format!("[{}] {} failed: {}", self.settings.key.to_uppercase(), endpoint, error),
        );
        error
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{client, settings};
    use super::*;
    use crate::apis::client::testing::MockTransport;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ping {
        ok: bool,
    }

    #[tokio::test]
    async fn test_header_auth_and_success_decode() {
        let transport = Arc::new(MockTransport::new().route("/ping", 200, r#"{"ok":true}"#));
        let client = client(
            settings("cmc", "https://example.test/", AuthScheme::Header("X-KEY"), 0),
            transport.clone(),
        );

        let ping: Ping = client.fetch("/ping", &[("limit", "5".to_string())]).await.unwrap();
        assert_eq!(ping, Ping { ok: true });

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.url, "https://example.test/ping?limit=5");
        assert_eq!(calls[0].1.headers, vec![("X-KEY".to_string(), "secret".to_string())]);
        assert_eq!(client.get_stats().await.successful_requests, 1);
    }

    #[tokio::test]
    async fn test_query_auth_appends_key() {
        let transport = Arc::new(MockTransport::new());
        let client = client(
            settings("gecko", "https://example.test/api/v3", AuthScheme::Query("x_key"), 0),
            transport,
        );
        let url = client.build_url("search", &[("query", "btc coin".to_string())]).unwrap();
        assert_eq!(url.as_str(), "https://example.test/api/v3/search?query=btc+coin&x_key=secret");
    }

    #[tokio::test]
    async fn test_non_success_status_maps_to_status_error() {
        let transport = Arc::new(MockTransport::new().route("/ping", 500, "internal failure"));
        let client = client(settings("cmc", "https://example.test", AuthScheme::None, 0), transport);

        let err = client.fetch::<Ping>("ping", &[]).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        match err {
            ProviderError::Status { message, .. } => assert_eq!(message, "internal failure"),
            other => panic!("unexpected error: {:?}", other),
        }
        let stats = client.get_stats().await;
        assert_eq!(stats.failed_requests, 1);
        assert!(stats.last_error.is_some());
    }

    #[tokio::test]
    async fn test_malformed_payload_maps_to_decode_error() {
        let transport = Arc::new(MockTransport::new().route("/ping", 200, "<html>"));
        let client = client(settings("cmc", "https://example.test", AuthScheme::None, 0), transport);

        let err = client.fetch::<Ping>("ping", &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_disabled_provider_never_calls_out() {
        let transport = Arc::new(MockTransport::new());
        let mut disabled = settings("cmc", "https://example.test", AuthScheme::None, 0);
        disabled.enabled = false;
        let client = client(disabled, transport.clone());

        let err = client.fetch::<Ping>("ping", &[]).await.unwrap_err();
        assert_eq!(err, ProviderError::Disabled("cmc".to_string()));
        assert_eq!(transport.call_count(), 0);
    }
}
