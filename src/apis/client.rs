/// HTTP transport used by every provider client
///
/// Provider clients never talk to reqwest directly; they hand an
/// [`HttpRequest`] to a [`Transport`]. Production uses [`HttpClient`], tests
/// plug in scripted transports.
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Outbound GET request with a fully built URL
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// Raw provider response; the body is decoded by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request. `Err` means no HTTP response was received at all.
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// reqwest-backed transport with a default timeout
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("coinvote/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let mut builder = self
            .client
            .get(&request.url)
            .timeout(request.timeout)
            .header("Accept", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response body: {}", e))?;

        Ok(HttpResponse { status, body })
    }
}
