//! HTTP fetch pipeline.
//!
//! ### Network contract
//! - Transport failures (DNS, refused connection, timeout, oversized body)
//!   are errors; the cache controller falls back to the cache on these.
//! - Every HTTP status is a successful fetch. Callers decide what a 404
//!   means.
//!
//! ### URL Canonicalization
//! - Trim whitespace, resolve against the site origin
//! - Lowercase host, remove fragments
//! - Preserve query string

pub mod url;

use bytes::Bytes;
use reqwest::{Client, Method, StatusCode, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, as_base, canonicalize, resolve, within};

use rutas_core::{AppConfig, Error, RequestIdentity, ResponseSnapshot};

/// Anything that can answer a request over the network.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Issue the request. `Err` means the network could not be reached.
    async fn fetch(&self, identity: &RequestIdentity) -> Result<FetchResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "rutas/<version>")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 10s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes, already decoded
    pub bytes: Bytes,
}

impl FetchResponse {
    /// Copy the response into a storable snapshot.
    ///
    /// Headers that are not valid UTF-8 are dropped.
    pub fn to_snapshot(&self, identity: &RequestIdentity) -> ResponseSnapshot {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        ResponseSnapshot::new(identity, self.status.as_u16(), headers, self.bytes.to_vec())
    }
}

/// reqwest-backed network client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("no response within {}ms", self.config.timeout.as_millis()))
        } else {
            Error::Network(err.to_string())
        }
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, identity: &RequestIdentity) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(identity.url()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method = Method::from_bytes(identity.method().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", identity.method())))?;

        let response = self
            .http
            .request(method, url.as_str())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            identity.method(),
            url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(FetchResponse { status, headers, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert!(config.user_agent.starts_with("rutas/"));
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(10_000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_to_snapshot_copies_response() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let response = FetchResponse { status: StatusCode::OK, headers, bytes: Bytes::from_static(b"[]") };

        let identity = RequestIdentity::get("http://localhost:8080/data/rutas.json");
        let snapshot = response.to_snapshot(&identity);

        assert_eq!(snapshot.status, 200);
        assert_eq!(snapshot.body, b"[]");
        assert_eq!(snapshot.header("Content-Type"), Some("application/json"));
        assert_eq!(snapshot.identity(), identity);
        assert_eq!(response.bytes, Bytes::from_static(b"[]"));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_url() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let result = client.fetch(&RequestIdentity::get("ftp://example.com/file")).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_network_failure() {
        let config = FetchConfig { timeout: Duration::from_millis(500), ..Default::default() };
        let client = FetchClient::new(config).unwrap();
        // port 9 (discard) on localhost is closed on any sane test host
        let result = client.fetch(&RequestIdentity::get("http://127.0.0.1:9/")).await;
        assert!(result.unwrap_err().is_network_failure());
    }
}
