//! HTTP transport seam for the Redfish management API
//!
//! The engine only sees [`RedfishTransport`]: one `invoke` call per
//! network round trip, returning the status code, the `Location` header,
//! and the parsed JSON body. Application-level failures (4xx/5xx) come
//! back as responses for the caller to interpret; only connectivity and
//! TLS problems surface as errors.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub use reqwest::Method;

// =============================================================================
// Response
// =============================================================================

/// A single response from the management endpoint.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Location` header, carrying the job resource for accepted actions.
    pub location: Option<String>,
    /// Parsed JSON body, `Value::Null` when the body is empty.
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Session collaborator issuing requests against the management endpoint.
#[async_trait]
pub trait RedfishTransport: Send + Sync {
    /// Issue one request. Errors are transport-level only; HTTP error
    /// statuses are returned as an [`ApiResponse`].
    async fn invoke(&self, method: Method, path: &str, body: Option<Value>)
        -> Result<ApiResponse>;

    async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.invoke(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<ApiResponse> {
        self.invoke(Method::POST, path, Some(body)).await
    }

    async fn patch(&self, path: &str, body: Value) -> Result<ApiResponse> {
        self.invoke(Method::PATCH, path, Some(body)).await
    }
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Endpoint base, e.g. `https://192.168.0.1:443`.
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Accept self-signed BMC certificates.
    pub accept_invalid_certs: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost".to_string(),
            username: "root".to_string(),
            password: String::new(),
            accept_invalid_certs: false,
            timeout: Duration::from_secs(30),
        }
    }
}

/// `reqwest`-backed transport with basic authentication.
pub struct HttpTransport {
    config: HttpConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl RedfishTransport for HttpTransport {
    async fn invoke(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse> {
        let url = self.url_for(path);
        debug!(%method, %url, "invoking management endpoint");

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_connect() || err.is_timeout() {
                Error::Unreachable(err.to_string())
            } else {
                Error::Transport(err)
            }
        })?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|err| {
                warn!(%url, %err, "response body is not valid JSON");
                Value::Null
            })
        };

        Ok(ApiResponse {
            status,
            location,
            body,
        })
    }
}

// =============================================================================
// Mock Transport (test support)
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join_strips_trailing_slash() {
        let transport = HttpTransport::new(HttpConfig {
            base_url: "https://192.168.0.1:443/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            transport.url_for("/redfish/v1/Systems/"),
            "https://192.168.0.1:443/redfish/v1/Systems/"
        );
    }

    #[tokio::test]
    async fn test_mock_replays_in_order_then_repeats() {
        use mock::MockTransport;

        let mock = MockTransport::new();
        mock.respond_json(Method::GET, "/a", serde_json::json!({"n": 1}));
        mock.respond_json(Method::GET, "/a", serde_json::json!({"n": 2}));

        let first = mock.get("/a").await.unwrap();
        let second = mock.get("/a").await.unwrap();
        let third = mock.get("/a").await.unwrap();
        assert_eq!(first.body["n"], 1);
        assert_eq!(second.body["n"], 2);
        assert_eq!(third.body["n"], 2);

        let missing = mock.get("/b").await.unwrap();
        assert_eq!(missing.status, 404);
    }
}
