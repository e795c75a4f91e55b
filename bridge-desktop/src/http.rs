//! Graph request executor over reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Microsoft Graph v1.0 base URL
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Reqwest-based request executor
///
/// - Resolves provider-relative locators (`/me/drive/...`) against `base_url`
/// - Attaches the bearer token to API requests only (relative locators and
///   absolute links under `base_url`, such as next-page links); upload
///   session URLs on other hosts are pre-authorised and sent without it
/// - Returns every HTTP answer as a response; only transport failures are
///   errors, so callers keep control of status handling and retries
pub struct ReqwestHttpClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl ReqwestHttpClient {
    /// Create a client against the Graph API with default configuration
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(90))
    }

    /// Create a client with a custom default timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("drive-storage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self::with_client(client))
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: GRAPH_BASE_URL.to_string(),
            access_token: None,
        }
    }

    /// Override the base URL relative locators resolve against
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bearer token attached to API requests
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    fn resolve_url(&self, request: &HttpRequest) -> String {
        if request.is_absolute() {
            request.url.clone()
        } else {
            format!("{}/{}", self.base_url, request.url.trim_start_matches('/'))
        }
    }

    fn is_api_request(&self, request: &HttpRequest) -> bool {
        !request.is_absolute() || request.url.starts_with(&format!("{}/", self.base_url))
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let url = self.resolve_url(&request);
        let authorise = self.is_api_request(&request);
        let mut req = self.client.request(method, url);

        if authorise {
            if let Some(token) = &self.access_token {
                req = req.bearer_auth(token);
            }
        }

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let absolute = request.is_absolute();
        if absolute {
            debug!(method = %method, "Executing HTTP request against absolute URL");
        } else {
            debug!(method = %method, url = %request.url, "Executing HTTP request");
        }

        let response = self.build_request(request).send().await.map_err(|e| {
            warn!(error = %e, method = %method, "HTTP request failed");
            if e.is_timeout() {
                BridgeError::OperationFailed("Request timed out".to_string())
            } else if e.is_connect() {
                BridgeError::OperationFailed(format!("Connection failed: {}", e))
            } else {
                BridgeError::OperationFailed(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        debug!(status, bytes = body.len(), "HTTP response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = ReqwestHttpClient::new().unwrap();
        assert_eq!(client.base_url, GRAPH_BASE_URL);
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Patch),
            reqwest::Method::PATCH
        );
    }

    #[test]
    fn test_relative_locator_resolves_against_base() {
        let client = ReqwestHttpClient::new()
            .unwrap()
            .with_base_url("https://graph.example.com/v1.0/");
        let request = HttpRequest::new(HttpMethod::Get, "/me/drive/root:/a.txt");

        assert_eq!(
            client.resolve_url(&request),
            "https://graph.example.com/v1.0/me/drive/root:/a.txt"
        );
    }

    #[test]
    fn test_absolute_url_passes_through() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::new(HttpMethod::Put, "https://upload.example.com/s/abc");

        assert_eq!(client.resolve_url(&request), "https://upload.example.com/s/abc");
    }

    #[test]
    fn test_token_scope() {
        let client = ReqwestHttpClient::new().unwrap();
        let relative = HttpRequest::new(HttpMethod::Get, "/me/drive/root/children");
        let next_page = HttpRequest::new(
            HttpMethod::Get,
            "https://graph.microsoft.com/v1.0/me/drive/root/children?$skiptoken=x",
        );
        let upload = HttpRequest::new(HttpMethod::Put, "https://upload.example.com/s/abc");

        assert!(client.is_api_request(&relative));
        assert!(client.is_api_request(&next_page));
        assert!(!client.is_api_request(&upload));
    }
}
