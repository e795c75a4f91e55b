//! Single-attempt request plumbing shared by the provider's components.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_runtime::logging::redact_url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{OneDriveError, Result};
use crate::types::ErrorResponse;

/// Executor handle plus the per-request settings every call shares
#[derive(Clone)]
pub(crate) struct Transport {
    http: Arc<dyn HttpClient>,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Transport {
    pub(crate) fn new(http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self {
            http,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(OneDriveError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn request(&self, method: HttpMethod, locator: impl Into<String>) -> HttpRequest {
        HttpRequest::new(method, locator).timeout(self.timeout)
    }

    pub(crate) fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        locator: impl Into<String>,
        body: &T,
    ) -> Result<HttpRequest> {
        Ok(self.request(method, locator).json(body)?)
    }

    /// Execute one request; every HTTP answer comes back as a response.
    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(
            method = %request.method,
            locator = %redact_url(&request.url),
            "Sending drive request"
        );
        let response = self.http.execute(request).await?;
        debug!(status = response.status, "Drive request answered");
        Ok(response)
    }

    /// Execute and require a 2xx answer.
    pub(crate) async fn send_checked(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(api_error(&response))
        }
    }

    /// Execute, require 2xx and decode the body.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let response = self.send_checked(request).await?;
        decode(&response)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| OneDriveError::Parse(e.to_string()))
}

/// Build an `Api` error from a non-success answer, preferring the Graph
/// error envelope over the raw body.
pub(crate) fn api_error(response: &HttpResponse) -> OneDriveError {
    let message = match serde_json::from_slice::<ErrorResponse>(&response.body) {
        Ok(envelope) if envelope.error.message.is_empty() => envelope.error.code,
        Ok(envelope) => format!("{}: {}", envelope.error.code, envelope.error.message),
        Err(_) => String::from_utf8_lossy(&response.body).into_owned(),
    };

    OneDriveError::Api {
        status: response.status,
        message,
    }
}
