//! # Drive Configuration Module
//!
//! Provides configuration management for the remote-drive storage core.
//!
//! ## Overview
//!
//! Settings that shape protocol behaviour (chunk size, retry ceilings,
//! timeouts) live in [`DriveSettings`], a plain serialisable struct. The
//! builder combines them with the injected collaborators into a
//! [`DriveConfig`] and validates both before anything touches the network.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Request executor (desktop default: reqwest against Graph)
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `PathStore` - Path cache (default: in-memory `MemoryPathStore`)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::DriveConfig;
//! use std::sync::Arc;
//!
//! let config = DriveConfig::builder()
//!     .root("/Apps/backup")
//!     .chunk_size(10 * 320 * 1024)
//!     .http_client(Arc::new(MyHttpClient))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::DriveConfig;
//!
//! // Chunk sizes must be multiples of 320 KiB
//! let config = DriveConfig::builder()
//!     .chunk_size(1000)
//!     .build()
//!     .expect("Should fail - misaligned chunk size");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, MemoryPathStore, PathStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Upload chunks must be multiples of this many bytes (320 KiB)
pub const CHUNK_ALIGNMENT: usize = 320 * 1024;

/// Largest chunk the upload endpoint accepts in one request (60 MiB)
pub const MAX_CHUNK_SIZE: usize = 60 * 1024 * 1024;

/// Conflict resolution requested when an upload session is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictBehavior {
    Fail,
    Replace,
    Rename,
}

impl ConflictBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictBehavior::Fail => "fail",
            ConflictBehavior::Replace => "replace",
            ConflictBehavior::Rename => "rename",
        }
    }
}

/// Protocol settings for the drive provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSettings {
    /// Caller-visible root; a leading `/` or `\` is echoed on reported paths
    pub root: String,

    /// Upload chunk size in bytes
    pub chunk_size: usize,

    /// Timeout attached to each request
    pub request_timeout: Duration,

    /// 5xx retries per chunk before the upload fails
    pub max_server_retries: u32,

    /// 429 retries per chunk before the upload fails
    pub max_throttle_retries: u32,

    /// Unit of the exponential backoff applied to 5xx answers
    pub backoff_base: Duration,

    /// Wait applied when a 429 answer carries no `Retry-After`
    pub default_retry_after: Duration,

    /// Conflict behaviour sent with upload session requests
    pub conflict_behavior: Option<ConflictBehavior>,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            root: String::new(),
            chunk_size: CHUNK_ALIGNMENT,
            request_timeout: Duration::from_secs(90),
            max_server_retries: 9,
            max_throttle_retries: 9,
            backoff_base: Duration::from_secs(1),
            default_retry_after: Duration::from_secs(1),
            conflict_behavior: None,
        }
    }
}

impl DriveSettings {
    /// Validates the settings and returns an error if invalid.
    ///
    /// This checks:
    /// - Chunk size is a non-zero multiple of 320 KiB and at most 60 MiB
    /// - Request timeout is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size % CHUNK_ALIGNMENT != 0 {
            return Err(Error::Config(format!(
                "Chunk size must be a non-zero multiple of {} bytes (320 KiB), got {}",
                CHUNK_ALIGNMENT, self.chunk_size
            )));
        }

        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::Config(format!(
                "Chunk size exceeds maximum of {} bytes (60 MiB), got {}",
                MAX_CHUNK_SIZE, self.chunk_size
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Character prepended to normalised paths, derived from `root`
    pub fn root_prefix(&self) -> &'static str {
        match self.root.chars().next() {
            Some('/') => "/",
            Some('\\') => "\\",
            _ => "",
        }
    }
}

/// Drive configuration: settings plus injected collaborators.
///
/// Use [`DriveConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct DriveConfig {
    pub settings: DriveSettings,

    /// Request executor
    pub http_client: Arc<dyn HttpClient>,

    /// Path cache
    pub path_store: Arc<dyn PathStore>,
}

impl std::fmt::Debug for DriveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveConfig")
            .field("settings", &self.settings)
            .field("http_client", &"HttpClient { ... }")
            .field("path_store", &"PathStore { ... }")
            .finish()
    }
}

impl DriveConfig {
    /// Creates a new builder for constructing a `DriveConfig`.
    pub fn builder() -> DriveConfigBuilder {
        DriveConfigBuilder::default()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the drive API. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Other hosts: inject an executor that handles authentication."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(
    settings: &DriveSettings,
    access_token: Option<String>,
) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let mut client = ReqwestHttpClient::with_timeout(settings.request_timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    if let Some(token) = access_token {
        client = client.with_access_token(token);
    }

    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(
    _settings: &DriveSettings,
    _access_token: Option<String>,
) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Builder for constructing [`DriveConfig`] instances.
#[derive(Default)]
pub struct DriveConfigBuilder {
    settings: DriveSettings,
    http_client: Option<Arc<dyn HttpClient>>,
    path_store: Option<Arc<dyn PathStore>>,
    access_token: Option<String>,
}

impl DriveConfigBuilder {
    /// Replaces all protocol settings at once.
    pub fn settings(mut self, settings: DriveSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the caller-visible root.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.settings.root = root.into();
        self
    }

    /// Sets the upload chunk size in bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::{DriveConfig, CHUNK_ALIGNMENT};
    ///
    /// let builder = DriveConfig::builder().chunk_size(4 * CHUNK_ALIGNMENT);
    /// ```
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.settings.chunk_size = bytes;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.settings.request_timeout = timeout;
        self
    }

    pub fn max_server_retries(mut self, retries: u32) -> Self {
        self.settings.max_server_retries = retries;
        self
    }

    pub fn max_throttle_retries(mut self, retries: u32) -> Self {
        self.settings.max_throttle_retries = retries;
        self
    }

    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.settings.backoff_base = base;
        self
    }

    pub fn default_retry_after(mut self, wait: Duration) -> Self {
        self.settings.default_retry_after = wait;
        self
    }

    pub fn conflict_behavior(mut self, behavior: ConflictBehavior) -> Self {
        self.settings.conflict_behavior = Some(behavior);
        self
    }

    /// Sets the request executor.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Bearer token handed to the desktop default executor.
    ///
    /// Ignored when an explicit [`http_client`](Self::http_client) is set.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the path cache; defaults to an in-memory store.
    pub fn path_store(mut self, store: Arc<dyn PathStore>) -> Self {
        self.path_store = Some(store);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - Settings fail [`DriveSettings::validate`]
    /// - No `HttpClient` was supplied and no desktop default is available
    pub fn build(self) -> Result<DriveConfig> {
        self.settings.validate()?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(&self.settings, self.access_token)?,
        };

        let path_store = self
            .path_store
            .unwrap_or_else(|| Arc::new(MemoryPathStore::new()));

        Ok(DriveConfig {
            settings: self.settings,
            http_client,
            path_store,
        })
    }
}
