//! Resumable chunked upload
//!
//! Drives an upload session to completion: the source is read one chunk at a
//! time and each chunk is sent as a `PUT` to the session URL with a
//! `Content-Range` header. One chunk is in flight at a time.
//!
//! Per-chunk answers:
//!
//! | Status | Outcome |
//! |---|---|
//! | 202 (non-final chunk) | next chunk |
//! | 200 / 201 (final chunk) | completed, item returned |
//! | 404 | [`SessionExpired`](OneDriveError::SessionExpired) |
//! | 429 | wait `Retry-After`, resend the same range |
//! | 5xx | wait `2^retries * backoff_base`, resend the same range |
//! | 409 (final chunk) | [`NameConflict`](OneDriveError::NameConflict) |
//! | anything else | [`UnknownProtocol`](OneDriveError::UnknownProtocol) |
//!
//! 429 and 5xx share one retry counter per chunk, each path bounded by its
//! own ceiling.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::http::{HttpClient, HttpMethod, HttpResponse};
use bridge_traits::storage::ByteSource;
use core_runtime::config::DriveSettings;
use core_runtime::logging::redact_url;
use tracing::{debug, info, instrument, warn};

use crate::error::{OneDriveError, Result};
use crate::transport::{decode, Transport};
use crate::types::DriveItem;

/// Backend-issued upload capability for one file transfer
///
/// Consumed by [`ChunkedUploader::upload`]; a finished or expired session
/// cannot be reused.
pub struct UploadSession {
    path: String,
    upload_url: String,
    total_size: u64,
    offset: u64,
    chunk_size: usize,
    expires_at: Option<String>,
}

impl UploadSession {
    pub fn new(
        path: impl Into<String>,
        upload_url: impl Into<String>,
        total_size: u64,
        chunk_size: usize,
    ) -> Self {
        Self {
            path: path.into(),
            upload_url: upload_url.into(),
            total_size,
            offset: 0,
            chunk_size,
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: Option<String>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn expires_at(&self) -> Option<&str> {
        self.expires_at.as_deref()
    }
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("path", &self.path)
            .field("upload_url", &redact_url(&self.upload_url))
            .field("total_size", &self.total_size)
            .field("offset", &self.offset)
            .field("chunk_size", &self.chunk_size)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Retry limits and waits applied per chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_server_retries: u32,
    pub max_throttle_retries: u32,
    pub backoff_base: Duration,
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DriveSettings::default())
    }
}

impl From<&DriveSettings> for RetryPolicy {
    fn from(settings: &DriveSettings) -> Self {
        Self {
            max_server_retries: settings.max_server_retries,
            max_throttle_retries: settings.max_throttle_retries,
            backoff_base: settings.backoff_base,
            default_retry_after: settings.default_retry_after,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff for the given retry index
    pub fn server_backoff(&self, retries: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(retries))
    }

    /// Wait requested by a 429 answer
    pub fn throttle_wait(&self, response: &HttpResponse) -> Duration {
        response
            .header("Retry-After")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.default_retry_after)
    }
}

/// What one chunk answer means for the transfer
#[derive(Debug)]
enum ChunkOutcome {
    Accepted,
    Completed(DriveItem),
    Retry { wait: Duration, status: u16 },
}

/// Byte range of one chunk, inclusive
#[derive(Debug, Clone, Copy)]
struct ChunkRange {
    first: u64,
    last: u64,
    total: u64,
}

impl ChunkRange {
    fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.first, self.last, self.total)
    }

    fn len(&self) -> u64 {
        self.last - self.first + 1
    }

    fn is_final(&self) -> bool {
        self.last + 1 == self.total
    }
}

/// Upload session driver
pub struct ChunkedUploader {
    transport: Transport,
    policy: RetryPolicy,
}

impl ChunkedUploader {
    pub fn new(http: Arc<dyn HttpClient>, settings: &DriveSettings) -> Self {
        Self {
            transport: Transport::new(http, settings.request_timeout),
            policy: RetryPolicy::from(settings),
        }
    }

    pub(crate) fn from_transport(transport: Transport, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Abort between chunks and retry waits once `token` is cancelled.
    pub fn with_cancellation(mut self, token: tokio_util::sync::CancellationToken) -> Self {
        self.transport = self.transport.with_cancellation(token);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Transfer `source` through `session` and return the created item.
    ///
    /// The source must yield exactly `session.total_size()` bytes; it stays
    /// owned by the caller.
    #[instrument(skip_all, fields(path = %session.path, total = session.total_size))]
    pub async fn upload(
        &self,
        mut session: UploadSession,
        source: &mut dyn ByteSource,
    ) -> Result<DriveItem> {
        if session.total_size == 0 {
            return Err(OneDriveError::storage(
                "upload",
                "chunked upload needs a non-empty source",
            ));
        }

        debug!(upload_url = %redact_url(&session.upload_url), "Starting chunked upload");

        loop {
            let remaining = session.total_size - session.offset;
            let want = remaining.min(session.chunk_size as u64) as usize;
            let chunk = source.read_chunk(want).await?;

            // Every chunk but the last must be full-sized
            if chunk.is_empty() || chunk.len() < want {
                return Err(OneDriveError::ShortRead {
                    expected: session.total_size,
                    actual: session.offset + chunk.len() as u64,
                });
            }

            let range = ChunkRange {
                first: session.offset,
                last: session.offset + chunk.len() as u64 - 1,
                total: session.total_size,
            };

            if let Some(item) = self.send_chunk(&session, range, chunk).await? {
                info!(bytes = session.total_size, "Upload completed");
                return Ok(item);
            }

            session.offset += session.chunk_size as u64;
        }
    }

    /// Send one chunk until it is accepted, completes the upload or fails.
    async fn send_chunk(
        &self,
        session: &UploadSession,
        range: ChunkRange,
        chunk: bytes::Bytes,
    ) -> Result<Option<DriveItem>> {
        let mut retries: u32 = 0;

        loop {
            self.transport.ensure_active()?;

            let request = self
                .transport
                .request(HttpMethod::Put, session.upload_url.clone())
                .header("Content-Range", range.content_range())
                .header("Content-Length", range.len().to_string())
                .body(chunk.clone());

            debug!(range = %range.content_range(), retries, "Sending chunk");
            let response = self.transport.send(request).await?;

            match self.classify(session, range, retries, &response)? {
                ChunkOutcome::Accepted => return Ok(None),
                ChunkOutcome::Completed(item) => return Ok(Some(item)),
                ChunkOutcome::Retry { wait, status } => {
                    warn!(
                        status,
                        retries,
                        wait_ms = wait.as_millis() as u64,
                        range = %range.content_range(),
                        "Chunk rejected, retrying same range"
                    );
                    self.wait(wait).await?;
                    retries += 1;
                }
            }
        }
    }

    fn classify(
        &self,
        session: &UploadSession,
        range: ChunkRange,
        retries: u32,
        response: &HttpResponse,
    ) -> Result<ChunkOutcome> {
        let status = response.status;

        if status == 404 {
            return Err(OneDriveError::SessionExpired);
        }

        if status == 429 {
            if retries > self.policy.max_throttle_retries {
                return Err(OneDriveError::RateLimited {
                    attempts: retries + 1,
                });
            }
            return Ok(ChunkOutcome::Retry {
                wait: self.policy.throttle_wait(response),
                status,
            });
        }

        if response.is_server_error() {
            if retries > self.policy.max_server_retries {
                return Err(OneDriveError::TransientServer {
                    status,
                    attempts: retries + 1,
                });
            }
            return Ok(ChunkOutcome::Retry {
                wait: self.policy.server_backoff(retries),
                status,
            });
        }

        if range.is_final() {
            return match status {
                409 => Err(OneDriveError::NameConflict {
                    path: session.path.clone(),
                }),
                200 | 201 => Ok(ChunkOutcome::Completed(decode(response)?)),
                _ => Err(OneDriveError::UnknownProtocol {
                    status,
                    context: "uploading the last chunk".to_string(),
                }),
            };
        }

        if status == 202 {
            Ok(ChunkOutcome::Accepted)
        } else {
            Err(OneDriveError::UnknownProtocol {
                status,
                context: format!("uploading chunk {}", range.content_range()),
            })
        }
    }

    async fn wait(&self, duration: Duration) -> Result<()> {
        let cancel = self.transport.cancel_token();
        tokio::select! {
            _ = cancel.cancelled() => Err(OneDriveError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
