//! Storage driver
//!
//! Presents the drive as a file store: typed errors with operation context,
//! `FileNotFound` for vanished paths, parent folders created on demand, and a
//! path cache kept coherent with every mutation.

use std::sync::Arc;

use bridge_traits::storage::{ByteSource, BytesSource, FileAttributes, PathStore, Visibility};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_runtime::config::DriveConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::client::OneDriveClient;
use crate::endpoint;
use crate::error::{OneDriveError, Result};
use crate::pagination::ContentListing;
use crate::visibility::parse_visibility;

/// Options applied after a successful write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub visibility: Option<Visibility>,
}

impl WriteOptions {
    pub fn with_visibility(visibility: Visibility) -> Self {
        Self {
            visibility: Some(visibility),
        }
    }
}

/// Boolean view of a driver result for callers that only need success or
/// failure.
pub trait StorageResultExt {
    /// `true` on success. Failures are logged and swallowed; a missing file
    /// is logged at debug level only.
    fn succeeded(self) -> bool;
}

impl<T> StorageResultExt for Result<T> {
    fn succeeded(self) -> bool {
        match self {
            Ok(_) => true,
            Err(OneDriveError::FileNotFound { path }) => {
                debug!(path = %path, "Operation skipped, file not found");
                false
            }
            Err(error) => {
                warn!(error = %error, "Storage operation failed");
                false
            }
        }
    }
}

/// OneDrive storage driver
///
/// # Example
///
/// ```ignore
/// use provider_onedrive::{OneDriveStorage, WriteOptions};
/// use bridge_traits::Visibility;
///
/// let storage = OneDriveStorage::new(config);
/// storage
///     .write("reports/q1.pdf", pdf_bytes, WriteOptions::with_visibility(Visibility::Public))
///     .await?;
/// let link = storage.get_metadata("reports/q1.pdf").await?.share_link;
/// ```
#[derive(Clone)]
pub struct OneDriveStorage {
    client: OneDriveClient,
    path_store: Arc<dyn PathStore>,
}

impl OneDriveStorage {
    pub fn new(config: DriveConfig) -> Self {
        Self {
            client: OneDriveClient::new(config.http_client, &config.settings),
            path_store: config.path_store,
        }
    }

    pub fn from_parts(client: OneDriveClient, path_store: Arc<dyn PathStore>) -> Self {
        Self { client, path_store }
    }

    /// Abort uploads, retry waits and listings once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.client = self.client.with_cancellation(token);
        self
    }

    pub fn client(&self) -> &OneDriveClient {
        &self.client
    }

    fn cache_key(path: &str) -> String {
        endpoint::clean_path(path)
    }

    /// Drop a cached entry; cache failures never fail the operation.
    async fn forget(&self, path: &str) {
        if let Err(error) = self.path_store.forget(&Self::cache_key(path)).await {
            warn!(error = %error, path = %path, "Failed to invalidate path cache entry");
        }
    }

    /// Drop `path` and everything cached below it.
    async fn forget_tree(&self, path: &str) {
        if let Err(error) = self.path_store.forget_prefix(&Self::cache_key(path)).await {
            warn!(error = %error, path = %path, "Failed to invalidate path cache subtree");
        }
    }

    /// Write in-memory contents to `path`.
    pub async fn write(
        &self,
        path: &str,
        contents: impl Into<Bytes>,
        options: WriteOptions,
    ) -> Result<()> {
        let mut source = BytesSource::new(contents);
        self.write_stream(path, &mut source, options).await
    }

    /// Upload `source` to `path`, replacing or conflicting per the configured
    /// conflict behaviour.
    #[instrument(skip(self, source, options))]
    pub async fn write_stream(
        &self,
        path: &str,
        source: &mut dyn ByteSource,
        options: WriteOptions,
    ) -> Result<()> {
        let result = self.client.upload(path, source).await;
        self.forget(path).await;
        result.map_err(|e| e.in_operation("write"))?;

        if let Some(visibility) = options.visibility {
            self.set_visibility(path, visibility).await?;
        }

        info!("Wrote file");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn read(&self, path: &str) -> Result<Bytes> {
        self.read_as(path, None).await
    }

    /// Read contents converted by the drive, e.g. `Some("pdf")`.
    pub async fn read_as(&self, path: &str, format: Option<&str>) -> Result<Bytes> {
        self.client
            .download(path, format)
            .await
            .map_err(|e| not_found_or(e, path, "read"))
    }

    /// Delete the file or folder at `path`. The drive root cannot be deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<()> {
        endpoint::validate_path(path)?;
        if endpoint::is_root(path) {
            return Err(OneDriveError::storage("delete", "refusing to delete the drive root"));
        }

        let result = self.client.delete(path).await;
        self.forget_tree(path).await;
        result.map_err(|e| not_found_or(e, path, "delete"))
    }

    pub async fn delete_directory(&self, path: &str) -> Result<()> {
        self.delete(path).await
    }

    /// Ensure a folder exists at `path`.
    ///
    /// Fails when a file already occupies the path.
    #[instrument(skip(self))]
    pub async fn create_directory(&self, path: &str) -> Result<()> {
        let item = self
            .client
            .create_directory(path)
            .await
            .map_err(|e| e.in_operation("create directory"))?;
        self.forget(path).await;

        let attributes = self
            .client
            .normalizer()
            .normalize(&item, path)
            .map_err(|e| e.in_operation("create directory"))?;

        if !attributes.is_dir() {
            return Err(OneDriveError::storage(
                "create directory",
                format!("File already exists at {}", path),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let result = self.client.visibility().set_visibility(path, visibility).await;
        self.forget(path).await;
        result.map_err(|e| not_found_or(e, path, "set visibility"))
    }

    /// [`set_visibility`](Self::set_visibility) for untyped values.
    pub async fn set_visibility_str(&self, path: &str, visibility: &str) -> Result<()> {
        self.set_visibility(path, parse_visibility(visibility)?).await
    }

    #[instrument(skip(self))]
    pub async fn move_item(&self, source: &str, destination: &str) -> Result<()> {
        let result = self.client.move_item(source, destination).await;
        self.forget_tree(source).await;
        self.forget_tree(destination).await;
        result
            .map(|_| ())
            .map_err(|e| not_found_or(e, source, "move"))
    }

    /// Copy `source` to `destination`, then publish the copy when the
    /// source is public.
    ///
    /// The drive finishes copies asynchronously, and a fresh copy carries no
    /// anonymous link, so a private source needs no follow-up request.
    #[instrument(skip(self))]
    pub async fn copy(&self, source: &str, destination: &str) -> Result<()> {
        let result = self.client.copy(source, destination).await;
        self.forget_tree(destination).await;
        result.map_err(|e| not_found_or(e, source, "copy"))?;

        match self.get_metadata(source).await?.visibility {
            Visibility::Public => self.set_visibility(destination, Visibility::Public).await,
            Visibility::Private => Ok(()),
        }
    }

    /// Fetch attributes, permissions included, and refresh the path cache.
    #[instrument(skip(self))]
    pub async fn get_metadata(&self, path: &str) -> Result<FileAttributes> {
        let item = self
            .client
            .get_item(path, &[("expand", "permissions")])
            .await
            .map_err(|e| not_found_or(e, path, "get metadata"))?;

        let attributes = self
            .client
            .normalizer()
            .normalize(&item, path)
            .map_err(|e| e.in_operation("get metadata"))?;

        if let Err(error) = self
            .path_store
            .put(&Self::cache_key(path), attributes.clone())
            .await
        {
            warn!(error = %error, "Failed to cache metadata");
        }
        Ok(attributes)
    }

    /// Cached attributes when present, otherwise [`get_metadata`](Self::get_metadata).
    pub async fn cached_metadata(&self, path: &str) -> Result<FileAttributes> {
        endpoint::validate_path(path)?;
        match self.path_store.get(&Self::cache_key(path)).await {
            Ok(Some(attributes)) => {
                debug!(path = %path, "Path cache hit");
                return Ok(attributes);
            }
            Ok(None) => {}
            Err(error) => warn!(error = %error, "Path cache lookup failed"),
        }
        self.get_metadata(path).await
    }

    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        self.exists(path, FileAttributes::is_file).await
    }

    pub async fn directory_exists(&self, path: &str) -> Result<bool> {
        self.exists(path, FileAttributes::is_dir).await
    }

    async fn exists(&self, path: &str, matches: fn(&FileAttributes) -> bool) -> Result<bool> {
        match self.get_metadata(path).await {
            Ok(attributes) => Ok(matches(&attributes)),
            Err(OneDriveError::FileNotFound { .. }) => Ok(false),
            Err(error) => Err(error),
        }
    }

    pub async fn visibility(&self, path: &str) -> Result<Visibility> {
        Ok(self.get_metadata(path).await?.visibility)
    }

    pub async fn mime_type(&self, path: &str) -> Result<Option<String>> {
        Ok(self.get_metadata(path).await?.mime_type)
    }

    pub async fn file_size(&self, path: &str) -> Result<u64> {
        Ok(self.get_metadata(path).await?.file_size)
    }

    pub async fn last_modified(&self, path: &str) -> Result<i64> {
        Ok(self.get_metadata(path).await?.last_modified)
    }

    /// Lazily list `directory`; a missing directory lists as empty.
    pub fn list_contents(&self, directory: &str, recursive: bool) -> Result<ContentListing> {
        self.client.list_contents(directory, recursive)
    }

    /// Pre-authenticated download URL, or an empty string when the drive
    /// offers none (folders).
    ///
    /// `expires_at` is not enforced; the drive's signed URL carries its own
    /// short lifetime.
    #[instrument(skip(self))]
    pub async fn temporary_url(&self, path: &str, expires_at: DateTime<Utc>) -> Result<String> {
        debug!(%expires_at, "Requested expiry not enforced");
        Ok(self
            .get_metadata(path)
            .await?
            .download_url
            .unwrap_or_default())
    }
}

fn not_found_or(error: OneDriveError, path: &str, operation: &'static str) -> OneDriveError {
    if error.is_not_found() {
        OneDriveError::FileNotFound {
            path: path.to_string(),
        }
    } else {
        error.in_operation(operation)
    }
}
