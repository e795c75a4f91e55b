//! Drive API client
//!
//! Composes locators, paging, chunked uploads and sharing links into the
//! drive operations. Errors come back as raised by the backend; mapping them
//! onto the storage contract is [`OneDriveStorage`](crate::OneDriveStorage)'s
//! job.

use std::sync::Arc;

use bridge_traits::http::{HttpClient, HttpMethod};
use bridge_traits::storage::ByteSource;
use bytes::Bytes;
use core_runtime::config::DriveSettings;
use core_runtime::logging::redact_url;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::endpoint::{self, Action};
use crate::error::Result;
use crate::metadata::MetadataNormalizer;
use crate::pagination::{ChildPager, ContentListing};
use crate::transport::Transport;
use crate::types::{
    CreateFolderRequest, DriveItem, EmptyFacet, ItemPlacement, ParentPath, Permission,
    UploadItemProperties, UploadSessionRequest, UploadSessionResponse,
};
use crate::upload::{ChunkedUploader, RetryPolicy, UploadSession};
use crate::visibility::VisibilityManager;

/// OneDrive API client
///
/// Every operation is a sequential chain of requests through the injected
/// [`HttpClient`]; nothing is spawned.
///
/// # Example
///
/// ```ignore
/// use provider_onedrive::OneDriveClient;
///
/// let client = OneDriveClient::new(http_client, &DriveSettings::default());
/// let item = client.get_item("docs/report.pdf", &[]).await?;
/// ```
#[derive(Clone)]
pub struct OneDriveClient {
    transport: Transport,
    settings: DriveSettings,
    normalizer: MetadataNormalizer,
    visibility: VisibilityManager,
}

impl OneDriveClient {
    pub fn new(http: Arc<dyn HttpClient>, settings: &DriveSettings) -> Self {
        let transport = Transport::new(http, settings.request_timeout);
        Self {
            visibility: VisibilityManager::new(transport.clone()),
            normalizer: MetadataNormalizer::new(settings.root_prefix()),
            settings: settings.clone(),
            transport,
        }
    }

    /// Check `token` between chunks, retry waits and pages.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.transport = self.transport.with_cancellation(token);
        self.visibility = VisibilityManager::new(self.transport.clone());
        self
    }

    pub fn settings(&self) -> &DriveSettings {
        &self.settings
    }

    pub fn normalizer(&self) -> &MetadataNormalizer {
        &self.normalizer
    }

    pub fn visibility(&self) -> &VisibilityManager {
        &self.visibility
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, path: &str, params: &[(&str, &str)]) -> Result<DriveItem> {
        let locator = endpoint::build(path, Action::Item, params)?;
        self.transport
            .send_json(self.transport.request(HttpMethod::Get, locator))
            .await
    }

    /// Ensure a folder exists at `path` and return whatever item is there.
    ///
    /// The root is never patched; its item is fetched instead.
    #[instrument(skip(self))]
    pub async fn create_directory(&self, path: &str) -> Result<DriveItem> {
        if endpoint::is_root(path) {
            return self.get_item("/", &[]).await;
        }

        let locator = endpoint::build(path, Action::Item, &[])?;
        let body = CreateFolderRequest {
            folder: EmptyFacet::default(),
        };
        let request = self
            .transport
            .json_request(HttpMethod::Patch, locator, &body)?;
        self.transport.send_json(request).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<()> {
        let locator = endpoint::build(path, Action::Item, &[])?;
        self.transport
            .send_checked(self.transport.request(HttpMethod::Delete, locator))
            .await?;
        info!("Deleted item");
        Ok(())
    }

    /// Move (and possibly rename) `source` to `destination`.
    #[instrument(skip(self))]
    pub async fn move_item(&self, source: &str, destination: &str) -> Result<DriveItem> {
        let locator = endpoint::build(source, Action::Item, &[])?;
        let body = self.placement(destination).await?;

        let request = self
            .transport
            .json_request(HttpMethod::Patch, locator, &body)?;
        self.transport.send_json(request).await
    }

    /// Start a server-side copy of `source` to `destination`.
    ///
    /// The drive answers 202 and completes the copy asynchronously.
    #[instrument(skip(self))]
    pub async fn copy(&self, source: &str, destination: &str) -> Result<()> {
        let locator = endpoint::build(source, Action::Named("copy"), &[])?;
        let body = self.placement(destination).await?;

        let request = self
            .transport
            .json_request(HttpMethod::Post, locator, &body)?;
        let response = self.transport.send_checked(request).await?;
        if let Some(monitor) = response.header("Location") {
            debug!(monitor = %redact_url(monitor), "Copy accepted");
        }
        Ok(())
    }

    /// Create the destination's parent folder and describe the new placement.
    async fn placement(&self, destination: &str) -> Result<ItemPlacement> {
        endpoint::validate_path(destination)?;
        let parent = endpoint::parent_path(destination);
        self.create_directory(&parent).await?;

        Ok(ItemPlacement {
            name: endpoint::file_name(destination),
            parent_reference: ParentPath {
                path: endpoint::build(&parent, Action::Reference, &[])?,
            },
        })
    }

    /// Fetch file contents, optionally converted (`format=pdf`, ...).
    #[instrument(skip(self))]
    pub async fn download(&self, path: &str, format: Option<&str>) -> Result<Bytes> {
        let params: Vec<(&str, &str)> = format.map(|f| ("format", f)).into_iter().collect();
        let locator = endpoint::build(path, Action::Named("content"), &params)?;
        let response = self
            .transport
            .send_checked(self.transport.request(HttpMethod::Get, locator))
            .await?;
        Ok(response.body)
    }

    /// Request an upload session for `path`, sized for `total_size` bytes.
    #[instrument(skip(self))]
    pub async fn create_upload_session(&self, path: &str, total_size: u64) -> Result<UploadSession> {
        let locator = endpoint::build(path, Action::Named("createUploadSession"), &[])?;
        let request = match self.settings.conflict_behavior {
            Some(behavior) => self.transport.json_request(
                HttpMethod::Post,
                locator,
                &UploadSessionRequest {
                    item: UploadItemProperties {
                        conflict_behavior: behavior.as_str(),
                    },
                },
            )?,
            None => self.transport.request(HttpMethod::Post, locator),
        };

        let session: UploadSessionResponse = self.transport.send_json(request).await?;
        Ok(
            UploadSession::new(path, session.upload_url, total_size, self.settings.chunk_size)
                .with_expiry(session.expiration_date_time),
        )
    }

    /// Upload `source` to `path`, creating the parent folder first.
    ///
    /// Empty sources are written with a single simple `PUT`; anything else
    /// goes through an upload session.
    #[instrument(skip(self, source), fields(size = source.size()))]
    pub async fn upload(&self, path: &str, source: &mut dyn ByteSource) -> Result<DriveItem> {
        endpoint::validate_path(path)?;
        self.create_directory(&endpoint::parent_path(path)).await?;

        let size = source.size();
        if size == 0 {
            let locator = endpoint::build(path, Action::Named("content"), &[])?;
            let request = self
                .transport
                .request(HttpMethod::Put, locator)
                .header("Content-Type", "application/octet-stream")
                .body(Bytes::new());
            return self.transport.send_json(request).await;
        }

        let session = self.create_upload_session(path, size).await?;
        self.uploader().upload(session, source).await
    }

    pub fn uploader(&self) -> ChunkedUploader {
        ChunkedUploader::from_transport(self.transport.clone(), RetryPolicy::from(&self.settings))
    }

    /// Raw children of `path`, fetched page by page.
    pub fn list_children(&self, path: &str) -> Result<ChildPager> {
        let locator = endpoint::build(path, Action::Named("children"), &[])?;
        Ok(ChildPager::new(self.transport.clone(), locator))
    }

    /// Normalised listing of `path`, depth-first when `recursive`.
    pub fn list_contents(&self, path: &str, recursive: bool) -> Result<ContentListing> {
        ContentListing::new(self.transport.clone(), self.normalizer, path, recursive)
    }

    pub async fn publish(&self, path: &str) -> Result<Permission> {
        self.visibility.publish(path).await
    }

    pub async fn unpublish(&self, path: &str) -> Result<()> {
        self.visibility.unpublish(path).await
    }

    pub async fn permissions(&self, path: &str) -> Result<Vec<Permission>> {
        self.visibility.permissions(path).await
    }
}
