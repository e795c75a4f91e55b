//! # OneDrive Provider
//!
//! File-storage driver for the Microsoft Graph drive API (OneDrive).
//!
//! ## Overview
//!
//! This module provides:
//! - Path-addressed locators with pre-flight path validation
//! - Metadata normalisation, visibility derived from sharing permissions
//! - Lazy paginated listings, optionally recursive (depth-first)
//! - Resumable chunked uploads with bounded 429/5xx retry
//! - Public/private visibility via anonymous view links
//!
//! Requests go through an injected [`HttpClient`](bridge_traits::HttpClient);
//! authentication is the executor's concern.
//!
//! ## Layers
//!
//! - [`OneDriveStorage`] - storage contract: typed errors, path cache upkeep
//! - [`OneDriveClient`] - drive operations as the API exposes them
//! - [`endpoint`], [`metadata`], [`pagination`], [`upload`], [`visibility`] -
//!   the pieces the client composes

pub mod client;
pub mod endpoint;
pub mod error;
pub mod metadata;
pub mod pagination;
pub mod storage;
mod transport;
pub mod types;
pub mod upload;
pub mod visibility;

pub use client::OneDriveClient;
pub use error::{OneDriveError, Result};
pub use metadata::MetadataNormalizer;
pub use pagination::{ChildPager, ContentListing};
pub use storage::{OneDriveStorage, StorageResultExt, WriteOptions};
pub use upload::{ChunkedUploader, RetryPolicy, UploadSession};
pub use visibility::VisibilityManager;
