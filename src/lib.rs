//! # Drive Storage
//!
//! Entry point for hosts that want a OneDrive-backed file store without
//! wiring the workspace crates one by one.
//!
//! ```ignore
//! use drive_storage::{connect, DriveConfig, WriteOptions};
//!
//! let storage = connect(DriveConfig::builder().access_token(token).build()?);
//! storage.write("notes/today.md", "hello", WriteOptions::default()).await?;
//! ```
//!
//! The `desktop-shims` feature (on by default) supplies the `reqwest`
//! executor and file-backed upload sources.

pub use bridge_traits::{
    ByteSource, BytesSource, EntryKind, FileAttributes, HttpClient, MemoryPathStore, PathStore,
    Visibility,
};
pub use core_runtime::logging::{init_logging, LoggingConfig};
pub use core_runtime::{ConflictBehavior, DriveConfig, DriveConfigBuilder, DriveSettings};
pub use provider_onedrive::{
    ContentListing, OneDriveClient, OneDriveError, OneDriveStorage, Result, StorageResultExt,
    WriteOptions,
};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{FileByteSource, ReqwestHttpClient};

/// Build a storage driver from a validated configuration.
pub fn connect(config: DriveConfig) -> OneDriveStorage {
    tracing::debug!(root = %config.settings.root, "Connecting drive storage");
    OneDriveStorage::new(config)
}
