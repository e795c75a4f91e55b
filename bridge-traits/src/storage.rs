//! Storage Abstractions
//!
//! Canonical file records shared by storage providers, plus the two
//! collaborators a provider consumes from its host: a sequential byte source
//! for uploads and a path cache.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use crate::error::{BridgeError, Result};

/// Whether an entry is a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// Public (anonymously readable through a share link) or private
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised visibility value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVisibilityError(pub String);

impl fmt::Display for ParseVisibilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown visibility: {}", self.0)
    }
}

impl std::error::Error for ParseVisibilityError {}

impl FromStr for Visibility {
    type Err = ParseVisibilityError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(ParseVisibilityError(other.to_string())),
        }
    }
}

/// Canonical metadata record for a file or directory
///
/// `share_link` is populated only when `visibility` is [`Visibility::Public`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    /// Caller-namespace path
    pub path: String,
    /// Last modification as Unix seconds
    pub last_modified: i64,
    pub file_size: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub mime_type: Option<String>,
    pub visibility: Visibility,
    /// Remote item identifier
    pub id: Option<String>,
    pub web_url: Option<String>,
    pub share_link: Option<String>,
    pub download_url: Option<String>,
}

impl FileAttributes {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Sequential byte source backing an upload
///
/// The source is owned by the caller; providers only read from it, front to
/// back, one chunk at a time.
#[async_trait]
pub trait ByteSource: Send {
    /// Total number of bytes the source will yield
    fn size(&self) -> u64;

    /// Read the next chunk of at most `max` bytes
    ///
    /// Implementations return fewer than `max` bytes only when the source is
    /// exhausted; an empty chunk signals end of stream.
    async fn read_chunk(&mut self, max: usize) -> Result<Bytes>;
}

/// In-memory byte source
#[derive(Debug, Clone)]
pub struct BytesSource {
    data: Bytes,
    position: usize,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }
}

#[async_trait]
impl ByteSource for BytesSource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_chunk(&mut self, max: usize) -> Result<Bytes> {
        let end = (self.position + max).min(self.data.len());
        let chunk = self.data.slice(self.position..end);
        self.position = end;
        Ok(chunk)
    }
}

/// Path cache seam
///
/// Maps caller paths to the metadata last seen for them. Lifecycle and
/// eviction belong entirely to the implementation; providers only read,
/// write through and invalidate.
#[async_trait]
pub trait PathStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<FileAttributes>>;

    async fn put(&self, path: &str, attributes: FileAttributes) -> Result<()>;

    async fn forget(&self, path: &str) -> Result<()>;

    /// Drop `path` and every entry below it (`path/...`).
    async fn forget_prefix(&self, path: &str) -> Result<()>;
}

/// Default in-memory [`PathStore`]
#[derive(Debug, Default)]
pub struct MemoryPathStore {
    entries: RwLock<HashMap<String, FileAttributes>>,
}

impl MemoryPathStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> BridgeError {
    BridgeError::CacheError("path cache lock poisoned".to_string())
}

#[async_trait]
impl PathStore for MemoryPathStore {
    async fn get(&self, path: &str) -> Result<Option<FileAttributes>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(path).cloned())
    }

    async fn put(&self, path: &str, attributes: FileAttributes) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(path.to_string(), attributes);
        Ok(())
    }

    async fn forget(&self, path: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(path);
        Ok(())
    }

    async fn forget_prefix(&self, path: &str) -> Result<()> {
        let directory = format!("{}/", path.trim_end_matches('/'));
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.retain(|key, _| key != path && !key.starts_with(&directory));
        Ok(())
    }
}
