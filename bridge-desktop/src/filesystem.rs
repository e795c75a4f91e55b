//! Byte Source Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::ByteSource,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// File-backed [`ByteSource`]
///
/// The size is captured when the file is opened; reads are sequential and
/// fill each chunk completely unless the file ends first.
pub struct FileByteSource {
    file: File,
    path: PathBuf,
    size: u64,
}

impl FileByteSource {
    /// Open a local file for uploading
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await.map_err(BridgeError::Io)?;
        let metadata = file.metadata().await.map_err(BridgeError::Io)?;

        if metadata.is_dir() {
            return Err(BridgeError::OperationFailed(format!(
                "{} is a directory",
                path.display()
            )));
        }

        debug!(path = ?path, size = metadata.len(), "Opened file for upload");
        Ok(Self {
            file,
            path,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileByteSource {
    fn size(&self) -> u64 {
        self.size
    }

    async fn read_chunk(&mut self, max: usize) -> Result<Bytes> {
        let mut buffer = Vec::with_capacity(max);
        (&mut self.file)
            .take(max as u64)
            .read_to_end(&mut buffer)
            .await
            .map_err(BridgeError::Io)?;
        Ok(Bytes::from(buffer))
    }
}
