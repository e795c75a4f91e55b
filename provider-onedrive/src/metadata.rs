//! Metadata normalisation
//!
//! Maps drive items onto [`FileAttributes`]. Pure and deterministic; the only
//! failure is an unusable modification timestamp.

use bridge_traits::storage::{EntryKind, FileAttributes, Visibility};
use chrono::{DateTime, NaiveDateTime};

use crate::error::{OneDriveError, Result};
use crate::types::{DriveItem, Permission};

const PUBLIC_ROLE: &str = "read";
const PUBLIC_SCOPE: &str = "anonymous";

/// Whether `permission` is an anonymous read link.
pub fn is_public_link(permission: &Permission) -> bool {
    let anonymous = permission
        .link
        .as_ref()
        .and_then(|link| link.scope.as_deref())
        == Some(PUBLIC_SCOPE);

    anonymous && permission.roles.iter().any(|role| role == PUBLIC_ROLE)
}

/// First anonymous read link among `permissions`.
pub fn find_public_link(permissions: &[Permission]) -> Option<&Permission> {
    permissions.iter().find(|permission| is_public_link(permission))
}

/// Parse an ISO 8601 timestamp into Unix seconds.
///
/// Offset-less timestamps are read as UTC.
pub fn parse_timestamp(value: &str) -> Result<i64> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.timestamp());
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().timestamp())
        .map_err(|e| OneDriveError::Normalization(format!("invalid timestamp {:?}: {}", value, e)))
}

/// Item-to-attributes mapper bound to the configured root prefix
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataNormalizer {
    root_prefix: &'static str,
}

impl MetadataNormalizer {
    /// `root_prefix` is `/`, `\` or empty; see `DriveSettings::root_prefix`.
    pub fn new(root_prefix: &'static str) -> Self {
        Self { root_prefix }
    }

    /// Path as reported to callers: leading separators replaced by the prefix.
    pub fn display_path(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.root_prefix,
            path.trim_start_matches(['/', '\\'])
        )
    }

    pub fn normalize(&self, item: &DriveItem, path: &str) -> Result<FileAttributes> {
        let share = find_public_link(&item.permissions);
        let visibility = if share.is_some() {
            Visibility::Public
        } else {
            Visibility::Private
        };
        let share_link = share
            .and_then(|permission| permission.link.as_ref())
            .and_then(|link| link.web_url.clone());

        let last_modified = match item.last_modified_date_time.as_deref() {
            Some(value) => parse_timestamp(value)?,
            None => {
                return Err(OneDriveError::Normalization(format!(
                    "item at {} has no lastModifiedDateTime",
                    path
                )))
            }
        };

        let (kind, mime_type) = match &item.file {
            Some(file) => (EntryKind::File, file.mime_type.clone()),
            None => (EntryKind::Dir, None),
        };

        Ok(FileAttributes {
            path: self.display_path(path),
            last_modified,
            file_size: item.size,
            kind,
            mime_type,
            visibility,
            id: item.id.clone(),
            web_url: item.web_url.clone(),
            share_link,
            download_url: item.download_url.clone(),
        })
    }
}
