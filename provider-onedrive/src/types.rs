//! Microsoft Graph drive resources
//!
//! Wire structures for the drive item API: responses are deserialised into
//! these, request bodies are serialised from them.

use serde::{Deserialize, Serialize};

/// Drive item resource (file or folder)
///
/// See: https://learn.microsoft.com/graph/api/resources/driveitem
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    /// Size in bytes; folders report the recursive size of their contents
    #[serde(default)]
    pub size: u64,

    /// Modification time (ISO 8601)
    pub last_modified_date_time: Option<String>,

    /// Present only on files
    pub file: Option<FileFacet>,

    /// Present only on folders
    pub folder: Option<FolderFacet>,

    pub web_url: Option<String>,

    /// Short-lived pre-authenticated download URL
    #[serde(rename = "@microsoft.graph.downloadUrl")]
    pub download_url: Option<String>,

    pub parent_reference: Option<ItemReference>,

    /// Only populated when requested with `expand=permissions`
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default)]
    pub child_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReference {
    pub id: Option<String>,
    pub drive_id: Option<String>,
    pub path: Option<String>,
}

/// Sharing permission on an item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub roles: Vec<String>,

    pub link: Option<SharingLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingLink {
    /// `view`, `edit` or `embed`
    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// `anonymous` or `organization`
    pub scope: Option<String>,

    pub web_url: Option<String>,
}

/// One page of a children listing
#[derive(Debug, Deserialize)]
pub struct ChildrenPage {
    #[serde(default)]
    pub value: Vec<DriveItem>,

    /// Absolute URL of the next page
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Permissions collection
#[derive(Debug, Deserialize)]
pub struct PermissionList {
    #[serde(default)]
    pub value: Vec<Permission>,
}

/// createUploadSession response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionResponse {
    pub upload_url: String,

    pub expiration_date_time: Option<String>,

    #[serde(default)]
    pub next_expected_ranges: Vec<String>,
}

/// Graph error envelope: `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// PATCH body turning a path into a folder
#[derive(Debug, Serialize)]
pub struct CreateFolderRequest {
    pub folder: EmptyFacet,
}

/// Serialises as `{}`
#[derive(Debug, Default, Serialize)]
pub struct EmptyFacet {}

/// Body of move (PATCH) and copy (POST) requests
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPlacement {
    pub name: String,
    pub parent_reference: ParentPath,
}

#[derive(Debug, Serialize)]
pub struct ParentPath {
    pub path: String,
}

/// createLink body
#[derive(Debug, Serialize)]
pub struct CreateLinkRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub scope: &'static str,
}

/// createUploadSession body
#[derive(Debug, Serialize)]
pub struct UploadSessionRequest {
    pub item: UploadItemProperties,
}

#[derive(Debug, Serialize)]
pub struct UploadItemProperties {
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    pub conflict_behavior: &'static str,
}
