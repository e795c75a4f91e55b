//! Public/private visibility through anonymous sharing links

use bridge_traits::http::HttpMethod;
use bridge_traits::storage::Visibility;
use tracing::{debug, info, instrument};

use crate::endpoint::{self, Action};
use crate::error::{OneDriveError, Result};
use crate::metadata::find_public_link;
use crate::transport::Transport;
use crate::types::{CreateLinkRequest, Permission, PermissionList};

/// Parse a caller-supplied visibility value.
pub fn parse_visibility(value: &str) -> Result<Visibility> {
    value.parse::<Visibility>().map_err(OneDriveError::from)
}

/// Creates and removes anonymous view links
#[derive(Clone)]
pub struct VisibilityManager {
    transport: Transport,
}

impl VisibilityManager {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Create an anonymous view link. Repeating it on a public item is harmless.
    #[instrument(skip(self))]
    pub async fn publish(&self, path: &str) -> Result<Permission> {
        let locator = endpoint::build(path, Action::Named("createLink"), &[])?;
        let body = CreateLinkRequest {
            kind: "view",
            scope: "anonymous",
        };

        let request = self
            .transport
            .json_request(HttpMethod::Post, locator, &body)?;
        let permission: Permission = self.transport.send_json(request).await?;

        info!(permission_id = %permission.id, "Published item");
        Ok(permission)
    }

    /// Remove the first anonymous read link; no-op when there is none.
    #[instrument(skip(self))]
    pub async fn unpublish(&self, path: &str) -> Result<()> {
        let permissions = self.permissions(path).await?;

        let Some(permission) = find_public_link(&permissions) else {
            debug!("No anonymous link to remove");
            return Ok(());
        };

        let action = format!("permissions/{}", permission.id);
        let locator = endpoint::build(path, Action::Named(&action), &[])?;
        self.transport
            .send_checked(self.transport.request(HttpMethod::Delete, locator))
            .await?;

        info!(permission_id = %permission.id, "Unpublished item");
        Ok(())
    }

    pub async fn permissions(&self, path: &str) -> Result<Vec<Permission>> {
        let locator = endpoint::build(path, Action::Named("permissions"), &[])?;
        let list: PermissionList = self
            .transport
            .send_json(self.transport.request(HttpMethod::Get, locator))
            .await?;
        Ok(list.value)
    }

    pub async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        match visibility {
            Visibility::Public => self.publish(path).await.map(|_| ()),
            Visibility::Private => self.unpublish(path).await,
        }
    }
}
