//! Jira: the source of every avatar.

use std::sync::Arc;

use avasync_core::error::Result;
use avasync_core::{Avatar, Credentials, PlatformError, PlatformKind, UserId};

use crate::client::{encode_query, ApiClient, AvatarPlatform};
use crate::http::{HttpTransport, UreqTransport};
use crate::types::JiraUser;

/// Key of the avatar size avasync copies.
pub const AVATAR_SIZE: &str = "48x48";

/// Jira REST client.
#[derive(Clone)]
pub struct JiraClient {
    api: ApiClient,
}

impl JiraClient {
    /// Create a client for the Jira instance at `base_url`.
    pub fn new(base_url: &str, credentials: Credentials) -> Self {
        Self::new_with_transport(base_url, credentials, Arc::new(UreqTransport::default()))
    }

    pub fn new_with_transport(
        base_url: &str,
        credentials: Credentials,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            api: ApiClient::new(PlatformKind::Jira, base_url, credentials, transport),
        }
    }

    /// Resolve the 48×48 avatar URL of `user`.
    fn avatar_url(&self, user: &UserId) -> Result<String> {
        let operation = format!("get user '{user}'");
        let url = self.api.url(&format!(
            "/rest/api/2/user?username={}",
            encode_query(user.as_str())
        ));
        let resp = self.api.get(url, &operation)?;
        let mut body: JiraUser = self.api.parse_json(&resp, &operation)?;
        body.avatar_urls.remove(AVATAR_SIZE).ok_or_else(|| {
            PlatformError::data(
                PlatformKind::Jira,
                operation,
                format!("missing avatarUrls.{AVATAR_SIZE}"),
            )
        })
    }
}

impl AvatarPlatform for JiraClient {
    fn kind(&self) -> PlatformKind {
        self.api.kind()
    }

    /// Two requests: the user record for the avatar URL, then the image.
    fn fetch_avatar(&self, user: &UserId) -> Result<Avatar> {
        let origin = self.avatar_url(user)?;
        let resp = self
            .api
            .get(origin.clone(), &format!("get avatar image for '{user}'"))?;
        let content_type = resp.content_type().to_string();

        Ok(Avatar::new(
            PlatformKind::Jira,
            user.clone(),
            content_type,
            resp.body,
            Some(origin),
        ))
    }
}
