//! Confluence: wiki destination reached through REST for reads and the
//! `confluenceservice-v2` JSON-RPC endpoint for listing and uploads.

use std::sync::Arc;

use serde_json::{json, Value};

use avasync_core::error::Result;
use avasync_core::{Avatar, Credentials, PlatformError, PlatformKind, UserId};

use crate::client::{encode_query, ApiClient, AvatarPlatform};
use crate::http::{HttpTransport, UreqTransport};
use crate::types::{ConfluenceUser, RpcFailure};

const RPC_PATH: &str = "/rpc/json-rpc/confluenceservice-v2";

/// Confluence client.
#[derive(Clone)]
pub struct ConfluenceClient {
    api: ApiClient,
}

impl ConfluenceClient {
    /// Create a client for the Confluence instance at `base_url`.
    pub fn new(base_url: &str, credentials: Credentials) -> Self {
        Self::new_with_transport(base_url, credentials, Arc::new(UreqTransport::default()))
    }

    pub fn new_with_transport(
        base_url: &str,
        credentials: Credentials,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            api: ApiClient::new(PlatformKind::Confluence, base_url, credentials, transport),
        }
    }

    fn rpc_url(&self, method: &str) -> String {
        self.api.url(&format!("{RPC_PATH}/{method}"))
    }

    /// Turn a JSON-RPC error envelope into [`PlatformError::Rpc`].
    fn rpc_error(&self, body: &Value, operation: &str) -> PlatformError {
        let message = serde_json::from_value::<RpcFailure>(body.clone())
            .ok()
            .and_then(|f| f.error.message)
            .unwrap_or_else(|| format!("unexpected response: {body}"));
        PlatformError::Rpc {
            platform: PlatformKind::Confluence,
            operation: operation.to_string(),
            message,
        }
    }
}

impl AvatarPlatform for ConfluenceClient {
    fn kind(&self) -> PlatformKind {
        self.api.kind()
    }

    /// `getActiveUsers(true)`: a flat array of user names.
    fn list_users(&self) -> Result<Vec<UserId>> {
        let operation = "list users";
        let resp = self
            .api
            .post_json(self.rpc_url("getActiveUsers"), &json!([true]), operation)?;
        let body: Value = self.api.parse_json(&resp, operation)?;

        let items = match body {
            Value::Array(items) => items,
            other => return Err(self.rpc_error(&other, operation)),
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(UserId::from(name)),
                other => Err(PlatformError::data(
                    PlatformKind::Confluence,
                    operation,
                    format!("expected user name string, got {other}"),
                )),
            })
            .collect()
    }

    /// The user record itself is the pulled payload; `profilePicture.path`
    /// becomes the origin.
    fn fetch_avatar(&self, user: &UserId) -> Result<Avatar> {
        let operation = format!("get user '{user}'");
        let url = self.api.url(&format!(
            "/rest/api/user?username={}",
            encode_query(user.as_str())
        ));
        let resp = self.api.get(url, &operation)?;
        let record: ConfluenceUser = self.api.parse_json(&resp, &operation)?;
        let origin = record.profile_picture.and_then(|p| p.path);
        let content_type = resp.content_type().to_string();

        Ok(Avatar::new(
            PlatformKind::Confluence,
            user.clone(),
            content_type,
            resp.body,
            origin,
        ))
    }

    /// `addProfilePicture(user, fileName, contentType, bytes)`.
    ///
    /// Bytes travel as a JSON array of unsigned 8-bit integers.
    fn push_avatar(&self, avatar: &Avatar) -> Result<()> {
        let user = avatar.user();
        let operation = format!("push avatar for '{user}'");
        let file_name = avatar.upload_file_name().ok_or_else(|| {
            PlatformError::data(
                PlatformKind::Confluence,
                operation.clone(),
                "no origin or source origin to name the picture after",
            )
        })?;

        let payload = json!([
            user.as_str(),
            file_name,
            avatar.content_type(),
            avatar.data(),
        ]);
        let resp = self
            .api
            .post_json(self.rpc_url("addProfilePicture"), &payload, &operation)?;

        // Success statuses can still carry an RPC error envelope.
        if let Ok(body) = serde_json::from_slice::<Value>(&resp.body) {
            if body.get("error").is_some() {
                return Err(self.rpc_error(&body, &operation));
            }
        }
        tracing::debug!("confluence: stored {file_name} for {user}");
        Ok(())
    }
}
