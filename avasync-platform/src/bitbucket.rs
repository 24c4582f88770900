//! Bitbucket Server: code-host destination.

use std::sync::Arc;

use avasync_core::error::Result;
use avasync_core::{Avatar, Credentials, PlatformError, PlatformKind, UserId};

use crate::client::{encode_segment, ApiClient, AvatarPlatform};
use crate::http::{HttpMethod, HttpTransport, UreqTransport};
use crate::types::BitbucketUserPage;

/// Multipart field the avatar upload endpoint reads.
pub const AVATAR_FIELD: &str = "avatar";

/// Bitbucket Server REST client.
#[derive(Clone)]
pub struct BitbucketClient {
    api: ApiClient,
    default_md5: Option<String>,
}

impl BitbucketClient {
    /// Create a client for the Bitbucket instance at `base_url`.
    pub fn new(base_url: &str, credentials: Credentials) -> Self {
        Self::new_with_transport(base_url, credentials, Arc::new(UreqTransport::default()))
    }

    pub fn new_with_transport(
        base_url: &str,
        credentials: Credentials,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            api: ApiClient::new(PlatformKind::Bitbucket, base_url, credentials, transport),
            default_md5: None,
        }
    }

    /// Use `digest` instead of the built-in default-avatar MD5 for every
    /// avatar this client fetches.
    pub fn with_default_md5(mut self, digest: impl Into<String>) -> Self {
        self.default_md5 = Some(digest.into());
        self
    }

    fn users_page(&self, start: u64) -> Result<BitbucketUserPage> {
        let operation = format!("list users (start={start})");
        let url = self.api.url(&format!("/rest/api/1.0/users?start={start}"));
        let resp = self.api.get(url, &operation)?;
        self.api.parse_json(&resp, &operation)
    }
}

impl AvatarPlatform for BitbucketClient {
    fn kind(&self) -> PlatformKind {
        self.api.kind()
    }

    /// Walk the paged users endpoint from `start=0` until `isLastPage`.
    fn list_users(&self) -> Result<Vec<UserId>> {
        let mut users = Vec::new();
        let mut start = 0u64;
        loop {
            let page = self.users_page(start)?;
            users.extend(page.values.into_iter().map(|u| UserId::from(u.name)));
            if page.is_last_page {
                break;
            }
            start = page.next_page_start.ok_or_else(|| {
                PlatformError::data(
                    PlatformKind::Bitbucket,
                    format!("list users (start={start})"),
                    "isLastPage is false but nextPageStart is missing",
                )
            })?;
        }
        tracing::debug!("bitbucket: listed {} users", users.len());
        Ok(users)
    }

    fn fetch_avatar(&self, user: &UserId) -> Result<Avatar> {
        let url = self
            .api
            .url(&format!("/users/{}/avatar.png", encode_segment(user.as_str())));
        let resp = self.api.get(url, &format!("get avatar for '{user}'"))?;
        let content_type = resp.content_type().to_string();

        let avatar = Avatar::new(PlatformKind::Bitbucket, user.clone(), content_type, resp.body, None);
        Ok(match &self.default_md5 {
            Some(digest) => avatar.with_default_md5(digest.clone()),
            None => avatar,
        })
    }

    /// Multipart upload guarded by the `X-Atlassian-Token: no-check` header
    /// Bitbucket requires to bypass its XSRF check.
    fn push_avatar(&self, avatar: &Avatar) -> Result<()> {
        let user = avatar.user();
        let url = self.api.url(&format!(
            "/rest/api/1.0/users/{}/avatar.png",
            encode_segment(user.as_str())
        ));
        let form = MultipartForm::single_file(
            AVATAR_FIELD,
            &file_name_for(avatar.content_type()),
            avatar.content_type(),
            avatar.data(),
            &avatar.digest(),
        );
        let headers = vec![
            ("Content-Type".to_string(), form.content_type()),
            ("X-Atlassian-Token".to_string(), "no-check".to_string()),
        ];
        self.api.send(
            HttpMethod::Post,
            url,
            headers,
            form.body,
            &format!("push avatar for '{user}'"),
        )?;
        Ok(())
    }
}

/// Upload file name matching the image type.
fn file_name_for(content_type: &str) -> String {
    let ext = match content_type {
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        _ => "png",
    };
    format!("avatar.{ext}")
}

/// A `multipart/form-data` body carrying one file part.
struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    /// `seed` makes the boundary unique per payload; the image digest works.
    fn single_file(field: &str, file_name: &str, content_type: &str, data: &[u8], seed: &str) -> Self {
        let boundary = format!("----avasync-{seed}");
        let mut body = Vec::with_capacity(data.len() + 256);
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Self { boundary, body }
    }

    fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}
