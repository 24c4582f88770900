//! Response payloads of the platform REST and JSON-RPC endpoints.
//!
//! Only the fields avasync reads are modelled; everything else is ignored.

use std::collections::HashMap;

use serde::Deserialize;

/// `GET /rest/api/2/user` on Jira.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraUser {
    #[serde(rename = "avatarUrls", default)]
    pub avatar_urls: HashMap<String, String>,
}

/// `GET /rest/api/user` on Confluence.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfluenceUser {
    #[serde(rename = "profilePicture", default)]
    pub profile_picture: Option<ProfilePicture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfilePicture {
    #[serde(default)]
    pub path: Option<String>,
}

/// Error envelope of the Confluence JSON-RPC endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcFailure {
    pub error: RpcErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// One page of `GET /rest/api/1.0/users` on Bitbucket.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketUserPage {
    #[serde(default)]
    pub values: Vec<BitbucketUser>,
    pub is_last_page: bool,
    #[serde(default)]
    pub next_page_start: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketUser {
    pub name: String,
}
