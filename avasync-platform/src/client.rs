//! The `AvatarPlatform` trait and the authenticated request plumbing the
//! three platform clients share.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use avasync_core::error::Result;
use avasync_core::{Avatar, Credentials, PlatformError, PlatformKind, UserId};

use crate::http::{basic_auth, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpTransport};

/// A platform that holds user avatars.
///
/// Listing and pushing default to [`PlatformError::Unsupported`]; a platform
/// that only ever acts as a source implements [`fetch_avatar`] alone.
///
/// [`fetch_avatar`]: AvatarPlatform::fetch_avatar
pub trait AvatarPlatform {
    fn kind(&self) -> PlatformKind;

    /// Every user identifier known to the platform.
    fn list_users(&self) -> Result<Vec<UserId>> {
        Err(PlatformError::Unsupported {
            platform: self.kind(),
            operation: "list users",
        })
    }

    /// Pull the avatar of `user`.
    fn fetch_avatar(&self, user: &UserId) -> Result<Avatar>;

    /// Upload the content staged on `avatar` via [`Avatar::set_data`].
    fn push_avatar(&self, _avatar: &Avatar) -> Result<()> {
        Err(PlatformError::Unsupported {
            platform: self.kind(),
            operation: "push avatar",
        })
    }
}

/// Base URL, credentials and transport for one platform.
#[derive(Clone)]
pub(crate) struct ApiClient {
    kind: PlatformKind,
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    credentials: Credentials,
}

impl ApiClient {
    pub(crate) fn new(
        kind: PlatformKind,
        base_url: &str,
        credentials: Credentials,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            kind,
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub(crate) fn kind(&self) -> PlatformKind {
        self.kind
    }

    /// `<base><path>`; `path` must start with `/`.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send an authenticated request and reject non-2xx responses.
    pub(crate) fn send(
        &self,
        method: HttpMethod,
        url: String,
        mut headers: HttpHeaders,
        body: Vec<u8>,
        operation: &str,
    ) -> Result<HttpResponse> {
        headers.push(("Authorization".to_string(), basic_auth(&self.credentials)));
        tracing::debug!("{}: {} {}", self.kind, method.as_str(), url);

        let resp = self
            .transport
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .map_err(|e| PlatformError::Transport {
                platform: self.kind,
                operation: operation.to_string(),
                message: e.to_string(),
            })?;

        if !resp.is_success() {
            return Err(PlatformError::Status {
                platform: self.kind,
                operation: operation.to_string(),
                status: resp.status,
                status_text: resp.status_text.clone(),
            });
        }
        Ok(resp)
    }

    pub(crate) fn get(&self, url: String, operation: &str) -> Result<HttpResponse> {
        self.send(HttpMethod::Get, url, Vec::new(), Vec::new(), operation)
    }

    pub(crate) fn post_json(
        &self,
        url: String,
        body: &serde_json::Value,
        operation: &str,
    ) -> Result<HttpResponse> {
        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        self.send(
            HttpMethod::Post,
            url,
            headers,
            body.to_string().into_bytes(),
            operation,
        )
    }

    /// Decode a JSON body, mapping failures to [`PlatformError::Data`].
    pub(crate) fn parse_json<T: DeserializeOwned>(
        &self,
        resp: &HttpResponse,
        operation: &str,
    ) -> Result<T> {
        serde_json::from_slice(&resp.body)
            .map_err(|e| PlatformError::data(self.kind, operation, e.to_string()))
    }
}

/// Percent-encode a value for use in a query string.
pub(crate) fn encode_query(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Percent-encode a value for use as a single path segment.
pub(crate) fn encode_segment(value: &str) -> String {
    encode_query(value).replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockTransport;

    struct SourceOnly;

    impl AvatarPlatform for SourceOnly {
        fn kind(&self) -> PlatformKind {
            PlatformKind::Jira
        }

        fn fetch_avatar(&self, user: &UserId) -> Result<Avatar> {
            Ok(Avatar::new(self.kind(), user.clone(), "image/png", Vec::new(), None))
        }
    }

    fn api(transport: &MockTransport) -> ApiClient {
        ApiClient::new(
            PlatformKind::Confluence,
            "https://wiki.example.com/",
            Credentials::new("admin", "secret"),
            Arc::new(transport.clone()),
        )
    }

    #[test]
    fn default_trait_methods_are_unsupported() {
        let err = SourceOnly.list_users().expect_err("unsupported");
        assert!(matches!(err, PlatformError::Unsupported { operation: "list users", .. }));

        let avatar = SourceOnly.fetch_avatar(&UserId::from("a")).expect("fetch");
        let err = SourceOnly.push_avatar(&avatar).expect_err("unsupported");
        assert!(matches!(err, PlatformError::Unsupported { operation: "push avatar", .. }));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let transport = MockTransport::new();
        let client = api(&transport);
        assert_eq!(client.url("/rest/api/user"), "https://wiki.example.com/rest/api/user");
    }

    #[test]
    fn send_adds_basic_auth_header() {
        let transport = MockTransport::new();
        transport.respond(HttpMethod::Get, "https://wiki.example.com/x", 200, "text/plain", "ok");
        api(&transport)
            .get("https://wiki.example.com/x".to_string(), "probe")
            .expect("ok");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].header("authorization"),
            Some("Basic YWRtaW46c2VjcmV0")
        );
    }

    #[test]
    fn non_success_status_becomes_status_error() {
        let transport = MockTransport::new();
        transport.respond(HttpMethod::Get, "https://wiki.example.com/x", 401, "text/plain", "");
        let err = api(&transport)
            .get("https://wiki.example.com/x".to_string(), "get user 'jdoe'")
            .expect_err("401");
        assert_eq!(
            err.to_string(),
            "confluence: get user 'jdoe' failed: HTTP 401 Unauthorized"
        );
    }

    #[test]
    fn transport_failure_becomes_transport_error() {
        let transport = MockTransport::new();
        let err = api(&transport)
            .get("https://wiki.example.com/nothing".to_string(), "probe")
            .expect_err("no route");
        assert!(matches!(err, PlatformError::Transport { .. }));
    }

    #[test]
    fn segment_and_query_encoding() {
        assert_eq!(encode_query("j doe@corp"), "j+doe%40corp");
        assert_eq!(encode_segment("j doe/x"), "j%20doe%2Fx");
        assert_eq!(encode_segment("plain"), "plain");
    }
}
