//! Blocking HTTP transport boundary.
//!
//! Platform clients build [`HttpRequest`]s and hand them to an
//! [`HttpTransport`]. Production code uses [`UreqTransport`]; tests use the
//! in-memory [`MockTransport`] so no sockets are involved.

use std::io::Read;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

use avasync_core::Credentials;

/// Per-request timeout for the default transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The two methods the platform APIs need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// HTTP headers as key/value pairs. Lookups are case-insensitive.
pub type HttpHeaders = Vec<(String, String)>;

/// A minimal HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }
}

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `Content-Type` header, or empty when the server sent none.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },
}

/// Transport boundary for all HTTP I/O.
pub trait HttpTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Get the first header value matching `name` (case-insensitive).
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// `Authorization` header value for HTTP Basic authentication.
#[must_use]
pub fn basic_auth(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.username, credentials.password());
    format!("Basic {}", STANDARD.encode(raw))
}

/// A real HTTP transport backed by a `ureq` agent.
///
/// Non-2xx statuses are returned as ordinary responses; only failures that
/// never produced a status line become [`HttpError::Transport`].
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(agent: ureq::Agent) -> Self {
        Self { agent }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(ureq::AgentBuilder::new().timeout(timeout).build())
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }
}

impl HttpTransport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self.agent.request(request.method.as_str(), &request.url);
        for (k, v) in &request.headers {
            builder = builder.set(k, v);
        }

        let result = match request.method {
            HttpMethod::Get => builder.call(),
            HttpMethod::Post => builder.send_bytes(&request.body),
        };
        let resp = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(ureq::Error::Transport(err)) => return Err(HttpError::Transport(err.to_string())),
        };

        let status = resp.status();
        let status_text = resp.status_text().to_string();
        let headers: HttpHeaders = resp
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = resp.header(&name)?.to_string();
                Some((name, value))
            })
            .collect();

        let mut body = Vec::new();
        resp.into_reader()
            .read_to_end(&mut body)
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            status_text,
            headers,
            body,
        })
    }
}

// ---------- Test-only mock transport ----------

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockTransport;

#[cfg(any(test, feature = "test-util"))]
mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory mock transport.
    ///
    /// Responses are registered per method + URL and returned in FIFO order.
    /// Every request is recorded for later assertions.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        inner: Arc<Mutex<MockTransportInner>>,
    }

    #[derive(Default)]
    struct MockTransportInner {
        routes: HashMap<(HttpMethod, String), VecDeque<HttpResponse>>,
        requests: Vec<HttpRequest>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a response for a method + URL.
        pub fn push_response(
            &self,
            method: HttpMethod,
            url: impl Into<String>,
            response: HttpResponse,
        ) {
            let mut inner = self
                .inner
                .lock()
                .expect("mock transport lock should not be poisoned");
            inner
                .routes
                .entry((method, url.into()))
                .or_default()
                .push_back(response);
        }

        /// Register a response with the given status, content type and body.
        pub fn respond(
            &self,
            method: HttpMethod,
            url: impl Into<String>,
            status: u16,
            content_type: &str,
            body: impl Into<Vec<u8>>,
        ) {
            let status_text = match status {
                200 => "OK",
                204 => "No Content",
                400 => "Bad Request",
                401 => "Unauthorized",
                403 => "Forbidden",
                404 => "Not Found",
                500 => "Internal Server Error",
                _ => "",
            };
            self.push_response(
                method,
                url,
                HttpResponse {
                    status,
                    status_text: status_text.to_string(),
                    headers: vec![("Content-Type".to_string(), content_type.to_string())],
                    body: body.into(),
                },
            );
        }

        /// Register a `200 OK` JSON response.
        pub fn respond_json(&self, method: HttpMethod, url: impl Into<String>, body: serde_json::Value) {
            self.respond(method, url, 200, "application/json", body.to_string());
        }

        #[must_use]
        pub fn requests(&self) -> Vec<HttpRequest> {
            let inner = self
                .inner
                .lock()
                .expect("mock transport lock should not be poisoned");
            inner.requests.clone()
        }

        /// Recorded requests with the given method.
        #[must_use]
        pub fn requests_with(&self, method: HttpMethod) -> Vec<HttpRequest> {
            self.requests()
                .into_iter()
                .filter(|r| r.method == method)
                .collect()
        }
    }

    impl HttpTransport for MockTransport {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let mut inner = self
                .inner
                .lock()
                .expect("mock transport lock should not be poisoned");

            let key = (request.method, request.url.clone());
            inner.requests.push(request);

            match inner.routes.get_mut(&key).and_then(|q| q.pop_front()) {
                Some(resp) => Ok(resp),
                None => Err(HttpError::NoMockResponse {
                    method: key.0.as_str().to_string(),
                    url: key.1,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_get_is_case_insensitive_and_returns_first_match() {
        let headers: HttpHeaders = vec![
            ("Content-Type".to_string(), "image/png".to_string()),
            ("content-type".to_string(), "image/gif".to_string()),
        ];
        assert_eq!(header_get(&headers, "CONTENT-TYPE"), Some("image/png"));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[test]
    fn basic_auth_encodes_user_and_password() {
        let creds = Credentials::new("Aladdin", "open sesame");
        assert_eq!(basic_auth(&creds), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn response_success_range() {
        let mut resp = HttpResponse {
            status: 204,
            status_text: "No Content".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        };
        assert!(resp.is_success());
        assert_eq!(resp.content_type(), "");
        resp.status = 302;
        assert!(!resp.is_success());
    }

    #[test]
    fn mock_transport_returns_responses_in_order_and_records_requests() {
        let transport = MockTransport::new();
        let url = "https://example.com/api";
        transport.respond(HttpMethod::Get, url, 200, "text/plain", "first");
        transport.respond(HttpMethod::Get, url, 404, "text/plain", "second");

        let req = HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: vec![("Accept".to_string(), "*/*".to_string())],
            body: Vec::new(),
        };
        let first = transport.send(req.clone()).expect("first");
        let second = transport.send(req.clone()).expect("second");
        assert_eq!(first.body, b"first");
        assert_eq!(second.status, 404);
        assert_eq!(second.status_text, "Not Found");
        assert_eq!(transport.requests(), vec![req.clone(), req]);
    }

    #[test]
    fn mock_transport_errors_when_no_response_is_registered() {
        let transport = MockTransport::new();
        let err = transport
            .send(HttpRequest {
                method: HttpMethod::Post,
                url: "https://example.com/missing".to_string(),
                headers: Vec::new(),
                body: Vec::new(),
            })
            .expect_err("missing mock should error");
        match err {
            HttpError::NoMockResponse { method, url } => {
                assert_eq!(method, "POST");
                assert_eq!(url, "https://example.com/missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ureq_transport_reports_connection_failure_as_transport_error() {
        let transport = UreqTransport::with_timeout(Duration::from_millis(500));
        let err = transport
            .send(HttpRequest {
                method: HttpMethod::Get,
                url: "http://127.0.0.1:1/unreachable".to_string(),
                headers: Vec::new(),
                body: Vec::new(),
            })
            .expect_err("port 1 should refuse connections");
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
