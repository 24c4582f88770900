//! The pulled avatar of one user on one platform, and the policy that decides
//! whether it is a platform default and whether it matches another platform's
//! avatar.
//!
//! An [`Avatar`] only exists once a platform client has fetched it, so its
//! content type, bytes and origin are always populated.

use crate::digest::{basename, md5_hex};
use crate::types::{PlatformKind, UserId};

/// Jira avatar id reserved for "no custom avatar uploaded".
pub const JIRA_DEFAULT_AVATAR_ID: &str = "10122";

/// File name Confluence uses for its built-in profile picture.
pub const CONFLUENCE_DEFAULT_AVATAR_FILE: &str = "default.png";

/// Stand-in MD5 for the image Bitbucket serves to users without an avatar.
///
/// This is an unverified placeholder, not the digest of a real Bitbucket
/// image. Until it is overridden with
/// [`Avatar::with_default_md5`], no Bitbucket avatar is ever considered a
/// default, so only `--force` runs replace them.
pub const BITBUCKET_DEFAULT_AVATAR_MD5: &str = "8f9a3ff4c4a2b9ab9aa4db0d2d2a8c5e";

/// Content types every destination accepts.
pub const SUPPORTED_CONTENT_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/gif"];

/// Strip parameters (`; charset=...`) and normalise case of a `Content-Type`
/// header value.
pub fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether `content_type` is an image type every destination accepts.
pub fn is_supported_image(content_type: &str) -> bool {
    SUPPORTED_CONTENT_TYPES.contains(&media_type(content_type).as_str())
}

/// A user's avatar as pulled from a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    kind: PlatformKind,
    user: UserId,
    content_type: String,
    data: Vec<u8>,
    origin: Option<String>,
    source_origin: Option<String>,
    default_md5: Option<String>,
}

impl Avatar {
    /// Build a freshly pulled avatar.
    pub fn new(
        kind: PlatformKind,
        user: UserId,
        content_type: impl AsRef<str>,
        data: Vec<u8>,
        origin: Option<String>,
    ) -> Self {
        Self {
            kind,
            user,
            content_type: media_type(content_type.as_ref()),
            data,
            origin,
            source_origin: None,
            default_md5: None,
        }
    }

    /// Replace the default-image digest [`is_default`](Self::is_default)
    /// compares Bitbucket avatars against.
    pub fn with_default_md5(mut self, digest: impl Into<String>) -> Self {
        self.default_md5 = Some(digest.into().to_ascii_lowercase());
        self
    }

    pub fn kind(&self) -> PlatformKind {
        self.kind
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn source_origin(&self) -> Option<&str> {
        self.source_origin.as_deref()
    }

    /// MD5 hex digest of the image bytes.
    pub fn digest(&self) -> String {
        md5_hex(&self.data)
    }

    /// True when this is the platform's built-in placeholder, i.e. the user
    /// never uploaded an avatar of their own.
    pub fn is_default(&self) -> bool {
        match self.kind {
            PlatformKind::Jira => self
                .origin
                .as_deref()
                .is_some_and(|url| url.contains(JIRA_DEFAULT_AVATAR_ID)),
            PlatformKind::Confluence => match self.origin.as_deref() {
                None => true,
                Some(path) => basename(path) == CONFLUENCE_DEFAULT_AVATAR_FILE,
            },
            PlatformKind::Bitbucket => {
                let expected = self
                    .default_md5
                    .as_deref()
                    .unwrap_or(BITBUCKET_DEFAULT_AVATAR_MD5);
                self.digest() == expected
            }
        }
    }

    /// Whether `other` already holds the same picture as this avatar.
    ///
    /// Only a Jira avatar can be compared, and only against the two
    /// destinations. Every other pairing is not comparable and returns
    /// `false`, which forces an overwrite when policy allows one.
    pub fn is_equal(&self, other: &Avatar) -> bool {
        match (self.kind, other.kind) {
            // Confluence names stored pictures after the MD5 of the source URL.
            (PlatformKind::Jira, PlatformKind::Confluence) => {
                match (self.origin.as_deref(), other.origin.as_deref()) {
                    (Some(url), Some(path)) => md5_hex(url) == basename(path),
                    _ => false,
                }
            }
            (PlatformKind::Jira, PlatformKind::Bitbucket) => self.digest() == other.digest(),
            _ => false,
        }
    }

    /// Stage replacement content ahead of a push.
    ///
    /// Clears `origin`; `source_origin` becomes the fallback naming input for
    /// [`upload_file_name`](Self::upload_file_name).
    pub fn set_data(
        &mut self,
        content_type: impl AsRef<str>,
        data: Vec<u8>,
        source_origin: Option<String>,
    ) {
        self.content_type = media_type(content_type.as_ref());
        self.data = data;
        self.origin = None;
        self.source_origin = source_origin;
    }

    /// File name under which a push stores this avatar.
    ///
    /// The basename of `origin` when set, otherwise the MD5 of
    /// `source_origin`. `None` when neither is known.
    pub fn upload_file_name(&self) -> Option<String> {
        if let Some(origin) = self.origin.as_deref() {
            return Some(basename(origin).to_string());
        }
        self.source_origin.as_deref().map(md5_hex)
    }
}
