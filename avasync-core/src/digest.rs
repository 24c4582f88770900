//! Content hashing and file-name helpers.
//!
//! Confluence names stored profile pictures after the MD5 of the URL they were
//! copied from, so equality checks across platforms reduce to comparing MD5
//! hex digests with file basenames.

use md5::{Digest, Md5};

/// Lowercase hex MD5 digest of `bytes`.
pub fn md5_hex(bytes: impl AsRef<[u8]>) -> String {
    let mut h = Md5::new();
    h.update(bytes.as_ref());
    hex::encode(h.finalize())
}

/// Final `/`-separated segment of a URL path or file path.
///
/// Query strings and fragments are ignored, and trailing slashes are skipped,
/// so `/download/pic.png?version=2` yields `pic.png`.
pub fn basename(path: &str) -> &str {
    let path = path.split(|c| c == '?' || c == '#').next().unwrap_or(path);
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
