//! Content fingerprints for tab groups

use sha2::{Digest, Sha256};

/// SHA-256 over the URLs in order, each terminated by `'\n'`, as 64 hex characters.
///
/// A raw newline cannot appear unescaped in a URL, so `["ab", "c"]` and `["a", "bc"]`
/// never collide.
pub fn content_fingerprint<I, S>(urls: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for url in urls {
        hasher.update(url.as_ref().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
