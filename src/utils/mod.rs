//! Shared helpers: path resolution, text decoding, content hashing.

pub mod encoding;
pub mod hashing;
pub mod paths;

pub use encoding::read_file_safe;
pub use hashing::content_fingerprint;
