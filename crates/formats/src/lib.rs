pub mod mesh;
pub mod stl;

pub use mesh::*;
pub use stl::{StlError, StlLayout, decode_stl};

/// Hex-encoded BLAKE3 digest of a raw payload.
///
/// Used to tell apart geometry revisions served under the same locator.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
