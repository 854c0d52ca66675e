use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::request::ResourceLocator;

/// Failure to obtain a raw payload from the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The server rejected the request with a structured `detail` body.
    Api { status: u16, detail: String },
    /// Non-success status without a structured body.
    Status { status: u16 },
    /// Connection, timeout or body-read failure.
    Transport { message: String },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Api { status, detail } => write!(f, "API error ({status}): {detail}"),
            FetchError::Status { status } => write!(f, "unexpected HTTP status {status}"),
            FetchError::Transport { message } => write!(f, "transport error: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Where mesh payloads come from.
///
/// `fetch` issues the request immediately and returns a future that owns
/// everything it needs, so the cache can hold on to it after the call.
pub trait MeshSource: Send + Sync {
    fn fetch(&self, locator: &ResourceLocator) -> BoxFuture<'static, Result<Bytes, FetchError>>;
}
