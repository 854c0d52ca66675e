//! Wire shapes of the contributions API.
//!
//! Paths are relative to the API origin. JSON bodies are plain values
//! (`[2020, 2021]`, `true`, `"octocat"` / `null`); failures carry
//! `{ "detail": "..." }`.

use serde::{Deserialize, Serialize};

pub const MODEL_PATH: &str = "/contributions/model";
pub const YEARS_PATH: &str = "/contributions/years";
pub const CURRENT_USER_PATH: &str = "/auth/current-user";
pub const LOGIN_PATH: &str = "/auth/login";

pub fn work_available_path(year: u32) -> String {
    format!("/contributions/work-available/{year}")
}

pub fn import_path(year: u32) -> String {
    format!("/contributions/import/{year}")
}

/// Structured error body returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Parse a response body, returning `None` unless it carries a string `detail`.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}

/// Opaque handle of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(pub String);

impl UserIdentity {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
