use std::env;
use std::time::Duration;

use scene::Viewport;
use scene::camera::DEFAULT_FOV_Y_DEG;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidBaseUrl { value: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidBaseUrl { value, reason } => {
                write!(f, "invalid base URL {value:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings for the viewer.
///
/// Read from `SKYLINE_*` environment variables; malformed numeric values fall
/// back to their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub base_url: String,
    /// Forwarded verbatim as the `Cookie` header.
    pub session_cookie: Option<String>,
    pub viewport: Viewport,
    pub fov_y_deg: f64,
    pub request_timeout: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session_cookie: None,
            viewport: Viewport::default(),
            fov_y_deg: DEFAULT_FOV_Y_DEG,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let base_url = lookup("SKYLINE_BASE_URL").unwrap_or(defaults.base_url);
        let session_cookie = lookup("SKYLINE_SESSION_COOKIE").filter(|c| !c.trim().is_empty());

        let width = env_var_u32(&lookup, "SKYLINE_VIEWPORT_WIDTH", 1280);
        let height = env_var_u32(&lookup, "SKYLINE_VIEWPORT_HEIGHT", 720);
        let fov_y_deg = env_var_f64(&lookup, "SKYLINE_FOV_DEG", DEFAULT_FOV_Y_DEG);
        let timeout_s = env_var_u32(&lookup, "SKYLINE_REQUEST_TIMEOUT_S", 30);

        let config = Self {
            base_url: base_url.clone(),
            session_cookie,
            viewport: Viewport::new(width.max(1) as f64, height.max(1) as f64),
            fov_y_deg: if fov_y_deg > 1.0 && fov_y_deg < 179.0 {
                fov_y_deg
            } else {
                DEFAULT_FOV_Y_DEG
            },
            request_timeout: Duration::from_secs(u64::from(timeout_s.max(1))),
        };
        config.with_base_url(base_url)
    }

    /// Replace the API origin, validating it.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let value: String = base_url.into();
        let url = reqwest::Url::parse(&value).map_err(|e| ConfigError::InvalidBaseUrl {
            value: value.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                value,
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        self.base_url = value.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn fov_y_rad(&self) -> f64 {
        self.fov_y_deg.to_radians()
    }
}

fn env_var_u32(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> u32 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
