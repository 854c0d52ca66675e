//! Client side of the contributions API.
//!
//! `ContributionsApi` covers the JSON endpoints the session needs;
//! `HttpApi` implements it over reqwest and also serves as the
//! [`MeshSource`] for the mesh cache.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use streaming::{
    CURRENT_USER_PATH, ErrorResponse, FetchError, MeshSource, ResourceLocator, UserIdentity,
    YEARS_PATH, import_path, work_available_path,
};
use tracing::debug;

use crate::config::ViewerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-success response carrying `{ "detail": ... }`.
    Api { status: u16, detail: String },
    /// Non-success response without a structured body.
    Status { status: u16 },
    /// The request never produced a response.
    Transport { message: String },
    /// The response body was not what the endpoint promises.
    Decode { message: String },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Api { status, detail } => write!(f, "API error ({status}): {detail}"),
            ApiError::Status { status } => write!(f, "unexpected HTTP status {status}"),
            ApiError::Transport { message } => write!(f, "transport error: {message}"),
            ApiError::Decode { message } => write!(f, "malformed response: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Api { status, detail } => FetchError::Api { status, detail },
            ApiError::Status { status } => FetchError::Status { status },
            ApiError::Transport { message } | ApiError::Decode { message } => {
                FetchError::Transport { message }
            }
        }
    }
}

/// Raw model bytes plus the name the server suggests for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDownload {
    pub bytes: Bytes,
    pub filename: Option<String>,
}

pub trait ContributionsApi: Send + Sync {
    /// `None` when the session is not signed in.
    fn current_user(&self) -> BoxFuture<'_, Result<Option<UserIdentity>, ApiError>>;

    fn years(&self) -> BoxFuture<'_, Result<Vec<u32>, ApiError>>;

    fn work_available(&self, year: u32) -> BoxFuture<'_, Result<bool, ApiError>>;

    fn import_year(&self, year: u32) -> BoxFuture<'_, Result<(), ApiError>>;

    fn download_model(
        &self,
        locator: &ResourceLocator,
    ) -> BoxFuture<'_, Result<ModelDownload, ApiError>>;
}

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl HttpApi {
    pub fn new(config: &ViewerConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_cookie: config.session_cookie.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    fn with_cookie(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.session_cookie {
            Some(cookie) => req.header(reqwest::header::COOKIE, cookie),
            None => req,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let req = self.with_cookie(self.client.get(self.url(path)));
        let (_, body) = send(req).await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            message: format!("{path}: {e}"),
        })
    }
}

async fn send(req: RequestBuilder) -> Result<(reqwest::header::HeaderMap, Bytes), ApiError> {
    let resp = req.send().await.map_err(|e| ApiError::Transport {
        message: e.to_string(),
    })?;
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.bytes().await.map_err(|e| ApiError::Transport {
        message: e.to_string(),
    })?;
    debug!(status = status.as_u16(), len = body.len(), "API response");

    if status.is_success() {
        return Ok((headers, body));
    }
    Err(classify_failure(status, &body))
}

fn classify_failure(status: StatusCode, body: &[u8]) -> ApiError {
    match ErrorResponse::parse(body) {
        Some(err) => ApiError::Api {
            status: status.as_u16(),
            detail: err.detail,
        },
        None => ApiError::Status {
            status: status.as_u16(),
        },
    }
}

/// The `filename=` parameter of a Content-Disposition value, reduced to its
/// last path component. `None` when there is no usable name.
fn disposition_filename(value: &str) -> Option<String> {
    let (_, rest) = value.split_once("filename=")?;
    let name = rest.split(';').next().unwrap_or(rest).trim().trim_matches('"');
    let name = name.rsplit('\\').next().unwrap_or(name);
    let name = Path::new(name).file_name()?.to_str()?;
    (!name.is_empty() && name != "..").then(|| name.to_string())
}

impl ContributionsApi for HttpApi {
    fn current_user(&self) -> BoxFuture<'_, Result<Option<UserIdentity>, ApiError>> {
        Box::pin(self.get_json(CURRENT_USER_PATH))
    }

    fn years(&self) -> BoxFuture<'_, Result<Vec<u32>, ApiError>> {
        Box::pin(self.get_json(YEARS_PATH))
    }

    fn work_available(&self, year: u32) -> BoxFuture<'_, Result<bool, ApiError>> {
        Box::pin(async move { self.get_json(&work_available_path(year)).await })
    }

    fn import_year(&self, year: u32) -> BoxFuture<'_, Result<(), ApiError>> {
        Box::pin(async move {
            let req = self.with_cookie(self.client.post(self.url(&import_path(year))));
            send(req).await.map(|_| ())
        })
    }

    fn download_model(
        &self,
        locator: &ResourceLocator,
    ) -> BoxFuture<'_, Result<ModelDownload, ApiError>> {
        let url = locator.to_url(&self.base_url);
        Box::pin(async move {
            let (headers, bytes) = send(self.with_cookie(self.client.get(url))).await?;
            let filename = headers
                .get(http::header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .and_then(disposition_filename);
            Ok(ModelDownload { bytes, filename })
        })
    }
}

impl MeshSource for HttpApi {
    fn fetch(&self, locator: &ResourceLocator) -> BoxFuture<'static, Result<Bytes, FetchError>> {
        let req = self.with_cookie(self.client.get(locator.to_url(&self.base_url)));
        Box::pin(async move {
            send(req)
                .await
                .map(|(_, body)| body)
                .map_err(FetchError::from)
        })
    }
}

/// Share one client between the session and the mesh cache.
pub fn shared(api: HttpApi) -> (Arc<dyn ContributionsApi>, Arc<dyn MeshSource>) {
    let api = Arc::new(api);
    let source: Arc<dyn MeshSource> = api.clone();
    let api: Arc<dyn ContributionsApi> = api;
    (api, source)
}
