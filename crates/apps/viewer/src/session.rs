use std::sync::Arc;

use runtime::Event;
use streaming::{ContributionFilter, LOGIN_PATH, MeshCache, MeshSource};
use tracing::{info, warn};

use crate::api::{ApiError, ContributionsApi, ModelDownload};
use crate::bridge::{ErrorBridge, Notification};
use crate::config::ViewerConfig;
use crate::render_loop::{FrameView, RenderLoop};
use crate::store::ConfigurationStore;

/// Outcome of starting a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// Nobody is signed in; send the user to `redirect`.
    LoginRequired { redirect: String },
    /// Signed in, but nothing imported yet. Only import is offered.
    ImportOnly,
    Ready { years: Vec<u32> },
}

/// A model ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub filename: String,
    pub download: ModelDownload,
}

/// One viewer session: the store, the mesh cache, the render loop and the
/// error bridge, wired to the API.
///
/// API failures are reported through the bridge once and also returned to
/// the caller.
pub struct ViewerSession {
    api: Arc<dyn ContributionsApi>,
    store: ConfigurationStore,
    render: RenderLoop,
    bridge: ErrorBridge,
    years: Vec<u32>,
}

impl std::fmt::Debug for ViewerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerSession")
            .field("store", &self.store)
            .field("render", &self.render)
            .field("years", &self.years)
            .finish()
    }
}

impl ViewerSession {
    pub fn new(
        api: Arc<dyn ContributionsApi>,
        source: Arc<dyn MeshSource>,
        config: &ViewerConfig,
    ) -> Self {
        Self {
            api,
            store: ConfigurationStore::new(),
            render: RenderLoop::new(MeshCache::new(source), config.viewport, config.fov_y_rad()),
            bridge: ErrorBridge::new(),
            years: Vec::new(),
        }
    }

    pub fn store(&self) -> &ConfigurationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigurationStore {
        &mut self.store
    }

    pub fn render(&self) -> &RenderLoop {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut RenderLoop {
        &mut self.render
    }

    pub fn cache(&self) -> &MeshCache {
        self.render.cache()
    }

    /// Imported years, ascending.
    pub fn years(&self) -> &[u32] {
        &self.years
    }

    pub fn can_select_year(&self) -> bool {
        !self.years.is_empty()
    }

    pub fn notifications(&self) -> &[Event<Notification>] {
        self.bridge.pending()
    }

    pub fn drain_notifications(&mut self) -> Vec<Event<Notification>> {
        self.bridge.drain()
    }

    fn report<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(err) = &result {
            self.bridge.report(None, err);
        }
        result
    }

    pub async fn bootstrap(&mut self) -> Result<Bootstrap, ApiError> {
        let user = self.api.current_user().await;
        let user = self.report(user)?;
        let signed_in = user.is_some();
        self.store.set_user(user);
        if !signed_in {
            info!(redirect = LOGIN_PATH, "no user signed in");
            return Ok(Bootstrap::LoginRequired {
                redirect: LOGIN_PATH.to_string(),
            });
        }

        self.refresh_years().await?;
        if self.years.is_empty() {
            Ok(Bootstrap::ImportOnly)
        } else {
            Ok(Bootstrap::Ready {
                years: self.years.clone(),
            })
        }
    }

    pub async fn refresh_years(&mut self) -> Result<&[u32], ApiError> {
        let years = self.api.years().await;
        let mut years = self.report(years)?;
        years.sort_unstable();
        years.dedup();
        self.years = years;

        if let Some(year) = self.store.model().year {
            if !self.years.contains(&year) {
                self.store.clear_year();
            }
        }
        Ok(&self.years)
    }

    /// Select a year. Anything that is not an imported year clears the
    /// selection.
    ///
    /// Work availability is fetched when unknown. If that fails the failure
    /// is reported and the year is treated as having no work data.
    pub async fn select_year(&mut self, raw: i64) {
        let year = streaming::sanitize_year(raw).filter(|y| self.years.contains(y));
        match year {
            Some(year) => {
                self.store.set_year(i64::from(year));
                self.ensure_work_availability(year).await;
            }
            None => {
                if raw > 0 {
                    warn!(year = raw, "year has not been imported");
                }
                self.store.clear_year();
            }
        }
    }

    pub async fn set_contribution_filter(&mut self, filter: ContributionFilter) {
        if filter.requires_work_data() {
            if let Some(year) = self.store.model().year {
                self.ensure_work_availability(year).await;
            }
        }
        self.store.set_contribution_filter(filter);
    }

    pub fn set_include_labels(&mut self, include_labels: Option<bool>) {
        self.store.set_include_labels(include_labels);
    }

    async fn ensure_work_availability(&mut self, year: u32) {
        if self.store.get().work_available(year).is_some() {
            return;
        }
        let available = match self.api.work_available(year).await {
            Ok(available) => available,
            Err(err) => {
                self.bridge.report(None, &err);
                false
            }
        };
        self.store.record_work_availability(year, available);
    }

    /// Import `raw`, then show it. Returns `false` without calling the API
    /// when `raw` is not a positive year.
    ///
    /// Cached models for the year are dropped so the next frame fetches the
    /// fresh geometry.
    pub async fn import_year(&mut self, raw: i64) -> Result<bool, ApiError> {
        let Some(year) = streaming::sanitize_year(raw) else {
            warn!(year = raw, "refusing to import a non-positive year");
            return Ok(false);
        };
        let imported = self.api.import_year(year).await;
        self.report(imported)?;
        info!(year, "contributions imported");

        self.cache().invalidate_year(year);
        self.store.forget_work_availability(year);
        if self.render.current_locator().and_then(|l| l.year()) == Some(year) {
            self.render.reload();
        }

        self.refresh_years().await?;
        self.select_year(i64::from(year)).await;
        Ok(true)
    }

    /// Load again after a failure.
    pub fn retry(&mut self) {
        self.render.reload();
    }

    /// Download the model for the current selection. `None` without a year.
    pub async fn export(&mut self) -> Result<Option<Export>, ApiError> {
        let Some(locator) = self.store.get().locator() else {
            return Ok(None);
        };
        let download = self.api.download_model(&locator).await;
        let download = self.report(download)?;
        let user = self
            .store
            .user()
            .map(|u| u.as_str().to_string())
            .unwrap_or_else(|| "skyline".to_string());
        let filename = download
            .filename
            .clone()
            .unwrap_or_else(|| locator.suggested_filename(&user));
        info!(%locator, %filename, bytes = download.bytes.len(), "model exported");
        Ok(Some(Export { filename, download }))
    }

    /// Advance one frame against the latest selection.
    pub fn frame(&mut self) -> FrameView {
        let target = self.store.get().target();
        self.render.tick(&target, &mut self.bridge)
    }
}
