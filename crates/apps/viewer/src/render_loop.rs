use std::sync::Arc;

use runtime::FrameClock;
use scene::{AutoFit, CameraState, ViewerCameraState, Viewport};
use streaming::{CachedMesh, LoadState, MeshCache, MeshHandle, ResourceLocator};
use tracing::debug;

use crate::bridge::{ErrorBridge, Failure, Notification};
use crate::store::ModelTarget;

pub const FRAME_DT_S: f64 = 1.0 / 60.0;

/// What the host should draw this frame.
#[derive(Debug, Clone)]
pub enum FrameView {
    /// No year selected.
    Empty,
    /// The current model is not ready to draw yet.
    Loading { locator: Option<ResourceLocator> },
    Mesh { mesh: Arc<CachedMesh> },
    /// The current model failed to load. `previous` is the last mesh that was
    /// on screen, if any, and stays drawn.
    Error {
        message: String,
        previous: Option<Arc<CachedMesh>>,
    },
}

impl FrameView {
    /// The mesh to draw, if any.
    pub fn mesh(&self) -> Option<&Arc<CachedMesh>> {
        match self {
            FrameView::Mesh { mesh } => Some(mesh),
            FrameView::Error { previous, .. } => previous.as_ref(),
            FrameView::Empty | FrameView::Loading { .. } => None,
        }
    }
}

/// Per-frame driver: keeps one handle for the current locator, polls it
/// without blocking and fits the camera when its mesh becomes ready.
#[derive(Debug)]
pub struct RenderLoop {
    cache: MeshCache,
    viewport: Viewport,
    fov_y_rad: f64,
    camera: CameraState,
    autofit: AutoFit,
    current: Option<MeshHandle>,
    displayed: Option<Arc<CachedMesh>>,
    reported: Option<(ResourceLocator, u64)>,
    clock: FrameClock,
}

impl RenderLoop {
    pub fn new(cache: MeshCache, viewport: Viewport, fov_y_rad: f64) -> Self {
        Self {
            cache,
            viewport,
            fov_y_rad,
            camera: CameraState::default(),
            autofit: AutoFit::new(),
            current: None,
            displayed: None,
            reported: None,
            clock: FrameClock::new(FRAME_DT_S),
        }
    }

    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    /// For user orbit/pan/zoom. Render passes never undo these.
    pub fn camera_mut(&mut self) -> &mut CameraState {
        &mut self.camera
    }

    pub fn camera_state(&self) -> ViewerCameraState {
        ViewerCameraState::capture(&self.camera, self.autofit.fitted())
    }

    pub fn autofit(&self) -> &AutoFit {
        &self.autofit
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn current_locator(&self) -> Option<&ResourceLocator> {
        self.current.as_ref().map(MeshHandle::locator)
    }

    /// The last frame number handed out.
    pub fn frame_index(&self) -> u64 {
        self.clock.ticks().saturating_sub(1)
    }

    /// Drop the current handle so the next frame asks the cache again.
    pub fn reload(&mut self) {
        self.current = None;
    }

    pub fn tick(&mut self, target: &ModelTarget, bridge: &mut ErrorBridge) -> FrameView {
        let frame = self.clock.tick();

        let locator = match target {
            ModelTarget::NoYear => {
                self.current = None;
                self.displayed = None;
                self.autofit.reset();
                return FrameView::Empty;
            }
            ModelTarget::AwaitingAvailability { .. } => {
                self.current = None;
                return FrameView::Loading { locator: None };
            }
            ModelTarget::Model(locator) => locator,
        };

        if self.current_locator() != Some(locator) {
            debug!(frame = frame.index, %locator, "switching model");
            self.current = Some(self.cache.load(locator));
            self.autofit.track(locator);
        }
        let Some(handle) = self.current.as_mut() else {
            return FrameView::Loading {
                locator: Some(locator.clone()),
            };
        };

        match handle.poll_state() {
            LoadState::Pending => FrameView::Loading {
                locator: Some(locator.clone()),
            },
            LoadState::Ready => match handle.mesh() {
                Some(mesh) => {
                    self.autofit
                        .on_ready(&mesh, self.viewport, self.fov_y_rad, &mut self.camera);
                    self.displayed = Some(mesh.clone());
                    FrameView::Mesh { mesh }
                }
                None => FrameView::Loading {
                    locator: Some(locator.clone()),
                },
            },
            LoadState::Failed => {
                let failure = handle
                    .error()
                    .map_or(Failure::Unknown, |err| Failure::from(&err));
                let key = (locator.clone(), handle.generation());
                if self.reported.as_ref() != Some(&key) {
                    self.autofit.on_failed(locator);
                    bridge.report(Some(frame), failure.clone());
                    self.reported = Some(key);
                }
                FrameView::Error {
                    message: Notification::for_failure(failure).message,
                    previous: self.displayed.clone(),
                }
            }
        }
    }
}
