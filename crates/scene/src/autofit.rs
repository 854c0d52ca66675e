use streaming::{CachedMesh, ResourceLocator};
use tracing::debug;

use crate::camera::{CameraState, Viewport, frame_sphere};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FitPhase {
    /// Nothing tracked (no year selected).
    Unloaded,
    /// Tracking a locator whose mesh is not ready yet.
    Loading,
    Fitted,
    Failed,
}

/// Frames the camera once per cached mesh.
///
/// Contract:
/// - `track` with a new locator resets to `Loading`; the same locator is a no-op.
/// - `on_ready` fits only for the tracked locator and only once per mesh
///   generation, so repeated render passes leave the camera alone.
/// - A refetched mesh for the same locator (new generation) is fitted again.
#[derive(Debug, Clone)]
pub struct AutoFit {
    tracked: Option<ResourceLocator>,
    fitted_generation: Option<u64>,
    phase: FitPhase,
    fits: u64,
}

impl Default for AutoFit {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoFit {
    pub fn new() -> Self {
        Self {
            tracked: None,
            fitted_generation: None,
            phase: FitPhase::Unloaded,
            fits: 0,
        }
    }

    pub fn phase(&self) -> FitPhase {
        self.phase
    }

    pub fn fitted(&self) -> bool {
        self.phase == FitPhase::Fitted
    }

    pub fn tracked(&self) -> Option<&ResourceLocator> {
        self.tracked.as_ref()
    }

    /// Number of fits performed so far.
    pub fn fit_count(&self) -> u64 {
        self.fits
    }

    /// Start following `locator`. Returns `true` if this reset the fit.
    pub fn track(&mut self, locator: &ResourceLocator) -> bool {
        if self.tracked.as_ref() == Some(locator) {
            return false;
        }
        self.tracked = Some(locator.clone());
        self.fitted_generation = None;
        self.phase = FitPhase::Loading;
        true
    }

    pub fn reset(&mut self) {
        self.tracked = None;
        self.fitted_generation = None;
        self.phase = FitPhase::Unloaded;
    }

    /// Offer a ready mesh. Returns `true` if the camera was re-framed.
    pub fn on_ready(
        &mut self,
        mesh: &CachedMesh,
        viewport: Viewport,
        fov_y_rad: f64,
        camera: &mut CameraState,
    ) -> bool {
        if self.tracked.as_ref() != Some(&mesh.locator) {
            return false;
        }
        if self.fitted_generation == Some(mesh.generation) {
            return false;
        }

        *camera = frame_sphere(&mesh.bounding_sphere, viewport, fov_y_rad);
        self.fitted_generation = Some(mesh.generation);
        self.phase = FitPhase::Fitted;
        self.fits += 1;
        debug!(
            locator = %mesh.locator,
            generation = mesh.generation,
            distance = camera.distance,
            "camera fitted"
        );
        true
    }

    /// The tracked load failed. An already fitted camera stays fitted.
    pub fn on_failed(&mut self, locator: &ResourceLocator) {
        if self.tracked.as_ref() == Some(locator) && self.phase == FitPhase::Loading {
            self.phase = FitPhase::Failed;
        }
    }
}
